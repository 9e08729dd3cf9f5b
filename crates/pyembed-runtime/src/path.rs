//! The `PYTHONPATH` search-path variable.
//!
//! The interpreter reads `PYTHONPATH` once, while initializing, so these
//! functions only have an effect when called before
//! [`Interpreter::initialize`](crate::Interpreter::initialize). Entries are
//! joined with the platform's path-list separator (`:` or `;`).

use std::env;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

use crate::error::Result;

pub const PYTHONPATH: &str = "PYTHONPATH";

/// The current `PYTHONPATH` entries, in order.
pub fn python_path() -> Vec<PathBuf> {
    env::var_os(PYTHONPATH)
        .map(|value| env::split_paths(&value).collect())
        .unwrap_or_default()
}

/// Replace `PYTHONPATH` with `paths`.
///
/// # Safety
///
/// Mutates the process environment; no other thread may read or write the
/// environment concurrently.
pub unsafe fn set_python_path<I>(paths: I) -> Result<()>
where
    I: IntoIterator,
    I::Item: AsRef<OsStr>,
{
    let value = joined_set(paths)?;
    unsafe { write(value) };
    Ok(())
}

/// Add `paths` after the existing `PYTHONPATH` entries.
///
/// # Safety
///
/// Same as [`set_python_path`].
pub unsafe fn append_python_path<I>(paths: I) -> Result<()>
where
    I: IntoIterator,
    I::Item: AsRef<OsStr>,
{
    let value = joined_append(env::var_os(PYTHONPATH), paths)?;
    unsafe { write(value) };
    Ok(())
}

/// Add `paths` before the existing `PYTHONPATH` entries.
///
/// # Safety
///
/// Same as [`set_python_path`].
pub unsafe fn prepend_python_path<I>(paths: I) -> Result<()>
where
    I: IntoIterator,
    I::Item: AsRef<OsStr>,
{
    let value = joined_prepend(env::var_os(PYTHONPATH), paths)?;
    unsafe { write(value) };
    Ok(())
}

unsafe fn write(value: OsString) {
    tracing::debug!(value = %value.to_string_lossy(), "setting {PYTHONPATH}");
    unsafe { env::set_var(PYTHONPATH, value) };
}

pub fn joined_set<I>(paths: I) -> Result<OsString>
where
    I: IntoIterator,
    I::Item: AsRef<OsStr>,
{
    Ok(env::join_paths(paths)?)
}

pub fn joined_append<I>(existing: Option<OsString>, paths: I) -> Result<OsString>
where
    I: IntoIterator,
    I::Item: AsRef<OsStr>,
{
    let mut entries = split(existing);
    entries.extend(paths.into_iter().map(|path| PathBuf::from(path.as_ref())));
    joined_set(entries)
}

pub fn joined_prepend<I>(existing: Option<OsString>, paths: I) -> Result<OsString>
where
    I: IntoIterator,
    I::Item: AsRef<OsStr>,
{
    let mut entries: Vec<PathBuf> = paths
        .into_iter()
        .map(|path| PathBuf::from(path.as_ref()))
        .collect();
    entries.extend(split(existing));
    joined_set(entries)
}

/// Existing entries; an unset or empty variable has none.
fn split(existing: Option<OsString>) -> Vec<PathBuf> {
    match existing {
        Some(value) if !value.is_empty() => env::split_paths(&value).collect(),
        _ => Vec::new(),
    }
}
