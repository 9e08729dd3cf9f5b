//! Helpers for the bodies of host functions called by the interpreter.
//!
//! ```ignore
//! unsafe extern "C" fn concat(
//!     _slf: *mut ffi::PyObject,
//!     args: *const *mut ffi::PyObject,
//!     nargs: ffi::Py_ssize_t,
//! ) -> *mut ffi::PyObject {
//!     bridge::guard(|| {
//!         let args = unsafe { bridge::fast_args(args, nargs) }?;
//!         bridge::expect_arg_count("concat", 2, args.len())?;
//!         let joined = format!("{} {}", args[0].extract_string()?, args[1].extract_string()?);
//!         Handle::new_unicode(&joined)
//!     })
//! }
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use pyo3_ffi as ffi;

use crate::error::Result;
use crate::exception::{self, raise_type_error};
use crate::handle::{Borrowed, Handle};
use crate::object::Object;
use crate::primitive::Primitive;

/// Run a host function body and translate its outcome for the interpreter.
///
/// - `Ok(handle)` becomes the new reference the interpreter expects.
/// - `Err(err)` is restored as the pending exception and null is returned.
/// - A panic is caught, raised as `SystemError` and null is returned.
///
/// Never unwinds across the C boundary.
pub fn guard<F>(body: F) -> *mut ffi::PyObject
where
    F: FnOnce() -> Result<Handle>,
{
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(result)) => result.into_raw(),
        Ok(Err(err)) => {
            tracing::trace!(%err, "host function raised");
            err.restore();
            ptr::null_mut()
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(%message, "host function panicked");
            exception::set_error(
                unsafe { ffi::PyExc_SystemError },
                &format!("host function panicked: {message}"),
            );
            ptr::null_mut()
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

/// View a single object argument (`METH_O`).
///
/// # Safety
///
/// `arg` must be null or an object the interpreter keeps alive for `'a`.
pub unsafe fn arg<'a>(arg: *mut ffi::PyObject) -> Result<Borrowed<'a>> {
    unsafe { Borrowed::from_ptr(arg) }.ok_or_else(|| raise_type_error("missing argument"))
}

/// View the positional argument tuple (`METH_VARARGS`) as a list.
///
/// # Safety
///
/// `args` must be null or a tuple the interpreter keeps alive for `'a`.
pub unsafe fn tuple_args<'a>(args: *mut ffi::PyObject) -> Result<Vec<Borrowed<'a>>> {
    let Some(tuple) = (unsafe { Borrowed::<'a>::from_ptr(args) }) else {
        return Ok(Vec::new());
    };
    let count = tuple.len()?;
    let mut items = Vec::with_capacity(count);
    for index in 0..count {
        let item = unsafe { ffi::PyTuple_GetItem(tuple.as_ptr(), index as ffi::Py_ssize_t) };
        // The tuple owns the item for as long as it lives.
        items.push(unsafe { Borrowed::<'a>::from_ptr(item) }.ok_or_else(crate::current_error)?);
    }
    Ok(items)
}

/// View the positional arguments of a `METH_FASTCALL` call.
///
/// A null entry raises `SystemError` rather than shifting later arguments.
///
/// # Safety
///
/// `args` must point to `nargs` entries that are null or live objects kept
/// alive for `'a`, or be null with `nargs == 0`.
pub unsafe fn fast_args<'a>(
    args: *const *mut ffi::PyObject,
    nargs: ffi::Py_ssize_t,
) -> Result<Vec<Borrowed<'a>>> {
    if args.is_null() || nargs <= 0 {
        return Ok(Vec::new());
    }
    unsafe { std::slice::from_raw_parts(args, nargs as usize) }
        .iter()
        .enumerate()
        .map(|(index, &arg)| {
            unsafe { Borrowed::from_ptr(arg) }.ok_or_else(|| {
                exception::set_error(
                    unsafe { ffi::PyExc_SystemError },
                    &format!("null argument at position {index}"),
                );
                crate::current_error()
            })
        })
        .collect()
}

/// Pair the keyword names of a `METH_FASTCALL | METH_KEYWORDS` call with
/// their values, which follow the positional arguments in `args`.
///
/// # Safety
///
/// Same as [`fast_args`], and `kwnames` must be null or a tuple of strings
/// whose length is the number of keyword values after the positionals.
pub unsafe fn fast_keywords<'a>(
    args: *const *mut ffi::PyObject,
    nargs: ffi::Py_ssize_t,
    kwnames: *mut ffi::PyObject,
) -> Result<Vec<(String, Borrowed<'a>)>> {
    let Some(names) = (unsafe { Borrowed::<'a>::from_ptr(kwnames) }) else {
        return Ok(Vec::new());
    };
    let count = names.len()?;
    let values = unsafe { fast_args::<'a>(args.add(nargs as usize), count as ffi::Py_ssize_t) }?;
    let mut keywords = Vec::with_capacity(count);
    for (index, value) in values.into_iter().enumerate() {
        keywords.push((names.tuple_item(index)?.extract_string()?, value));
    }
    Ok(keywords)
}

/// Raise `TypeError` unless exactly `expected` arguments were passed.
pub fn expect_arg_count(function: &str, expected: usize, given: usize) -> Result<()> {
    if expected == given {
        return Ok(());
    }
    let plural = if expected == 1 { "" } else { "s" };
    Err(raise_type_error(&format!(
        "{function}() takes exactly {expected} argument{plural} ({given} given)"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::PyException;
    use crate::primitive::Value;
    use crate::tests::with_gil;

    #[test]
    fn test_guard_returns_new_reference() {
        with_gil(|| {
            let value = Handle::new_list(std::iter::empty()).unwrap();
            let before = value.ref_count();
            let raw = guard(|| Ok(value.acquire()));
            assert_eq!(raw, value.as_ptr());
            assert_eq!(value.ref_count(), before + 1);
            drop(unsafe { Handle::from_owned_ptr(raw) });
            assert_eq!(value.ref_count(), before);
        });
    }

    #[test]
    fn test_guard_restores_error() {
        with_gil(|| {
            let raw = guard(|| Handle::new_unicode("x")?.extract_i64().map(|_| Handle::none()));
            assert!(raw.is_null());
            let exception = PyException::take().unwrap();
            assert_eq!(exception.type_name(), "TypeError");
        });
    }

    #[test]
    fn test_guard_catches_panic() {
        with_gil(|| {
            let raw = guard(|| panic!("kaboom"));
            assert!(raw.is_null());
            let exception = PyException::take().unwrap();
            assert_eq!(exception.type_name(), "SystemError");
            insta::assert_snapshot!(exception.message(), @"host function panicked: kaboom");
        });
    }

    #[test]
    fn test_fast_args() {
        with_gil(|| {
            let a = Handle::new_long(1).unwrap();
            let b = Handle::new_unicode("b").unwrap();
            let raw = [a.as_ptr(), b.as_ptr()];

            let args = unsafe { fast_args(raw.as_ptr(), 2) }.unwrap();
            assert_eq!(args.len(), 2);
            assert!(args[1].is(&b));
            assert!(unsafe { fast_args(std::ptr::null(), 0) }.unwrap().is_empty());

            let names = Handle::new_tuple([Value::from("key")]).unwrap();
            let keywords = unsafe { fast_keywords(raw.as_ptr(), 1, names.as_ptr()) }.unwrap();
            assert_eq!(keywords.len(), 1);
            assert_eq!(keywords[0].0, "key");
            assert!(keywords[0].1.is(&b));
        });
    }

    #[test]
    fn test_tuple_args() {
        with_gil(|| {
            let tuple = Handle::new_tuple([Value::Int(1), Value::from("two")]).unwrap();
            let args = unsafe { tuple_args(tuple.as_ptr()) }.unwrap();
            assert_eq!(args.len(), 2);
            assert_eq!(args[1].extract_string().unwrap(), "two");
            assert!(unsafe { tuple_args(std::ptr::null_mut()) }.unwrap().is_empty());
        });
    }

    #[test]
    fn test_expect_arg_count() {
        with_gil(|| {
            assert!(expect_arg_count("concat", 2, 2).is_ok());
            let err = expect_arg_count("concat", 2, 1).unwrap_err();
            insta::assert_snapshot!(err.to_string(), @"concat() takes exactly 2 arguments (1 given)");
            let err = expect_arg_count("shout", 1, 3).unwrap_err();
            insta::assert_snapshot!(err.to_string(), @"shout() takes exactly 1 argument (3 given)");
        });
    }

    #[test]
    fn test_fast_args_null_entry_is_error() {
        with_gil(|| {
            let a = Handle::new_long(1).unwrap();
            let raw = [a.as_ptr(), std::ptr::null_mut(), a.as_ptr()];

            let err = unsafe { fast_args(raw.as_ptr(), 3) }.unwrap_err();
            let exception = err.as_exception().unwrap();
            assert_eq!(exception.type_name(), "SystemError");
            insta::assert_snapshot!(exception.message(), @"null argument at position 1");
            assert!(!PyException::occurred());
        });
    }
}
