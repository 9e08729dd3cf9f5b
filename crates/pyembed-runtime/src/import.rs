use std::ffi::CString;

use pyo3_ffi as ffi;

use crate::error::Result;
use crate::handle::Handle;

/// Import a module by its dotted name, as the `import` statement would.
pub fn import(name: &str) -> Result<Handle> {
    let name = CString::new(name)?;
    unsafe { Handle::from_owned_ptr_or_err(ffi::PyImport_ImportModule(name.as_ptr())) }
}
