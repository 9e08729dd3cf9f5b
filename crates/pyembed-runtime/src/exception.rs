//! Python exceptions captured as host values.
//!
//! The interpreter keeps one pending-error indicator per thread. It is set by
//! any failing C API call and must be drained before the next call that can
//! run Python code, or that call fails with `SystemError`.
//!
//! [`PyException::take`] drains the indicator into a [`PyException`].
//! [`PyException::fetch`] drains and immediately re-installs an identical
//! indicator, leaving the runtime's view unchanged.

use std::fmt;
use std::ptr;

use pyo3_ffi as ffi;

use crate::error::{Error, Result, current_error};
use crate::handle::Handle;
use crate::import::import;
use crate::object::{Object, PendingError};
use crate::primitive::{Primitive, Value};

const MALFORMED: &str = "malformed Python exception";

/// A pending Python exception: type, value and traceback, each optional.
#[derive(Debug)]
pub struct PyException {
    pub ptype: Option<Handle>,
    pub pvalue: Option<Handle>,
    pub ptraceback: Option<Handle>,
}

impl PyException {
    /// Whether an exception is pending on the calling thread.
    pub fn occurred() -> bool {
        unsafe { !ffi::PyErr_Occurred().is_null() }
    }

    /// Read the pending exception, leaving the indicator set.
    ///
    /// Returns `None` if nothing is pending.
    pub fn fetch() -> Option<PyException> {
        let exception = Self::take()?;
        exception.reinstall_copy();
        Some(exception)
    }

    /// Drain the pending exception, clearing the indicator.
    ///
    /// Returns `None` if nothing is pending.
    #[allow(deprecated)]
    pub fn take() -> Option<PyException> {
        let mut ptype = ptr::null_mut();
        let mut pvalue = ptr::null_mut();
        let mut ptraceback = ptr::null_mut();
        unsafe {
            ffi::PyErr_Fetch(&mut ptype, &mut pvalue, &mut ptraceback);
            if ptype.is_null() {
                return None;
            }
            ffi::PyErr_NormalizeException(&mut ptype, &mut pvalue, &mut ptraceback);
            Some(Self::from_parts(
                Handle::from_owned_ptr(ptype),
                Handle::from_owned_ptr(pvalue),
                Handle::from_owned_ptr(ptraceback),
            ))
        }
    }

    pub fn from_parts(
        ptype: Option<Handle>,
        pvalue: Option<Handle>,
        ptraceback: Option<Handle>,
    ) -> Self {
        Self {
            ptype,
            pvalue,
            ptraceback,
        }
    }

    /// Install this exception as the pending error, replacing any other.
    #[allow(deprecated)]
    pub fn restore(self) {
        let into_raw = |part: Option<Handle>| part.map_or(ptr::null_mut(), Handle::into_raw);
        unsafe {
            ffi::PyErr_Restore(
                into_raw(self.ptype),
                into_raw(self.pvalue),
                into_raw(self.ptraceback),
            )
        };
    }

    /// Install a second reference to each part, keeping `self` intact.
    fn reinstall_copy(&self) {
        let copy = Self::from_parts(
            self.ptype.clone(),
            self.pvalue.clone(),
            self.ptraceback.clone(),
        );
        copy.restore();
    }

    /// The text shown to the host: the value's `str`, else the type's `str`.
    pub fn message(&self) -> String {
        match (&self.pvalue, &self.ptype) {
            (Some(value), _) => value.stringify(),
            (None, Some(ty)) => ty.stringify(),
            (None, None) => MALFORMED.to_owned(),
        }
    }

    /// The exception class name, e.g. `"ValueError"`.
    pub fn type_name(&self) -> String {
        let Some(ty) = &self.ptype else {
            return String::new();
        };
        unsafe {
            let pending = PendingError::stash();
            let name = ty
                .get_attr("__name__")
                .and_then(|name| name.extract_string())
                .unwrap_or_default();
            pending.reinstall();
            name
        }
    }

    /// Whether the exception is an instance of the Python class `kind`.
    pub fn matches(&self, kind: *mut ffi::PyObject) -> bool {
        self.ptype
            .as_ref()
            .is_some_and(|ty| unsafe { ffi::PyErr_GivenExceptionMatches(ty.as_ptr(), kind) != 0 })
    }

    /// Render the exception the way the interpreter prints an uncaught one.
    pub fn format_traceback(&self) -> Result<String> {
        unsafe {
            let pending = PendingError::stash();
            let text = self.format_with_traceback_module();
            pending.reinstall();
            text
        }
    }

    fn format_with_traceback_module(&self) -> Result<String> {
        let part = |part: &Option<Handle>| part.as_ref().map_or_else(Handle::none, Handle::acquire);
        let lines = import("traceback")?.call_method(
            "format_exception",
            [
                Value::Owned(part(&self.ptype)),
                Value::Owned(part(&self.pvalue)),
                Value::Owned(part(&self.ptraceback)),
            ],
        )?;
        let mut text = String::new();
        for index in 0..lines.len()? {
            text.push_str(&lines.list_item(index)?.extract_string()?);
        }
        Ok(text)
    }
}

impl fmt::Display for PyException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for PyException {}

/// Set the pending error to `kind(message)`.
pub(crate) fn set_error(kind: *mut ffi::PyObject, message: &str) {
    match Handle::new_unicode(message) {
        Ok(message) => unsafe { ffi::PyErr_SetObject(kind, message.as_ptr()) },
        // The failed allocation has already set MemoryError.
        Err(err) => err.restore(),
    }
}

/// Raise `TypeError(message)` and return it as a host error.
pub fn raise_type_error(message: &str) -> Error {
    set_error(unsafe { ffi::PyExc_TypeError }, message);
    current_error()
}
