//! The object protocol shared by owned and borrowed handles.

use std::ffi::CString;

use pyo3_ffi as ffi;

use crate::error::{Result, current_error};
use crate::handle::Handle;
use crate::primitive::Value;
use crate::types::TypeObject;

/// Operations available on any Python object reference.
///
/// Implemented by [`Handle`] and [`Borrowed`](crate::Borrowed). All methods
/// require the calling thread to hold the interpreter lock.
pub trait Object {
    /// The raw object pointer. Ownership is not transferred.
    fn as_ptr(&self) -> *mut ffi::PyObject;

    /// The dynamic type of the object. Does not touch the reference count.
    ///
    /// The view borrows the object, which keeps a heap type alive.
    fn type_of(&self) -> TypeObject<'_> {
        unsafe { TypeObject::from_raw(ffi::Py_TYPE(self.as_ptr())) }
    }

    /// Current reference count, for introspection in tests and diagnostics.
    fn ref_count(&self) -> isize {
        unsafe { ffi::Py_REFCNT(self.as_ptr()) as isize }
    }

    /// Identity comparison (Python's `is`).
    fn is(&self, other: &impl Object) -> bool {
        self.as_ptr() == other.as_ptr()
    }

    fn is_none(&self) -> bool {
        self.as_ptr() == unsafe { ffi::Py_None() }
    }

    /// Whether the object's type is `ty` or a subtype of it.
    fn is_instance_of(&self, ty: TypeObject<'_>) -> bool {
        self.type_of().is_subtype(ty)
    }

    /// Best-effort `str(obj)`.
    ///
    /// Never fails: any conversion error yields an empty string and is
    /// discarded. An error already pending before the call is left in place.
    fn stringify(&self) -> String {
        unsafe {
            let pending = PendingError::stash();
            let text = stringify_raw(self.as_ptr());
            if text.is_none() {
                ffi::PyErr_Clear();
            }
            pending.reinstall();
            text.unwrap_or_default()
        }
    }

    /// `str(obj)` as a new object.
    fn str(&self) -> Result<Handle> {
        unsafe { Handle::from_owned_ptr_or_err(ffi::PyObject_Str(self.as_ptr())) }
    }

    fn get_attr(&self, name: &str) -> Result<Handle> {
        let name = CString::new(name)?;
        unsafe {
            Handle::from_owned_ptr_or_err(ffi::PyObject_GetAttrString(
                self.as_ptr(),
                name.as_ptr(),
            ))
        }
    }

    /// Assign an attribute. The object keeps its own reference to `value`.
    fn set_attr(&self, name: &str, value: &impl Object) -> Result<()> {
        let name = CString::new(name)?;
        let status =
            unsafe { ffi::PyObject_SetAttrString(self.as_ptr(), name.as_ptr(), value.as_ptr()) };
        if status == 0 {
            Ok(())
        } else {
            Err(current_error())
        }
    }

    /// Call the object with positional arguments and no keywords.
    ///
    /// The result may be the `None` singleton; it is returned as an owned handle either way.
    fn call<'a>(&self, args: impl IntoIterator<Item = Value<'a>>) -> Result<Handle> {
        let args = Handle::new_tuple(args)?;
        let kwargs = Handle::new_dict()?;
        self.call_with(&args, Some(&kwargs))
    }

    /// Call the object with an argument tuple and an optional keyword dict.
    fn call_with(&self, args: &Handle, kwargs: Option<&Handle>) -> Result<Handle> {
        let kwargs = kwargs.map_or(std::ptr::null_mut(), Object::as_ptr);
        unsafe {
            Handle::from_owned_ptr_or_err(ffi::PyObject_Call(self.as_ptr(), args.as_ptr(), kwargs))
        }
    }

    /// Look up `name` and call it with positional arguments.
    fn call_method<'a>(
        &self,
        name: &str,
        args: impl IntoIterator<Item = Value<'a>>,
    ) -> Result<Handle> {
        self.get_attr(name)?.call(args)
    }

    /// `len(obj)`.
    fn len(&self) -> Result<usize> {
        let len = unsafe { ffi::PyObject_Size(self.as_ptr()) };
        if len < 0 {
            Err(current_error())
        } else {
            Ok(len as usize)
        }
    }
}

/// `str(obj)` decoded to UTF-8, or `None` with the Python error set.
unsafe fn stringify_raw(obj: *mut ffi::PyObject) -> Option<String> {
    let str = unsafe { Handle::from_owned_ptr(ffi::PyObject_Str(obj)) }?;
    unsafe { utf8_contents(str.as_ptr()) }
}

/// Copy the UTF-8 encoding of a `str` object, or `None` with the Python error set.
pub(crate) unsafe fn utf8_contents(unicode: *mut ffi::PyObject) -> Option<String> {
    let encoded = unsafe { Handle::from_owned_ptr(ffi::PyUnicode_AsUTF8String(unicode)) }?;
    let data = unsafe { ffi::PyBytes_AsString(encoded.as_ptr()) };
    if data.is_null() {
        return None;
    }
    let size = unsafe { ffi::PyBytes_Size(encoded.as_ptr()) } as usize;
    let bytes = unsafe { std::slice::from_raw_parts(data as *const u8, size) };
    Some(String::from_utf8_lossy(bytes).into_owned())
}

/// The raw error indicator, moved out of the way while a display path runs.
pub(crate) struct PendingError {
    ptype: *mut ffi::PyObject,
    pvalue: *mut ffi::PyObject,
    ptraceback: *mut ffi::PyObject,
}

impl PendingError {
    #[allow(deprecated)]
    pub(crate) unsafe fn stash() -> Self {
        let mut pending = Self {
            ptype: std::ptr::null_mut(),
            pvalue: std::ptr::null_mut(),
            ptraceback: std::ptr::null_mut(),
        };
        unsafe { ffi::PyErr_Fetch(&mut pending.ptype, &mut pending.pvalue, &mut pending.ptraceback) };
        pending
    }

    /// Put the stashed indicator back. A null type clears the indicator.
    #[allow(deprecated)]
    pub(crate) unsafe fn reinstall(self) {
        unsafe { ffi::PyErr_Restore(self.ptype, self.pvalue, self.ptraceback) };
    }
}
