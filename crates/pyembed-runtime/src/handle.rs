//! Owning and borrowed handles to Python objects.
//!
//! ## Ownership
//!
//! A [`Handle`] holds exactly one strong reference that the interpreter
//! attributes to it:
//! - every operation that produces a new object returns a `Handle`
//! - `Clone` acquires a second reference (`Py_IncRef`)
//! - `Drop` releases it (`Py_DecRef`), exactly once, on every exit path
//!
//! A [`Borrowed`] view never touches the reference count. It is used for the
//! process-wide singletons (`None`, `True`, `False`), for items read out of a
//! container that keeps them alive, and for arguments handed to host callbacks.
//!
//! ## Dropping without the lock
//!
//! Releasing a reference may run arbitrary finalizers, so it needs the
//! interpreter lock. A `Handle` dropped on a thread that does not hold it
//! ensures the lock for the duration of the decrement. A `Handle` that
//! outlives [`Interpreter::finalize`](crate::Interpreter::finalize) is
//! abandoned: the runtime that owned the object is gone. Each handle records
//! the lifecycle it was created in, so this also holds once a later
//! interpreter has been initialized.

use std::fmt;
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::ptr::NonNull;

use pyo3_ffi as ffi;

use crate::error::{Result, current_error};
use crate::interpreter;
use crate::object::Object;

/// An owned reference to a Python object.
pub struct Handle {
    ptr: NonNull<ffi::PyObject>,
    generation: u64,
}

// SAFETY: a Handle is a counted pointer into the interpreter heap. The
// interpreter lock, not the host thread, serializes access to the object, and
// every operation on a Handle (including Drop) runs with the lock held.
unsafe impl Send for Handle {}
unsafe impl Sync for Handle {}

impl Handle {
    /// Take ownership of a new reference.
    ///
    /// Returns `None` for a null pointer.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a strong reference the caller owns and gives up.
    pub unsafe fn from_owned_ptr(ptr: *mut ffi::PyObject) -> Option<Self> {
        NonNull::new(ptr).map(Self::adopt)
    }

    /// Take ownership of the result of a C API call returning a new reference;
    /// a null result becomes the pending Python error.
    ///
    /// # Safety
    ///
    /// Same as [`Handle::from_owned_ptr`].
    pub(crate) unsafe fn from_owned_ptr_or_err(ptr: *mut ffi::PyObject) -> Result<Self> {
        unsafe { Self::from_owned_ptr(ptr) }.ok_or_else(current_error)
    }

    /// Acquire a new reference to an object the caller only borrows.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or point to a live object, and the lock must be held.
    pub unsafe fn from_borrowed_ptr(ptr: *mut ffi::PyObject) -> Option<Self> {
        let ptr = NonNull::new(ptr)?;
        unsafe { ffi::Py_IncRef(ptr.as_ptr()) };
        Some(Self::adopt(ptr))
    }

    fn adopt(ptr: NonNull<ffi::PyObject>) -> Self {
        Self {
            ptr,
            generation: interpreter::generation(),
        }
    }

    /// Acquire a second owner of the same object.
    pub fn acquire(&self) -> Handle {
        self.clone()
    }

    /// Release this reference. Equivalent to dropping the handle.
    pub fn release(self) {
        drop(self)
    }

    /// Give up ownership without releasing, returning the raw new reference.
    ///
    /// Used to hand a result back to the interpreter, which takes the reference over.
    pub fn into_raw(self) -> *mut ffi::PyObject {
        ManuallyDrop::new(self).ptr.as_ptr()
    }

    /// A non-owning view with the lifetime of this handle.
    pub fn as_borrowed(&self) -> Borrowed<'_> {
        Borrowed {
            ptr: self.ptr,
            _marker: PhantomData,
        }
    }
}

impl Object for Handle {
    fn as_ptr(&self) -> *mut ffi::PyObject {
        self.ptr.as_ptr()
    }
}

impl Clone for Handle {
    fn clone(&self) -> Self {
        unsafe { ffi::Py_IncRef(self.ptr.as_ptr()) };
        Self {
            ptr: self.ptr,
            generation: self.generation,
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        unsafe {
            // The object belongs to a runtime that has been finalized.
            if self.generation != interpreter::generation() || ffi::Py_IsInitialized() == 0 {
                return;
            }
            if ffi::PyGILState_Check() != 0 {
                ffi::Py_DecRef(self.ptr.as_ptr());
            } else {
                let state = ffi::PyGILState_Ensure();
                ffi::Py_DecRef(self.ptr.as_ptr());
                ffi::PyGILState_Release(state);
            }
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&self.ptr).finish()
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stringify())
    }
}

/// A non-owning view of a Python object, valid for `'a`.
#[derive(Clone, Copy)]
pub struct Borrowed<'a> {
    ptr: NonNull<ffi::PyObject>,
    _marker: PhantomData<&'a Handle>,
}

impl<'a> Borrowed<'a> {
    /// View an object kept alive by someone else for `'a`.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or point to an object that stays alive for `'a`.
    pub unsafe fn from_ptr(ptr: *mut ffi::PyObject) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self {
            ptr,
            _marker: PhantomData,
        })
    }

    /// Acquire an owned reference to the viewed object.
    pub fn to_handle(&self) -> Handle {
        unsafe { ffi::Py_IncRef(self.ptr.as_ptr()) };
        Handle::adopt(self.ptr)
    }
}

impl Borrowed<'static> {
    /// The `None` singleton.
    pub fn none() -> Self {
        unsafe { Self::singleton(ffi::Py_None()) }
    }

    /// The `True` singleton.
    pub fn py_true() -> Self {
        unsafe { Self::singleton(ffi::Py_True()) }
    }

    /// The `False` singleton.
    pub fn py_false() -> Self {
        unsafe { Self::singleton(ffi::Py_False()) }
    }

    unsafe fn singleton(ptr: *mut ffi::PyObject) -> Self {
        Self {
            // Singletons are statically allocated by the interpreter.
            ptr: unsafe { NonNull::new_unchecked(ptr) },
            _marker: PhantomData,
        }
    }
}

impl Object for Borrowed<'_> {
    fn as_ptr(&self) -> *mut ffi::PyObject {
        self.ptr.as_ptr()
    }
}

impl fmt::Debug for Borrowed<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Borrowed").field(&self.ptr).finish()
    }
}

impl fmt::Display for Borrowed<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stringify())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::Primitive;
    use crate::tests::with_gil;

    #[test]
    fn test_release_restores_count() {
        with_gil(|| {
            let list = Handle::new_list(std::iter::empty()).unwrap();
            let before = list.ref_count();

            let second = list.acquire();
            assert_eq!(list.ref_count(), before + 1);

            second.release();
            assert_eq!(list.ref_count(), before);
        });
    }

    #[test]
    fn test_borrowed_view_does_not_count() {
        with_gil(|| {
            let list = Handle::new_list(std::iter::empty()).unwrap();
            let before = list.ref_count();
            let view = list.as_borrowed();
            assert!(view.is(&list));
            assert_eq!(list.ref_count(), before);

            let owned = view.to_handle();
            assert_eq!(list.ref_count(), before + 1);
            drop(owned);
            assert_eq!(list.ref_count(), before);
        });
    }

    #[test]
    fn test_into_raw_transfers_reference() {
        with_gil(|| {
            let list = Handle::new_list(std::iter::empty()).unwrap();
            let keeper = list.acquire();
            let before = keeper.ref_count();

            let raw = list.into_raw();
            assert_eq!(keeper.ref_count(), before);

            let back = unsafe { Handle::from_owned_ptr(raw) }.unwrap();
            drop(back);
            assert_eq!(keeper.ref_count(), before - 1);
        });
    }

    #[test]
    fn test_null_pointers_are_rejected() {
        assert!(unsafe { Handle::from_owned_ptr(std::ptr::null_mut()) }.is_none());
        assert!(unsafe { Handle::from_borrowed_ptr(std::ptr::null_mut()) }.is_none());
        assert!(unsafe { Borrowed::from_ptr(std::ptr::null_mut()) }.is_none());
    }

    #[test]
    fn test_singletons() {
        with_gil(|| {
            assert!(Borrowed::none().is_none());
            assert!(Borrowed::py_true().is_bool());
            assert!(!Borrowed::py_false().is(&Borrowed::py_true()));
        });
    }
}
