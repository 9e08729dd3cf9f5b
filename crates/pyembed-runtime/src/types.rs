//! Type tags.
//!
//! [`TypeObject`] is a non-owning, `Copy` view of a `PyTypeObject`. The
//! builtin types are statically allocated by the interpreter and never
//! released, so their views are `'static`. The type of an arbitrary instance
//! may be a heap type kept alive only by that instance, so
//! [`Object::type_of`](crate::Object::type_of) borrows the instance.

use std::ffi::{CStr, c_ulong};
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use pyo3_ffi as ffi;

use crate::handle::Borrowed;

/// Fast-path type flags (`Py_TPFLAGS_*`).
///
/// The `*_SUBCLASS` flags are set on a builtin type and inherited by every
/// subtype, so testing one is equivalent to walking the type's bases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeFlags(pub c_ulong);

impl TypeFlags {
    pub const LONG_SUBCLASS: Self = Self(ffi::Py_TPFLAGS_LONG_SUBCLASS);
    pub const LIST_SUBCLASS: Self = Self(ffi::Py_TPFLAGS_LIST_SUBCLASS);
    pub const TUPLE_SUBCLASS: Self = Self(ffi::Py_TPFLAGS_TUPLE_SUBCLASS);
    pub const BYTES_SUBCLASS: Self = Self(ffi::Py_TPFLAGS_BYTES_SUBCLASS);
    pub const UNICODE_SUBCLASS: Self = Self(ffi::Py_TPFLAGS_UNICODE_SUBCLASS);
    pub const DICT_SUBCLASS: Self = Self(ffi::Py_TPFLAGS_DICT_SUBCLASS);
    pub const BASE_EXC_SUBCLASS: Self = Self(ffi::Py_TPFLAGS_BASE_EXC_SUBCLASS);
    pub const TYPE_SUBCLASS: Self = Self(ffi::Py_TPFLAGS_TYPE_SUBCLASS);
}

/// A borrowed type tag, valid for `'a`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TypeObject<'a> {
    ptr: NonNull<ffi::PyTypeObject>,
    _marker: PhantomData<&'a ()>,
}

// SAFETY: the type object stays alive for 'a; reads go through the C API
// with the lock held.
unsafe impl Send for TypeObject<'_> {}
unsafe impl Sync for TypeObject<'_> {}

macro_rules! builtin_types {
    ($($(#[$doc:meta])* $name:ident => $static:ident;)*) => {
        impl TypeObject<'static> {
            $(
                $(#[$doc])*
                pub fn $name() -> Self {
                    unsafe { Self::from_raw(&raw mut ffi::$static) }
                }
            )*
        }
    };
}

builtin_types! {
    /// `bool`
    bool => PyBool_Type;
    /// `int`
    long => PyLong_Type;
    /// `float`
    float => PyFloat_Type;
    /// `str`
    unicode => PyUnicode_Type;
    /// `tuple`
    tuple => PyTuple_Type;
    /// `list`
    list => PyList_Type;
    /// `dict`
    dict => PyDict_Type;
    /// `set`
    set => PySet_Type;
    /// `frozenset`
    frozen_set => PyFrozenSet_Type;
    /// `bytes`
    bytes => PyBytes_Type;
    /// `bytearray`
    byte_array => PyByteArray_Type;
    /// `types.ModuleType`
    module => PyModule_Type;
}

impl<'a> TypeObject<'a> {
    /// # Safety
    ///
    /// `ptr` must point to a type object that stays alive for `'a`.
    pub unsafe fn from_raw(ptr: *mut ffi::PyTypeObject) -> Self {
        Self {
            ptr: NonNull::new(ptr).expect("ICE: null type object"),
            _marker: PhantomData,
        }
    }

    pub fn as_ptr(self) -> *mut ffi::PyTypeObject {
        self.ptr.as_ptr()
    }

    /// The type viewed as an ordinary object.
    pub fn as_object(self) -> Borrowed<'a> {
        unsafe { Borrowed::from_ptr(self.ptr.as_ptr().cast()) }.expect("ICE: null type object")
    }

    /// Whether `self` is `other` or derives from it (walks the MRO).
    pub fn is_subtype(self, other: TypeObject<'_>) -> bool {
        unsafe { ffi::PyType_IsSubtype(self.as_ptr(), other.as_ptr()) != 0 }
    }

    pub fn flags(self) -> TypeFlags {
        TypeFlags(unsafe { ffi::PyType_GetFlags(self.as_ptr()) })
    }

    pub fn has_flag(self, flag: TypeFlags) -> bool {
        self.flags().0 & flag.0 != 0
    }

    /// The type's `tp_name`, e.g. `"int"` or `"collections.OrderedDict"`.
    pub fn name(self) -> String {
        let name = unsafe { (*self.as_ptr()).tp_name };
        if name.is_null() {
            return String::new();
        }
        unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned()
    }
}

impl fmt::Debug for TypeObject<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeObject").field(&self.name()).finish()
    }
}
