//! Conversions between host values and Python primitives.
//!
//! Host input is described by [`Value`], one variant per Python constructor,
//! and turned into an object by a single match in [`Handle::from_value`].
//! The [`Primitive`] trait adds the type probes and extractors.
//!
//! Type probes come in two flavors that agree for every well-formed object:
//! the `*_SUBCLASS` flag test where the interpreter maintains one (int, str,
//! tuple, list, dict, bytes), and an MRO walk for the rest.

use std::borrow::Cow;
use std::ffi::c_char;

use pyo3_ffi as ffi;

use crate::error::{Result, current_error};
use crate::exception;
use crate::handle::{Borrowed, Handle};
use crate::object::{Object, utf8_contents};
use crate::types::{TypeFlags, TypeObject};

/// A host value to be converted into a Python object.
#[derive(Debug)]
pub enum Value<'a> {
    None,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(Cow<'a, str>),
    Bytes(Cow<'a, [u8]>),
    ByteArray(Cow<'a, [u8]>),
    Tuple(Vec<Value<'a>>),
    List(Vec<Value<'a>>),
    Dict(Vec<(Value<'a>, Value<'a>)>),
    Set(Vec<Value<'a>>),
    FrozenSet(Vec<Value<'a>>),
    /// An existing object; a new reference is acquired for the container.
    Object(&'a Handle),
    /// An existing object whose reference is handed over.
    Owned(Handle),
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident $(as $cast:ty)?;)*) => {
        $(
            impl From<$ty> for Value<'_> {
                fn from(value: $ty) -> Self {
                    Value::$variant(value $(as $cast)?)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool;
    i8 => Int as i64;
    i16 => Int as i64;
    i32 => Int as i64;
    i64 => Int;
    isize => Int as i64;
    u8 => UInt as u64;
    u16 => UInt as u64;
    u32 => UInt as u64;
    u64 => UInt;
    usize => UInt as u64;
    f32 => Float as f64;
    f64 => Float;
    Handle => Owned;
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(value: &'a str) -> Self {
        Value::Str(Cow::Borrowed(value))
    }
}

impl From<String> for Value<'_> {
    fn from(value: String) -> Self {
        Value::Str(Cow::Owned(value))
    }
}

impl<'a> From<&'a [u8]> for Value<'a> {
    fn from(value: &'a [u8]) -> Self {
        Value::Bytes(Cow::Borrowed(value))
    }
}

impl From<Vec<u8>> for Value<'_> {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(Cow::Owned(value))
    }
}

impl<'a> From<&'a Handle> for Value<'a> {
    fn from(value: &'a Handle) -> Self {
        Value::Object(value)
    }
}

impl<'a, T: Into<Value<'a>>> From<Option<T>> for Value<'a> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::None, Into::into)
    }
}

// =============================================================================
// Constructors
// =============================================================================

impl Handle {
    /// Convert a host value into a new Python object.
    pub fn from_value(value: Value<'_>) -> Result<Handle> {
        match value {
            Value::None => Ok(Handle::none()),
            Value::Bool(value) => Ok(Handle::bool(value)),
            Value::Int(value) => Handle::new_long(value),
            Value::UInt(value) => Handle::new_unsigned_long(value),
            Value::Float(value) => Handle::new_float(value),
            Value::Str(value) => Handle::new_unicode(&value),
            Value::Bytes(value) => Handle::new_bytes(&value),
            Value::ByteArray(value) => Handle::new_byte_array(&value),
            Value::Tuple(items) => Handle::new_tuple(items),
            Value::List(items) => Handle::new_list(items),
            Value::Dict(entries) => {
                let dict = Handle::new_dict()?;
                for (key, value) in entries {
                    let key = Handle::from_value(key)?;
                    let value = Handle::from_value(value)?;
                    dict.set_dict_item(&key, &value)?;
                }
                Ok(dict)
            }
            Value::Set(items) => Handle::new_set(items),
            Value::FrozenSet(items) => Handle::new_frozen_set(items),
            Value::Object(handle) => Ok(handle.acquire()),
            Value::Owned(handle) => Ok(handle),
        }
    }

    /// An owned reference to `None`.
    pub fn none() -> Handle {
        Borrowed::none().to_handle()
    }

    /// An owned reference to `True` or `False`.
    pub fn bool(value: bool) -> Handle {
        if value {
            Borrowed::py_true().to_handle()
        } else {
            Borrowed::py_false().to_handle()
        }
    }

    pub fn new_long(value: i64) -> Result<Handle> {
        unsafe { Handle::from_owned_ptr_or_err(ffi::PyLong_FromLongLong(value)) }
    }

    pub fn new_unsigned_long(value: u64) -> Result<Handle> {
        unsafe { Handle::from_owned_ptr_or_err(ffi::PyLong_FromUnsignedLongLong(value)) }
    }

    pub fn new_float(value: f64) -> Result<Handle> {
        unsafe { Handle::from_owned_ptr_or_err(ffi::PyFloat_FromDouble(value)) }
    }

    /// A `str` from UTF-8 text. Interior nul characters are preserved.
    pub fn new_unicode(value: &str) -> Result<Handle> {
        unsafe {
            Handle::from_owned_ptr_or_err(ffi::PyUnicode_FromStringAndSize(
                value.as_ptr() as *const c_char,
                value.len() as ffi::Py_ssize_t,
            ))
        }
    }

    /// An immutable `bytes` copy of `value`.
    pub fn new_bytes(value: &[u8]) -> Result<Handle> {
        unsafe {
            Handle::from_owned_ptr_or_err(ffi::PyBytes_FromStringAndSize(
                value.as_ptr() as *const c_char,
                value.len() as ffi::Py_ssize_t,
            ))
        }
    }

    /// A mutable `bytearray` copy of `value`.
    pub fn new_byte_array(value: &[u8]) -> Result<Handle> {
        unsafe {
            Handle::from_owned_ptr_or_err(ffi::PyByteArray_FromStringAndSize(
                value.as_ptr() as *const c_char,
                value.len() as ffi::Py_ssize_t,
            ))
        }
    }

    pub fn new_tuple<'a>(items: impl IntoIterator<Item = Value<'a>>) -> Result<Handle> {
        let items = items
            .into_iter()
            .map(Handle::from_value)
            .collect::<Result<Vec<_>>>()?;
        let tuple = unsafe { Handle::new_tuple_with_len(items.len()) }?;
        for (index, item) in items.into_iter().enumerate() {
            tuple.set_tuple_item(index, item)?;
        }
        Ok(tuple)
    }

    pub fn new_list<'a>(items: impl IntoIterator<Item = Value<'a>>) -> Result<Handle> {
        let items = items
            .into_iter()
            .map(Handle::from_value)
            .collect::<Result<Vec<_>>>()?;
        let list = unsafe { Handle::new_list_with_len(items.len()) }?;
        for (index, item) in items.into_iter().enumerate() {
            list.set_list_item(index, item)?;
        }
        Ok(list)
    }

    /// A tuple of `len` empty slots, to be filled with [`Primitive::set_tuple_item`].
    ///
    /// # Safety
    ///
    /// Every slot must be filled before the tuple is handed to any other
    /// C API or to Python code.
    pub unsafe fn new_tuple_with_len(len: usize) -> Result<Handle> {
        unsafe { Handle::from_owned_ptr_or_err(ffi::PyTuple_New(len as ffi::Py_ssize_t)) }
    }

    /// A list of `len` empty slots, to be filled with [`Primitive::set_list_item`].
    ///
    /// # Safety
    ///
    /// Same as [`Handle::new_tuple_with_len`].
    pub unsafe fn new_list_with_len(len: usize) -> Result<Handle> {
        unsafe { Handle::from_owned_ptr_or_err(ffi::PyList_New(len as ffi::Py_ssize_t)) }
    }

    pub fn new_dict() -> Result<Handle> {
        unsafe { Handle::from_owned_ptr_or_err(ffi::PyDict_New()) }
    }

    pub fn new_set<'a>(items: impl IntoIterator<Item = Value<'a>>) -> Result<Handle> {
        let iterable = Handle::new_list(items)?;
        unsafe { Handle::from_owned_ptr_or_err(ffi::PySet_New(iterable.as_ptr())) }
    }

    pub fn new_frozen_set<'a>(items: impl IntoIterator<Item = Value<'a>>) -> Result<Handle> {
        let iterable = Handle::new_list(items)?;
        unsafe { Handle::from_owned_ptr_or_err(ffi::PyFrozenSet_New(iterable.as_ptr())) }
    }
}

// =============================================================================
// Probes and extractors
// =============================================================================

/// Type probes, extractors and container access for primitive objects.
///
/// Extractors report a wrong dynamic type as a Python `TypeError` and an
/// out-of-range number as `OverflowError`, both as [`Error::Python`](crate::Error::Python).
pub trait Primitive: Object {
    fn is_bool(&self) -> bool {
        self.is_instance_of(TypeObject::bool())
    }

    fn is_long(&self) -> bool {
        self.type_of().has_flag(TypeFlags::LONG_SUBCLASS)
    }

    fn is_float(&self) -> bool {
        self.is_instance_of(TypeObject::float())
    }

    fn is_unicode(&self) -> bool {
        self.type_of().has_flag(TypeFlags::UNICODE_SUBCLASS)
    }

    fn is_tuple(&self) -> bool {
        self.type_of().has_flag(TypeFlags::TUPLE_SUBCLASS)
    }

    fn is_list(&self) -> bool {
        self.type_of().has_flag(TypeFlags::LIST_SUBCLASS)
    }

    fn is_dict(&self) -> bool {
        self.type_of().has_flag(TypeFlags::DICT_SUBCLASS)
    }

    fn is_set(&self) -> bool {
        self.is_instance_of(TypeObject::set())
    }

    fn is_frozen_set(&self) -> bool {
        self.is_instance_of(TypeObject::frozen_set())
    }

    fn is_bytes(&self) -> bool {
        self.type_of().has_flag(TypeFlags::BYTES_SUBCLASS)
    }

    fn is_byte_array(&self) -> bool {
        self.is_instance_of(TypeObject::byte_array())
    }

    fn is_module(&self) -> bool {
        self.is_instance_of(TypeObject::module())
    }

    /// `True`/`False` only; other objects are not coerced by truthiness.
    fn extract_bool(&self) -> Result<bool> {
        if self.is(&Borrowed::py_true()) {
            Ok(true)
        } else if self.is(&Borrowed::py_false()) {
            Ok(false)
        } else {
            Err(exception::raise_type_error(&format!(
                "expected bool, got {}",
                self.type_of().name()
            )))
        }
    }

    fn extract_i64(&self) -> Result<i64> {
        let value = unsafe { ffi::PyLong_AsLongLong(self.as_ptr()) };
        if value == -1 && unsafe { !ffi::PyErr_Occurred().is_null() } {
            return Err(current_error());
        }
        Ok(value)
    }

    /// Accepts `float` and anything implementing `__float__` or `__index__`.
    fn extract_f64(&self) -> Result<f64> {
        let value = unsafe { ffi::PyFloat_AsDouble(self.as_ptr()) };
        if value == -1.0 && unsafe { !ffi::PyErr_Occurred().is_null() } {
            return Err(current_error());
        }
        Ok(value)
    }

    fn extract_string(&self) -> Result<String> {
        unsafe { utf8_contents(self.as_ptr()) }.ok_or_else(current_error)
    }

    fn extract_bytes(&self) -> Result<Vec<u8>> {
        self.bytes_view().map(<[u8]>::to_vec)
    }

    fn extract_byte_array(&self) -> Result<Vec<u8>> {
        unsafe { self.byte_array_view() }.map(<[u8]>::to_vec)
    }

    /// The contents of a `bytes` object, without copying.
    fn bytes_view(&self) -> Result<&[u8]> {
        let data = unsafe { ffi::PyBytes_AsString(self.as_ptr()) };
        if data.is_null() {
            return Err(current_error());
        }
        let size = unsafe { ffi::PyBytes_Size(self.as_ptr()) } as usize;
        Ok(unsafe { std::slice::from_raw_parts(data as *const u8, size) })
    }

    /// The current buffer of a `bytearray` object, without copying.
    ///
    /// # Safety
    ///
    /// The bytearray is mutable: no Python code may run and nothing may
    /// resize or write to it while the view is alive.
    unsafe fn byte_array_view(&self) -> Result<&[u8]> {
        // PyByteArray_AsString does not check the type of its argument.
        if !self.is_byte_array() {
            return Err(exception::raise_type_error(&format!(
                "expected bytearray, got {}",
                self.type_of().name()
            )));
        }
        let data = unsafe { ffi::PyByteArray_AsString(self.as_ptr()) };
        if data.is_null() {
            return Err(current_error());
        }
        let size = unsafe { ffi::PyByteArray_Size(self.as_ptr()) } as usize;
        Ok(unsafe { std::slice::from_raw_parts(data as *const u8, size) })
    }

    /// Borrow a tuple item. Raises `IndexError` when out of range.
    fn tuple_item(&self, index: usize) -> Result<Borrowed<'_>> {
        let item = unsafe { ffi::PyTuple_GetItem(self.as_ptr(), index as ffi::Py_ssize_t) };
        unsafe { Borrowed::from_ptr(item) }.ok_or_else(current_error)
    }

    /// Borrow a list item. Raises `IndexError` when out of range.
    ///
    /// The view is only valid while the list is not mutated.
    fn list_item(&self, index: usize) -> Result<Borrowed<'_>> {
        let item = unsafe { ffi::PyList_GetItem(self.as_ptr(), index as ffi::Py_ssize_t) };
        unsafe { Borrowed::from_ptr(item) }.ok_or_else(current_error)
    }

    /// Fill slot `index` of a tuple, taking over `item`.
    ///
    /// Only valid on a tuple nothing else has seen yet; the interpreter
    /// raises `SystemError` for a shared one and `IndexError` out of range.
    fn set_tuple_item(&self, index: usize, item: Handle) -> Result<()> {
        // Steals the item reference, even on failure.
        let status = unsafe {
            ffi::PyTuple_SetItem(self.as_ptr(), index as ffi::Py_ssize_t, item.into_raw())
        };
        if status == 0 {
            Ok(())
        } else {
            Err(current_error())
        }
    }

    /// `list[index] = item`, taking over `item`. Raises `IndexError` out of range.
    fn set_list_item(&self, index: usize, item: Handle) -> Result<()> {
        // Steals the item reference, even on failure.
        let status = unsafe {
            ffi::PyList_SetItem(self.as_ptr(), index as ffi::Py_ssize_t, item.into_raw())
        };
        if status == 0 {
            Ok(())
        } else {
            Err(current_error())
        }
    }

    /// `dict[key] = value`. The dict acquires its own references.
    fn set_dict_item(
        &self,
        key: &(impl Object + ?Sized),
        value: &(impl Object + ?Sized),
    ) -> Result<()> {
        let status = unsafe { ffi::PyDict_SetItem(self.as_ptr(), key.as_ptr(), value.as_ptr()) };
        if status == 0 {
            Ok(())
        } else {
            Err(current_error())
        }
    }

    /// Borrow `dict[key]` for a string key, or `None` if absent.
    fn dict_item(&self, key: &str) -> Result<Option<Borrowed<'_>>> {
        let key = Handle::new_unicode(key)?;
        let item = unsafe { ffi::PyDict_GetItemWithError(self.as_ptr(), key.as_ptr()) };
        if item.is_null() && unsafe { !ffi::PyErr_Occurred().is_null() } {
            return Err(current_error());
        }
        Ok(unsafe { Borrowed::from_ptr(item) })
    }
}

impl<T: Object + ?Sized> Primitive for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::module::module_from_source;
    use crate::tests::with_gil;

    fn type_name_of(err: Error) -> String {
        match err {
            Error::Python(exception) => exception.type_name(),
            other => panic!("expected a Python exception, got {other}"),
        }
    }

    #[test]
    fn test_long_round_trip() {
        with_gil(|| {
            for value in [0, 1, -1, i64::MIN, i64::MAX] {
                let handle = Handle::new_long(value).unwrap();
                assert!(handle.is_long());
                assert_eq!(handle.extract_i64().unwrap(), value);
            }
        });
    }

    #[test]
    fn test_long_overflow_is_error() {
        with_gil(|| {
            let big = Handle::new_unsigned_long(u64::MAX).unwrap();
            assert_eq!(big.stringify(), u64::MAX.to_string());
            let err = big.extract_i64().unwrap_err();
            assert_eq!(type_name_of(err), "OverflowError");
        });
    }

    #[test]
    fn test_float_round_trip() {
        with_gil(|| {
            for value in [0.0, -2.5, f64::MAX, f64::MIN_POSITIVE, f64::INFINITY] {
                let handle = Handle::new_float(value).unwrap();
                assert!(handle.is_float());
                assert_eq!(handle.extract_f64().unwrap(), value);
            }
            // -1.0 is also the C API's error marker.
            let minus_one = Handle::new_float(-1.0).unwrap();
            assert_eq!(minus_one.extract_f64().unwrap(), -1.0);
        });
    }

    #[test]
    fn test_unicode_round_trip() {
        with_gil(|| {
            for value in ["", "Hello", "héllo wörld", "emoji 🐍", "nul\0inside"] {
                let handle = Handle::new_unicode(value).unwrap();
                assert!(handle.is_unicode());
                assert_eq!(handle.extract_string().unwrap(), value);
            }
        });
    }

    #[test]
    fn test_bytes_round_trip() {
        with_gil(|| {
            let data = [0u8, 1, 2, 255, 0];
            let bytes = Handle::new_bytes(&data).unwrap();
            assert!(bytes.is_bytes());
            assert!(!bytes.is_byte_array());
            assert_eq!(bytes.extract_bytes().unwrap(), data);

            let array = Handle::new_byte_array(&data).unwrap();
            assert!(array.is_byte_array());
            assert!(!array.is_bytes());
            assert_eq!(array.extract_byte_array().unwrap(), data);
        });
    }

    #[test]
    fn test_extract_wrong_type() {
        with_gil(|| {
            let text = Handle::new_unicode("12").unwrap();
            assert_eq!(type_name_of(text.extract_i64().unwrap_err()), "TypeError");
            assert_eq!(type_name_of(text.extract_f64().unwrap_err()), "TypeError");
            assert_eq!(type_name_of(text.extract_bytes().unwrap_err()), "TypeError");
            assert_eq!(type_name_of(text.extract_byte_array().unwrap_err()), "TypeError");
            assert_eq!(type_name_of(text.extract_bool().unwrap_err()), "TypeError");

            let number = Handle::new_long(12).unwrap();
            assert_eq!(type_name_of(number.extract_string().unwrap_err()), "TypeError");
            // The failed extraction leaves nothing pending.
            assert!(!crate::PyException::occurred());
        });
    }

    #[test]
    fn test_bool_singletons() {
        with_gil(|| {
            let yes = Handle::from_value(Value::from(true)).unwrap();
            assert!(yes.is_bool());
            assert!(yes.is_long());
            assert!(yes.extract_bool().unwrap());
            assert!(!Handle::bool(false).extract_bool().unwrap());
            assert_eq!(yes.extract_i64().unwrap(), 1);
        });
    }

    #[test]
    fn test_flag_and_subtype_probes_agree() {
        with_gil(|| {
            let module = module_from_source(
                "probe_subtypes",
                "class MyInt(int): pass\n\
                 class MyStr(str): pass\n\
                 class MyTuple(tuple): pass\n\
                 class MyList(list): pass\n\
                 class MyDict(dict): pass\n\
                 class MyBytes(bytes): pass\n\
                 values = [MyInt(3), MyStr('s'), MyTuple(), MyList(), MyDict(), MyBytes(b'x')]\n",
            )
            .unwrap();
            let subclassed = module.get_attr("values").unwrap();

            let mut instances = vec![
                Handle::new_long(3).unwrap(),
                Handle::bool(true),
                Handle::new_unicode("s").unwrap(),
                Handle::new_tuple([Value::Int(1)]).unwrap(),
                Handle::new_list(std::iter::empty()).unwrap(),
                Handle::new_dict().unwrap(),
                Handle::new_bytes(b"x").unwrap(),
                Handle::new_float(1.0).unwrap(),
            ];
            for index in 0..subclassed.len().unwrap() {
                instances.push(subclassed.list_item(index).unwrap().to_handle());
            }

            for value in &instances {
                assert_eq!(value.is_long(), value.is_instance_of(TypeObject::long()));
                assert_eq!(value.is_unicode(), value.is_instance_of(TypeObject::unicode()));
                assert_eq!(value.is_tuple(), value.is_instance_of(TypeObject::tuple()));
                assert_eq!(value.is_list(), value.is_instance_of(TypeObject::list()));
                assert_eq!(value.is_dict(), value.is_instance_of(TypeObject::dict()));
                assert_eq!(value.is_bytes(), value.is_instance_of(TypeObject::bytes()));
            }
            assert!(instances[8].is_long());
            assert!(instances[9].is_unicode());
        });
    }

    #[test]
    fn test_containers_from_values() {
        with_gil(|| {
            let tuple = Handle::from_value(Value::Tuple(vec![
                Value::from(1),
                Value::from("two"),
                Value::from(None::<i64>),
            ]))
            .unwrap();
            assert!(tuple.is_tuple());
            assert_eq!(tuple.len().unwrap(), 3);
            assert_eq!(tuple.tuple_item(1).unwrap().extract_string().unwrap(), "two");
            assert!(tuple.tuple_item(2).unwrap().is_none());
            assert!(tuple.tuple_item(3).is_err());

            let dict = Handle::from_value(Value::Dict(vec![(Value::from("k"), Value::from(2.5))]))
                .unwrap();
            assert!(dict.is_dict());
            let item = dict.dict_item("k").unwrap().unwrap();
            assert_eq!(item.extract_f64().unwrap(), 2.5);
            assert!(dict.dict_item("missing").unwrap().is_none());

            let set = Handle::new_set([Value::Int(1), Value::Int(1), Value::Int(2)]).unwrap();
            assert!(set.is_set());
            assert_eq!(set.len().unwrap(), 2);

            let frozen = Handle::new_frozen_set([Value::from("a")]).unwrap();
            assert!(frozen.is_frozen_set());
            assert!(!frozen.is_set());
        });
    }

    #[test]
    fn test_container_keeps_item_alive() {
        with_gil(|| {
            let item = Handle::new_list(std::iter::empty()).unwrap();
            let before = item.ref_count();

            let list = Handle::new_list([Value::from(&item)]).unwrap();
            assert_eq!(item.ref_count(), before + 1);
            assert!(list.list_item(0).unwrap().is(&item));

            drop(list);
            assert_eq!(item.ref_count(), before);
        });
    }

    #[test]
    fn test_owned_value_is_moved() {
        with_gil(|| {
            let item = Handle::new_list(std::iter::empty()).unwrap();
            let keeper = item.acquire();
            let before = keeper.ref_count();

            let tuple = Handle::new_tuple([Value::Owned(item)]).unwrap();
            assert_eq!(keeper.ref_count(), before);
            drop(tuple);
            assert_eq!(keeper.ref_count(), before - 1);
        });
    }

    #[test]
    fn test_buffer_views() {
        with_gil(|| {
            let bytes = Handle::new_bytes(b"view").unwrap();
            let view = bytes.bytes_view().unwrap();
            assert_eq!(view, b"view");
            assert_eq!(view.as_ptr(), bytes.bytes_view().unwrap().as_ptr());

            let array = Handle::new_byte_array(b"mutable").unwrap();
            assert_eq!(unsafe { array.byte_array_view() }.unwrap(), b"mutable");

            assert_eq!(type_name_of(array.bytes_view().unwrap_err()), "TypeError");
            assert_eq!(
                type_name_of(unsafe { bytes.byte_array_view() }.unwrap_err()),
                "TypeError"
            );
        });
    }

    #[test]
    fn test_sized_containers_filled_in_place() {
        with_gil(|| {
            let tuple = unsafe { Handle::new_tuple_with_len(2) }.unwrap();
            tuple.set_tuple_item(0, Handle::new_long(1).unwrap()).unwrap();
            tuple.set_tuple_item(1, Handle::new_unicode("two").unwrap()).unwrap();
            assert_eq!(tuple.stringify(), "(1, 'two')");
            let err = tuple.set_tuple_item(2, Handle::none()).unwrap_err();
            assert_eq!(type_name_of(err), "IndexError");

            let list = unsafe { Handle::new_list_with_len(1) }.unwrap();
            list.set_list_item(0, Handle::new_float(0.5).unwrap()).unwrap();
            assert_eq!(list.stringify(), "[0.5]");

            // Replacing an item releases the previous one.
            let item = Handle::new_list(std::iter::empty()).unwrap();
            let before = item.ref_count();
            list.set_list_item(0, item.acquire()).unwrap();
            assert_eq!(item.ref_count(), before + 1);
            list.set_list_item(0, Handle::none()).unwrap();
            assert_eq!(item.ref_count(), before);
        });
    }

    #[test]
    fn test_set_item_takes_reference_on_failure() {
        with_gil(|| {
            let item = Handle::new_list(std::iter::empty()).unwrap();
            let before = item.ref_count();

            let list = Handle::new_list([Value::Int(0)]).unwrap();
            let err = list.set_list_item(5, item.acquire()).unwrap_err();
            assert_eq!(type_name_of(err), "IndexError");
            assert_eq!(item.ref_count(), before);

            // A tuple someone else can see may not be filled.
            let tuple = Handle::new_tuple([Value::Int(0)]).unwrap();
            let _shared = tuple.acquire();
            let err = tuple.set_tuple_item(0, item.acquire()).unwrap_err();
            assert_eq!(type_name_of(err), "SystemError");
            assert_eq!(item.ref_count(), before);
        });
    }
}
