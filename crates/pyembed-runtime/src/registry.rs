//! Interned module and method definitions.
//!
//! The interpreter keeps raw pointers to `PyModuleDef` and `PyMethodDef`
//! records for as long as the objects created from them live, which for
//! module members is the rest of the process. Definitions are therefore
//! allocated once, leaked, and shared by every later registration with the
//! same key.

use std::ffi::{CString, c_int};
use std::ptr;
use std::sync::LazyLock;

use dashmap::DashMap;
use pyo3_ffi as ffi;

use crate::error::Result;
use crate::module::HostFunction;

static DEFINITIONS: LazyLock<DefinitionTable> = LazyLock::new(DefinitionTable::new);

/// A leaked definition record.
struct Leaked<T>(*mut T);

// SAFETY: the record is never freed and only read by the interpreter, which
// does so with its lock held.
unsafe impl<T> Send for Leaked<T> {}
unsafe impl<T> Sync for Leaked<T> {}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MethodKey {
    name: String,
    flags: c_int,
    address: usize,
}

struct DefinitionTable {
    modules: DashMap<String, Leaked<ffi::PyModuleDef>>,
    methods: DashMap<MethodKey, Leaked<ffi::PyMethodDef>>,
}

impl DefinitionTable {
    fn new() -> Self {
        Self {
            modules: DashMap::new(),
            methods: DashMap::new(),
        }
    }

    fn module(&self, name: &str) -> Result<*mut ffi::PyModuleDef> {
        if let Some(def) = self.modules.get(name) {
            return Ok(def.0);
        }
        let m_name = CString::new(name)?;
        let def = self
            .modules
            .entry(name.to_owned())
            .or_insert_with(|| {
                Leaked(Box::into_raw(Box::new(ffi::PyModuleDef {
                    m_base: ffi::PyModuleDef_HEAD_INIT,
                    m_name: m_name.into_raw(),
                    m_doc: ptr::null(),
                    m_size: 0,
                    m_methods: ptr::null_mut(),
                    m_slots: ptr::null_mut(),
                    m_traverse: None,
                    m_clear: None,
                    m_free: None,
                })))
            });
        Ok(def.0)
    }

    /// A method table holding `function` followed by the zeroed sentinel.
    fn method(&self, name: &str, function: &HostFunction) -> Result<*mut ffi::PyMethodDef> {
        let key = MethodKey {
            name: name.to_owned(),
            flags: function.flags(),
            address: function.address(),
        };
        if let Some(def) = self.methods.get(&key) {
            return Ok(def.0);
        }
        let ml_name = CString::new(name)?;
        let def = self.methods.entry(key).or_insert_with(|| {
            let table = Box::new([
                ffi::PyMethodDef {
                    ml_name: ml_name.into_raw(),
                    ml_meth: ffi::PyMethodDefPointer {
                        PyCFunction: function.as_cfunction(),
                    },
                    ml_flags: function.flags(),
                    ml_doc: ptr::null(),
                },
                ffi::PyMethodDef::zeroed(),
            ]);
            Leaked(Box::into_raw(table).cast())
        });
        Ok(def.0)
    }
}

pub(crate) fn module_def(name: &str) -> Result<*mut ffi::PyModuleDef> {
    DEFINITIONS.module(name)
}

pub(crate) fn method_def(name: &str, function: &HostFunction) -> Result<*mut ffi::PyMethodDef> {
    DEFINITIONS.method(name, function)
}

#[cfg(test)]
pub(crate) fn method_count() -> usize {
    DEFINITIONS.methods.len()
}
