//! Python modules and host functions registered into them.
//!
//! A host function is an `extern "C"` function with one of the calling
//! conventions the interpreter supports for builtins. [`HostFunction`] tags
//! the function pointer with its convention; [`ModuleExt::add_function`]
//! installs it as a module member.
//!
//! Bodies of host functions should run through [`bridge::guard`](crate::bridge::guard)
//! so that errors and panics become Python exceptions instead of unwinding
//! into the interpreter.

use std::ffi::{CStr, CString, c_int};
use std::mem;

use pyo3_ffi as ffi;

use crate::error::{Result, current_error};
use crate::handle::{Borrowed, Handle};
use crate::import::import;
use crate::object::Object;
use crate::primitive::{Primitive, Value};
use crate::registry;

// =============================================================================
// Calling conventions
// =============================================================================

/// `METH_NOARGS`: the second argument is always null.
pub type NoArgsFunction =
    unsafe extern "C" fn(slf: *mut ffi::PyObject, unused: *mut ffi::PyObject) -> *mut ffi::PyObject;

/// `METH_O`: the second argument is the single positional argument.
pub type OneArgFunction =
    unsafe extern "C" fn(slf: *mut ffi::PyObject, arg: *mut ffi::PyObject) -> *mut ffi::PyObject;

/// `METH_VARARGS`: the second argument is the tuple of positional arguments.
pub type VarArgsFunction =
    unsafe extern "C" fn(slf: *mut ffi::PyObject, args: *mut ffi::PyObject) -> *mut ffi::PyObject;

/// `METH_VARARGS | METH_KEYWORDS`: positional tuple plus a keyword dict, which may be null.
pub type VarArgsKeywordsFunction = unsafe extern "C" fn(
    slf: *mut ffi::PyObject,
    args: *mut ffi::PyObject,
    kwargs: *mut ffi::PyObject,
) -> *mut ffi::PyObject;

/// `METH_FASTCALL`: positional arguments as a C array.
pub type FastFunction = unsafe extern "C" fn(
    slf: *mut ffi::PyObject,
    args: *const *mut ffi::PyObject,
    nargs: ffi::Py_ssize_t,
) -> *mut ffi::PyObject;

/// `METH_FASTCALL | METH_KEYWORDS`: positional arguments followed by keyword
/// values in one array, plus a tuple of keyword names, which may be null.
pub type FastKeywordsFunction = unsafe extern "C" fn(
    slf: *mut ffi::PyObject,
    args: *const *mut ffi::PyObject,
    nargs: ffi::Py_ssize_t,
    kwnames: *mut ffi::PyObject,
) -> *mut ffi::PyObject;

/// A host function tagged with its calling convention.
#[derive(Debug, Clone, Copy)]
pub enum HostFunction {
    NoArgs(NoArgsFunction),
    OneArg(OneArgFunction),
    VarArgs(VarArgsFunction),
    VarArgsKeywords(VarArgsKeywordsFunction),
    Fast(FastFunction),
    FastKeywords(FastKeywordsFunction),
}

impl HostFunction {
    /// The `ml_flags` value for this convention.
    pub fn flags(&self) -> c_int {
        match self {
            HostFunction::NoArgs(_) => ffi::METH_NOARGS,
            HostFunction::OneArg(_) => ffi::METH_O,
            HostFunction::VarArgs(_) => ffi::METH_VARARGS,
            HostFunction::VarArgsKeywords(_) => ffi::METH_VARARGS | ffi::METH_KEYWORDS,
            HostFunction::Fast(_) => ffi::METH_FASTCALL,
            HostFunction::FastKeywords(_) => ffi::METH_FASTCALL | ffi::METH_KEYWORDS,
        }
    }

    pub fn convention(&self) -> &'static str {
        match self {
            HostFunction::NoArgs(_) => "noargs",
            HostFunction::OneArg(_) => "o",
            HostFunction::VarArgs(_) => "varargs",
            HostFunction::VarArgsKeywords(_) => "varargs+keywords",
            HostFunction::Fast(_) => "fastcall",
            HostFunction::FastKeywords(_) => "fastcall+keywords",
        }
    }

    /// The function pointer in the form `PyMethodDef::ml_meth` stores it.
    ///
    /// The interpreter casts it back according to the flags.
    pub(crate) fn as_cfunction(&self) -> ffi::PyCFunction {
        unsafe {
            match *self {
                HostFunction::NoArgs(f) | HostFunction::OneArg(f) | HostFunction::VarArgs(f) => f,
                HostFunction::VarArgsKeywords(f) => {
                    mem::transmute::<VarArgsKeywordsFunction, ffi::PyCFunction>(f)
                }
                HostFunction::Fast(f) => mem::transmute::<FastFunction, ffi::PyCFunction>(f),
                HostFunction::FastKeywords(f) => {
                    mem::transmute::<FastKeywordsFunction, ffi::PyCFunction>(f)
                }
            }
        }
    }

    pub(crate) fn address(&self) -> usize {
        self.as_cfunction() as usize
    }
}

// =============================================================================
// Module creation
// =============================================================================

/// Create an empty module from an interned module definition.
///
/// Repeated calls with the same name share one definition.
pub fn create_module(name: &str) -> Result<Handle> {
    let def = registry::module_def(name)?;
    let module = unsafe {
        Handle::from_owned_ptr_or_err(ffi::PyModule_Create2(def, ffi::PYTHON_API_VERSION))
    }?;
    tracing::debug!(module = name, "created module");
    Ok(module)
}

/// Create an empty module object with `__name__` set, without a definition.
pub fn new_module(name: &str) -> Result<Handle> {
    let name = CString::new(name)?;
    unsafe { Handle::from_owned_ptr_or_err(ffi::PyModule_New(name.as_ptr())) }
}

/// Create a module and execute `source` in its namespace.
///
/// The module is not added to `sys.modules`; see [`ModuleExt::enable_module`].
pub fn module_from_source(name: &str, source: &str) -> Result<Handle> {
    let module = new_module(name)?;
    let namespace = module.get_attr("__dict__")?;
    import("builtins")?.call_method("exec", [Value::from(source), Value::from(&namespace)])?;
    Ok(module)
}

// =============================================================================
// Module operations
// =============================================================================

/// Operations on module objects.
pub trait ModuleExt: Object {
    /// The module's `__name__`.
    fn module_name(&self) -> Result<String> {
        // The returned buffer belongs to the module's name object.
        let name = unsafe { ffi::PyModule_GetName(self.as_ptr()) };
        if name.is_null() {
            return Err(current_error());
        }
        Ok(unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned())
    }

    /// Register the module in `sys.modules` so that `import` finds it.
    fn enable_module(&self) -> Result<()> {
        let name =
            unsafe { Handle::from_owned_ptr_or_err(ffi::PyModule_GetNameObject(self.as_ptr())) }?;
        // Borrowed from the interpreter state.
        let modules = unsafe { Borrowed::from_ptr(ffi::PyImport_GetModuleDict()) }
            .ok_or_else(current_error)?;
        modules.set_dict_item(&name, self)?;
        tracing::debug!(module = %name, "enabled module");
        Ok(())
    }

    /// Install `function` as the module member `name`.
    fn add_function(&self, name: &str, function: HostFunction) -> Result<()> {
        let def = registry::method_def(name, &function)?;
        if unsafe { ffi::PyModule_AddFunctions(self.as_ptr(), def) } != 0 {
            return Err(current_error());
        }
        tracing::debug!(
            function = name,
            convention = function.convention(),
            "registered host function"
        );
        Ok(())
    }

    fn add_function_no_args(&self, name: &str, function: NoArgsFunction) -> Result<()> {
        self.add_function(name, HostFunction::NoArgs(function))
    }

    fn add_function_one_arg(&self, name: &str, function: OneArgFunction) -> Result<()> {
        self.add_function(name, HostFunction::OneArg(function))
    }

    fn add_function_var_args(&self, name: &str, function: VarArgsFunction) -> Result<()> {
        self.add_function(name, HostFunction::VarArgs(function))
    }

    fn add_function_var_args_keywords(
        &self,
        name: &str,
        function: VarArgsKeywordsFunction,
    ) -> Result<()> {
        self.add_function(name, HostFunction::VarArgsKeywords(function))
    }

    fn add_function_fast(&self, name: &str, function: FastFunction) -> Result<()> {
        self.add_function(name, HostFunction::Fast(function))
    }

    fn add_function_fast_keywords(&self, name: &str, function: FastKeywordsFunction) -> Result<()> {
        self.add_function(name, HostFunction::FastKeywords(function))
    }
}

impl<T: Object + ?Sized> ModuleExt for T {}
