//! The `api` module: host functions that Python code can import and call.
//!
//! Each function comes in two layers: a plain Rust function, and an
//! `extern "C"` wrapper that converts between Python objects and Rust values.

use pyembed_runtime::ffi;
use pyembed_runtime::prelude::*;
use pyembed_runtime::{Handle, Result, bridge};

pub const MODULE_NAME: &str = "api";

/// Build the `api` module. Register it with `enable_module` to make it importable.
pub fn create_module() -> Result<Handle> {
    let module = pyembed_runtime::create_module(MODULE_NAME)?;
    module.add_function_no_args("say_goodbye", py_say_goodbye)?;
    module.add_function_var_args("concat", py_concat)?;
    module.add_function_fast("concat_fast", py_concat_fast)?;
    Ok(module)
}

pub fn say_goodbye() {
    println!("Rust >> Goodbye from Rust!");
}

pub fn concat(a: &str, b: &str) -> String {
    println!("Rust >> Concatenating {a:?} and {b:?}");
    format!("{a} {b}")
}

unsafe extern "C" fn py_say_goodbye(
    _slf: *mut ffi::PyObject,
    _unused: *mut ffi::PyObject,
) -> *mut ffi::PyObject {
    bridge::guard(|| {
        say_goodbye();
        Ok(Handle::none())
    })
}

// Positional arguments arrive as a tuple.
unsafe extern "C" fn py_concat(
    _slf: *mut ffi::PyObject,
    args: *mut ffi::PyObject,
) -> *mut ffi::PyObject {
    bridge::guard(|| {
        let args = unsafe { bridge::tuple_args(args) }?;
        bridge::expect_arg_count("concat", 2, args.len())?;
        let joined = concat(&args[0].extract_string()?, &args[1].extract_string()?);
        Handle::new_unicode(&joined)
    })
}

// Positional arguments arrive as a C array, without building a tuple.
unsafe extern "C" fn py_concat_fast(
    _slf: *mut ffi::PyObject,
    args: *const *mut ffi::PyObject,
    nargs: ffi::Py_ssize_t,
) -> *mut ffi::PyObject {
    bridge::guard(|| {
        let args = unsafe { bridge::fast_args(args, nargs) }?;
        bridge::expect_arg_count("concat_fast", 2, args.len())?;
        let joined = concat(&args[0].extract_string()?, &args[1].extract_string()?);
        Handle::new_unicode(&joined)
    })
}
