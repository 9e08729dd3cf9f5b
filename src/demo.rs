//! The hello-world walkthrough: Rust and Python calling each other.
//!
//! Expects `foo.py` from `demos/hello-world` on the Python search path.

use std::thread;

use pyembed_runtime::prelude::*;
use pyembed_runtime::{Error, Handle, Interpreter, Result, Value, import};

use crate::api;

pub const FOO_MODULE: &str = "foo";

/// Register the `api` module and import `foo`, which imports it in turn.
pub fn load() -> Result<Handle> {
    api::create_module()?.enable_module()?;
    import(FOO_MODULE)
}

/// Run every scenario in order, printing as it goes.
pub fn run(interpreter: &Interpreter, workers: usize, rounds: usize) -> Result<()> {
    println!("Rust >> Python version:\n{}", Interpreter::version());
    println!();

    println!("Rust >> Type checking:");
    println!("Rust >> IsFloat: {}", type_checking()?);
    println!();

    let foo = load()?;

    println!("Rust >> Calling a Python function:");
    println!("Rust >> Python function returned: {}", call_python_function(&foo, "Tal")?);
    println!();

    println!("Rust >> Calling a Python method:");
    call_python_method(&foo)?;
    println!();

    println!("Rust >> Python exception as Rust error:");
    match python_exception(&foo) {
        Some(err) => println!("Rust >> Error message: {err}"),
        None => println!("Rust >> No error was raised"),
    }
    println!();

    call_rust_from_python(&foo)?;
    println!();

    println!("Rust >> Concurrency:");
    let size = concurrency(interpreter, &foo, workers, rounds)?;
    println!("Rust >> Size is {size}");
    Ok(())
}

pub fn type_checking() -> Result<bool> {
    Ok(Handle::new_float(1.0)?.is_float())
}

/// `foo.hello(name)`
pub fn call_python_function(foo: &Handle, name: &str) -> Result<String> {
    foo.get_attr("hello")?.call([Value::from(name)])?.extract_string()
}

/// `foo.person.greet()`
pub fn call_python_method(foo: &Handle) -> Result<()> {
    foo.get_attr("person")?.call_method("greet", [])?;
    Ok(())
}

/// `foo.bad()`, which always raises.
pub fn python_exception(foo: &Handle) -> Option<Error> {
    let bad = match foo.get_attr("bad") {
        Ok(bad) => bad,
        Err(err) => return Some(err),
    };
    bad.call([]).err()
}

/// Python functions that call back into the `api` module.
pub fn call_rust_from_python(foo: &Handle) -> Result<()> {
    for name in ["goodbye", "say_name", "say_name_fast"] {
        foo.get_attr(name)?.call([])?;
    }
    Ok(())
}

/// `workers` threads each add one to `foo.size` `rounds` times; returns `foo.size`.
///
/// The calling thread must hold the lock. It gives it up while the workers
/// run, and each worker ensures it around every read-modify-write. The
/// update is made through the C API, which does not give the lock up
/// between the read and the write.
pub fn concurrency(
    interpreter: &Interpreter,
    foo: &Handle,
    workers: usize,
    rounds: usize,
) -> Result<i64> {
    interpreter.allow_threads(|| {
        thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    scope.spawn(move || -> Result<()> {
                        for _ in 0..rounds {
                            // Python does not know this thread; ensure registers it.
                            let gil = interpreter.ensure_gil();
                            let size = foo.get_attr("size")?.extract_i64()?;
                            foo.set_attr("size", &Handle::new_long(size + 1)?)?;
                            gil.release();
                        }
                        tracing::debug!(worker, rounds, "worker finished");
                        Ok(())
                    })
                })
                .collect();
            handles.into_iter().try_for_each(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
            })
        })
    })?;

    foo.get_attr("size")?.extract_i64()
}
