//! The hello-world scenarios, run in-process against `demos/hello-world/foo.py`.

mod common;

use std::sync::OnceLock;

use pyembed::{api, demo};
use pyembed_runtime::prelude::*;
use pyembed_runtime::{Error, Handle, Value, import};

/// `foo`, imported once with the `api` module registered.
fn foo() -> &'static Handle {
    static FOO: OnceLock<Handle> = OnceLock::new();
    FOO.get_or_init(|| common::interpreter().with_gil(|| demo::load().unwrap()))
}

#[test]
fn test_type_checking() {
    common::interpreter().with_gil(|| assert!(demo::type_checking().unwrap()));
}

#[test]
fn test_call_python_function() {
    let foo = foo();
    common::interpreter().with_gil(|| {
        assert_eq!(demo::call_python_function(foo, "Tal").unwrap(), "You are Tal");
        demo::call_python_method(foo).unwrap();
    });
}

#[test]
fn test_python_exception_becomes_error() {
    let foo = foo();
    common::interpreter().with_gil(|| {
        let err = demo::python_exception(foo).unwrap();
        assert!(matches!(err, Error::Python(_)));
        insta::assert_snapshot!(err.to_string(), @"this is a Python exception");
        assert_eq!(err.as_exception().unwrap().type_name(), "Exception");
    });
}

#[test]
fn test_concat_through_api_module() {
    let foo = foo();
    common::interpreter().with_gil(|| {
        demo::call_rust_from_python(foo).unwrap();

        let api = import(api::MODULE_NAME).unwrap();
        for function in ["concat", "concat_fast"] {
            let joined = api
                .call_method(function, [Value::from("Hello"), Value::from("World")])
                .unwrap();
            assert_eq!(joined.extract_string().unwrap(), "Hello World");
        }

        let err = api
            .call_method("concat", [Value::from("Hello")])
            .unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"concat() takes exactly 2 arguments (1 given)");

        let err = api
            .call_method("concat_fast", [Value::from("Hello"), Value::Int(1)])
            .unwrap_err();
        assert_eq!(err.as_exception().unwrap().type_name(), "TypeError");
    });
}

#[test]
fn test_concurrency_counts_every_update() {
    let interpreter = common::interpreter();
    let foo = foo();
    let size = interpreter.with_gil(|| demo::concurrency(interpreter, foo, 5, 100).unwrap());
    assert_eq!(size, 500);
}

#[test]
fn test_cli_call() {
    let dir = common::demo_dir();
    let stdout = common::run_pyembed(&[
        "call",
        "foo",
        "hello",
        "Tal",
        "--path",
        dir.to_str().unwrap(),
    ]);
    assert!(stdout.lines().any(|line| line == "You are Tal"), "{stdout}");
}

#[test]
fn test_cli_demo() {
    let dir = common::demo_dir();
    let stdout = common::run_pyembed(&["demo", "--path", dir.to_str().unwrap()]);
    assert!(stdout.contains("Rust >> IsFloat: true"), "{stdout}");
    assert!(stdout.contains("Rust >> Error message: this is a Python exception"), "{stdout}");
    assert!(stdout.contains("Rust >> Concatenating \"Tal\" and \"Liron\""), "{stdout}");
    assert!(stdout.contains("Rust >> Size is 500"), "{stdout}");
}
