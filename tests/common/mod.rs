//! Common test utilities for the hello-world tests.

use std::path::PathBuf;
use std::process::Command;
use std::sync::OnceLock;

use pyembed_runtime::{Interpreter, InterpreterConfig};

/// Directory holding `foo.py`.
#[allow(dead_code)]
pub fn demo_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/hello-world")
}

static INTERPRETER: OnceLock<Interpreter> = OnceLock::new();

/// The interpreter shared by every test in the binary, with `foo.py`
/// importable. No thread holds its lock between tests.
#[allow(dead_code)]
pub fn interpreter() -> &'static Interpreter {
    INTERPRETER.get_or_init(|| {
        let config = InterpreterConfig::default()
            .search_path(demo_dir())
            .install_signal_handlers(false);
        let interpreter = Interpreter::with_config(config).expect("Failed to initialize Python");
        std::mem::forget(interpreter.save_thread());
        interpreter
    })
}

/// Run the `pyembed` binary and return its stdout; panics if it fails.
#[allow(dead_code)]
pub fn run_pyembed(args: &[&str]) -> String {
    let output = Command::new(env!("CARGO_BIN_EXE_pyembed"))
        .args(args)
        .output()
        .expect("Failed to execute pyembed");

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("pyembed failed: {}", stderr);
    }

    String::from_utf8_lossy(&output.stdout).into_owned()
}
