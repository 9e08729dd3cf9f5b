//! Common utilities for interpreter lifecycle tests.

use std::fs;
use std::path::{Path, PathBuf};

use pyembed_runtime::{Interpreter, InterpreterConfig};

/// Write `source` as the importable module `name` under `dir`.
#[allow(dead_code)]
pub fn write_module(dir: &Path, name: &str, source: &str) -> PathBuf {
    let path = dir.join(format!("{name}.py"));
    fs::write(&path, source).expect("Failed to write Python module");
    path
}

/// Start an interpreter that leaves process signal handling to the test harness.
#[allow(dead_code)]
pub fn start(config: InterpreterConfig) -> Interpreter {
    Interpreter::with_config(config.install_signal_handlers(false))
        .expect("Failed to initialize the interpreter")
}
