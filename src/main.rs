//! Embedding demo entry point.

mod cli;

use std::path::PathBuf;

use clap::Parser;
use cli::{Cli, Command};
use pyembed::{api, demo};
use pyembed_runtime::path::prepend_python_path;
use pyembed_runtime::prelude::*;
use pyembed_runtime::{Error, Interpreter, InterpreterConfig, Value, import};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Version => {
            println!("{}", Interpreter::version());
            println!("linked against Python {}", env!("PYEMBED_LINKED_PYTHON"));
            Ok(())
        }
        Command::Demo {
            path,
            workers,
            rounds,
        } => run_demo(path, workers, rounds),
        Command::Call {
            module,
            function,
            args,
            paths,
        } => call(paths, &module, &function, args),
    };

    if let Err(message) = result {
        eprint!("{message}");
        std::process::exit(1);
    }
}

fn run_demo(path: PathBuf, workers: usize, rounds: usize) -> Result<(), String> {
    // SAFETY: no other thread exists yet.
    unsafe { prepend_python_path([&path]) }.map_err(render)?;

    let interpreter = Interpreter::initialize().map_err(render)?;
    let outcome = demo::run(&interpreter, workers, rounds).map_err(render);
    interpreter.finalize().map_err(render)?;
    outcome
}

fn call(
    paths: Vec<PathBuf>,
    module: &str,
    function: &str,
    args: Vec<String>,
) -> Result<(), String> {
    let interpreter = Interpreter::with_config(InterpreterConfig {
        search_paths: paths,
        ..InterpreterConfig::default()
    })
    .map_err(render)?;
    let outcome = call_function(module, function, args).map_err(render);
    interpreter.finalize().map_err(render)?;
    outcome
}

fn call_function(module: &str, function: &str, args: Vec<String>) -> Result<(), Error> {
    api::create_module()?.enable_module()?;
    let function = import(module)?.get_attr(function)?;
    let result = function.call(args.into_iter().map(Value::from))?;
    println!("{result}");
    Ok(())
}

/// Describe an error while the interpreter is still running, so that Python
/// exceptions can be shown with their traceback.
fn render(error: Error) -> String {
    match error.as_exception().map(|exception| exception.format_traceback()) {
        Some(Ok(traceback)) => traceback,
        _ => format!("Error: {error}\n"),
    }
}
