//! Command-line interface for the embedding demo.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pyembed")]
#[command(about = "Drive an embedded CPython interpreter from Rust", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the version of the linked Python
    Version,
    /// Run the hello-world walkthrough
    Demo {
        /// Directory containing foo.py, prepended to PYTHONPATH
        #[arg(long, default_value = ".")]
        path: PathBuf,
        /// Number of threads in the concurrency scenario
        #[arg(long, default_value_t = 5)]
        workers: usize,
        /// Calls made by each thread in the concurrency scenario
        #[arg(long, default_value_t = 100)]
        rounds: usize,
    },
    /// Import a module and call one of its functions with string arguments
    Call {
        /// Dotted module name
        module: String,
        /// Function name inside the module
        function: String,
        /// Arguments, passed as Python strings
        args: Vec<String>,
        /// Extra directories placed at the front of sys.path
        #[arg(long = "path")]
        paths: Vec<PathBuf>,
    },
}
