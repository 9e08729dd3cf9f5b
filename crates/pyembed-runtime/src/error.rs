//! Host-side error type.

use std::env::JoinPathsError;
use std::ffi::NulError;

use derive_more::{Display, Error, From};
use pyo3_ffi as ffi;

use crate::exception::{self, PyException};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// An exception raised inside the interpreter.
    #[display("{_0}")]
    #[from]
    Python(PyException),

    /// The error indicator was queried but nothing was pending.
    #[display("Python error without an exception")]
    MissingException,

    #[display("the Python interpreter is already initialized")]
    AlreadyInitialized,

    /// Startup configuration failed; the interpreter was finalized again.
    #[display("failed to configure the Python interpreter: {_0}")]
    #[error(ignore)]
    Startup(String),

    #[display("failed to finalize the Python interpreter")]
    Finalize,

    #[display("string contains an interior nul byte: {_0}")]
    #[from]
    InteriorNul(NulError),

    #[display("invalid search path entry: {_0}")]
    #[from]
    SearchPath(JoinPathsError),
}

impl Error {
    /// Hand the error back to the interpreter as the pending exception.
    ///
    /// A Python exception is restored as-is; any other error is raised as a
    /// `RuntimeError` carrying its message.
    pub fn restore(self) {
        match self {
            Error::Python(exception) => exception.restore(),
            other => {
                exception::set_error(unsafe { ffi::PyExc_RuntimeError }, &other.to_string());
            }
        }
    }

    /// The Python exception, if this error came from the interpreter.
    pub fn as_exception(&self) -> Option<&PyException> {
        match self {
            Error::Python(exception) => Some(exception),
            _ => None,
        }
    }
}

/// Drain the pending Python error into a host error.
///
/// Always returns an error: a probe that finds nothing pending yields
/// [`Error::MissingException`].
pub fn current_error() -> Error {
    match PyException::take() {
        Some(exception) => Error::Python(exception),
        None => Error::MissingException,
    }
}
