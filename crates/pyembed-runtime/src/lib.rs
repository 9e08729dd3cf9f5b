//! Embedded CPython runtime binding.
//!
//! Provides the pieces a host program needs to drive an in-process Python
//! interpreter:
//! - Owning and borrowed object handles with exact reference accounting
//!   ([`Handle`], [`Borrowed`], [`Object`])
//! - Conversions between host values and Python primitives ([`Value`], [`Primitive`])
//! - Python exceptions captured as host errors ([`PyException`], [`Error`])
//! - Interpreter lock hand-off between host threads ([`SavedThread`], [`GilGuard`])
//! - Process lifecycle ([`Interpreter`])
//! - Host functions registered as Python module members ([`HostFunction`], [`ModuleExt`])
//!
//! Every operation that touches a Python object requires the calling thread to
//! hold the interpreter lock. The lock is held by the initializing thread after
//! [`Interpreter::initialize`]; other threads obtain it through
//! [`Interpreter::ensure_gil`].

pub mod bridge;
pub mod error;
pub mod exception;
pub mod gil;
pub mod handle;
pub mod import;
pub mod interpreter;
pub mod module;
pub mod object;
pub mod path;
pub mod primitive;
pub mod types;

mod registry;


pub use pyo3_ffi as ffi;

pub use error::{Error, Result, current_error};
pub use exception::PyException;
pub use gil::{GilGuard, LockState, SavedThread, lock_state};
pub use handle::{Borrowed, Handle};
pub use import::import;
pub use interpreter::{Interpreter, InterpreterConfig};
pub use module::{HostFunction, ModuleExt, create_module, module_from_source, new_module};
pub use object::Object;
pub use primitive::{Primitive, Value};
pub use types::{TypeFlags, TypeObject};

/// Traits needed to call methods on handles.
pub mod prelude {
    pub use crate::module::ModuleExt;
    pub use crate::object::Object;
    pub use crate::primitive::Primitive;
}
