//! Process lifecycle of the embedded interpreter.
//!
//! CPython is a process singleton. [`Interpreter`] is the capability that
//! proves it is running: at most one exists at a time, every lock token
//! borrows it, and consuming it with [`Interpreter::finalize`] tears the
//! runtime down. Once finalized, a new `Interpreter` may be initialized.

use std::borrow::Cow;
use std::ffi::{CStr, c_int};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use pyo3_ffi as ffi;

use crate::error::{Error, Result};
use crate::import::import;
use crate::object::Object;
use crate::primitive::Value;

static LIVE: AtomicBool = AtomicBool::new(false);

/// Number of lifecycles that have ended in this process.
static GENERATION: AtomicU64 = AtomicU64::new(0);

/// The current lifecycle; objects created in an earlier one are dead.
pub(crate) fn generation() -> u64 {
    GENERATION.load(Ordering::Acquire)
}

/// Startup options for [`Interpreter::with_config`].
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// Directories placed at the front of `sys.path`, in order.
    pub search_paths: Vec<PathBuf>,
    /// Let Python install its own `SIGINT` and related handlers.
    pub install_signal_handlers: bool,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            install_signal_handlers: true,
        }
    }
}

impl InterpreterConfig {
    pub fn search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    pub fn install_signal_handlers(mut self, install: bool) -> Self {
        self.install_signal_handlers = install;
        self
    }
}

/// The running interpreter.
///
/// The thread that initializes the interpreter holds its lock afterwards.
#[derive(Debug)]
pub struct Interpreter {
    finalized: bool,
}

impl Interpreter {
    /// Start the interpreter with default options.
    pub fn initialize() -> Result<Self> {
        Self::with_config(InterpreterConfig::default())
    }

    pub fn with_config(config: InterpreterConfig) -> Result<Self> {
        if LIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::AlreadyInitialized);
        }
        if Self::is_initialized() {
            // Someone else embedded Python in this process.
            LIVE.store(false, Ordering::Release);
            return Err(Error::AlreadyInitialized);
        }

        unsafe { ffi::Py_InitializeEx(config.install_signal_handlers as c_int) };
        let interpreter = Self { finalized: false };
        tracing::debug!(
            version = %Self::version(),
            search_paths = config.search_paths.len(),
            "Python interpreter initialized"
        );

        if let Err(err) = interpreter.prepend_search_paths(&config.search_paths) {
            // Render before the interpreter is dropped and finalized, which
            // invalidates the objects the error refers to.
            let message = err.to_string();
            drop(err);
            drop(interpreter);
            return Err(Error::Startup(message));
        }
        Ok(interpreter)
    }

    /// Whether an interpreter is running in this process.
    pub fn is_initialized() -> bool {
        unsafe { ffi::Py_IsInitialized() != 0 }
    }

    /// The version string of the linked interpreter, e.g.
    /// `"3.12.3 (main, ...) [GCC 13.2.0]"`. Valid before initialization.
    pub fn version() -> Cow<'static, str> {
        unsafe { CStr::from_ptr(ffi::Py_GetVersion()) }.to_string_lossy()
    }

    /// Tear the interpreter down.
    ///
    /// Every [`Handle`](crate::Handle) still alive is abandoned without being
    /// released.
    pub fn finalize(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        self.finalized = true;
        let status = unsafe {
            // Finalization needs a thread state; the lock is never handed back.
            if ffi::PyGILState_Check() == 0 {
                ffi::PyGILState_Ensure();
            }
            ffi::Py_FinalizeEx()
        };
        GENERATION.fetch_add(1, Ordering::AcqRel);
        LIVE.store(false, Ordering::Release);
        tracing::debug!(status, "Python interpreter finalized");
        if status == 0 {
            Ok(())
        } else {
            Err(Error::Finalize)
        }
    }

    fn prepend_search_paths(&self, paths: &[PathBuf]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let sys_path = import("sys")?.get_attr("path")?;
        for (index, path) in paths.iter().enumerate() {
            sys_path.call_method(
                "insert",
                [Value::from(index), Value::Str(path.to_string_lossy())],
            )?;
        }
        Ok(())
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        if self.finalized {
            return;
        }
        if let Err(err) = self.shutdown() {
            tracing::warn!(%err, "Python interpreter finalization failed");
        }
    }
}
