//! Interpreter lock hand-off.
//!
//! The interpreter runs Python code on one thread at a time. The thread that
//! holds the lock is the only one allowed to touch Python objects. Two
//! bracket kinds move the lock between host threads:
//!
//! - [`SavedThread`]: the holder gives the lock up so that *other* threads can
//!   run Python code, and takes it back when the token is restored.
//! - [`GilGuard`]: any thread takes the lock, whether or not the interpreter
//!   already knows it; reentrant. Releasing undoes exactly what the matching
//!   ensure did.
//!
//! Both tokens borrow the [`Interpreter`] and cannot leave the thread that
//! created them, so every token is redeemed exactly once, on its own thread,
//! before the interpreter is finalized.
//!
//! ```text
//!                 save_thread()
//!        Held  ------------------>  Released
//!             <------------------
//!                restore / drop
//! ```

use std::marker::PhantomData;

use pyo3_ffi as ffi;

use crate::interpreter::Interpreter;

/// Whether the calling thread holds the interpreter lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Held,
    Released,
}

/// Lock state of the calling thread as seen by the interpreter.
pub fn lock_state() -> LockState {
    if unsafe { ffi::PyGILState_Check() } != 0 {
        LockState::Held
    } else {
        LockState::Released
    }
}

/// A released lock, to be restored on the thread that released it.
///
/// Dropping the token restores the lock.
#[must_use = "dropping the token immediately re-acquires the lock"]
pub struct SavedThread<'i> {
    state: *mut ffi::PyThreadState,
    _interpreter: PhantomData<&'i Interpreter>,
}

impl<'i> SavedThread<'i> {
    pub(crate) fn save(_interpreter: &'i Interpreter) -> Self {
        let state = unsafe { ffi::PyEval_SaveThread() };
        tracing::trace!(thread_state = ?state, "released interpreter lock");
        Self {
            state,
            _interpreter: PhantomData,
        }
    }

    /// Re-acquire the lock. Blocks until it is available.
    pub fn restore(self) {
        drop(self)
    }
}

impl Drop for SavedThread<'_> {
    fn drop(&mut self) {
        unsafe { ffi::PyEval_RestoreThread(self.state) };
        tracing::trace!(thread_state = ?self.state, "restored interpreter lock");
    }
}

/// An ensured lock, released on the thread that ensured it.
///
/// Dropping the guard releases the lock if, and only if, the matching
/// [`Interpreter::ensure_gil`] acquired it.
#[must_use = "dropping the guard immediately releases the lock"]
pub struct GilGuard<'i> {
    state: ffi::PyGILState_STATE,
    _interpreter: PhantomData<&'i Interpreter>,
    _not_send: PhantomData<*mut ()>,
}

impl<'i> GilGuard<'i> {
    pub(crate) fn ensure(_interpreter: &'i Interpreter) -> Self {
        let state = unsafe { ffi::PyGILState_Ensure() };
        let guard = Self {
            state,
            _interpreter: PhantomData,
            _not_send: PhantomData,
        };
        tracing::trace!(acquired = guard.acquired(), "ensured interpreter lock");
        guard
    }

    /// Whether this guard actually took the lock, as opposed to finding it
    /// already held by the calling thread.
    pub fn acquired(&self) -> bool {
        matches!(self.state, ffi::PyGILState_STATE::PyGILState_UNLOCKED)
    }

    pub fn release(self) {
        drop(self)
    }
}

impl Drop for GilGuard<'_> {
    fn drop(&mut self) {
        unsafe { ffi::PyGILState_Release(self.state) };
    }
}

impl Interpreter {
    /// Release the lock held by the calling thread.
    ///
    /// The calling thread must hold the lock, and must not touch Python
    /// objects until the token is restored.
    pub fn save_thread(&self) -> SavedThread<'_> {
        SavedThread::save(self)
    }

    /// Acquire the lock for the calling thread, blocking until it is free.
    ///
    /// Reentrant: if the thread already holds the lock this only records it.
    pub fn ensure_gil(&self) -> GilGuard<'_> {
        GilGuard::ensure(self)
    }

    /// Run `f` with the lock released so other threads can use Python.
    pub fn allow_threads<R>(&self, f: impl FnOnce() -> R) -> R {
        let _saved = self.save_thread();
        f()
    }

    /// Run `f` with the lock held by the calling thread.
    pub fn with_gil<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.ensure_gil();
        f()
    }
}
