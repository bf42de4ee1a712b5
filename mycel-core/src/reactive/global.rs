//! Default Runtime
//!
//! Free functions that build on a thread-local default [`Runtime`], for code
//! that wants a single implicit reactive graph per thread instead of passing a
//! runtime around. Everything created through these functions belongs to the
//! same graph as [`default_runtime`].

use super::cell::Cell;
use super::computation::Computation;
use super::runtime::Runtime;

thread_local! {
    static DEFAULT_RUNTIME: Runtime = Runtime::named("default");
}

/// A handle to this thread's default runtime.
pub fn default_runtime() -> Runtime {
    DEFAULT_RUNTIME.with(Runtime::clone)
}

/// Create a source cell in the default runtime.
pub fn create_cell<T: 'static>(value: T) -> Cell<T> {
    Cell::new(&default_runtime(), value)
}

/// Create a derived cell in the default runtime.
pub fn create_derived<T, F>(derive: F) -> Cell<T>
where
    T: 'static,
    F: Fn() -> T + 'static,
{
    Cell::derived(&default_runtime(), derive)
}

/// Create a computation in the default runtime. It runs once immediately.
pub fn create_computation<F>(f: F) -> Computation
where
    F: Fn() + 'static,
{
    Computation::new(&default_runtime(), f)
}

/// Run `f` as a batch on the default runtime.
pub fn batch<R, F>(f: F) -> R
where
    F: FnOnce() -> R,
{
    default_runtime().batch(f)
}

/// Run `f` on the default runtime with dependency tracking suspended.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    default_runtime().untracked(f)
}
