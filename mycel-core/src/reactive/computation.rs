//! Computation Implementation
//!
//! A Computation is a side-effecting closure that re-runs whenever a cell it
//! read during its previous run changes.
//!
//! # How Computations Work
//!
//! 1. When created, the computation runs immediately to establish its
//!    initial dependencies.
//!
//! 2. While it runs it is the runtime's current computation, so every cell
//!    read subscribes it.
//!
//! 3. When one of those cells is written, the runtime re-runs it (or queues
//!    it, inside a batch). Each run starts a new generation; subscriptions
//!    taken in earlier generations no longer count, so dependencies are
//!    rebuilt from scratch on every run.
//!
//! # Lifetime
//!
//! Cells only hold weak references to their subscribers. A computation stays
//! active for as long as some [`Computation`] handle (or the derived cell that
//! owns it) is alive. Dropping the last handle stops it.

use std::fmt;
use std::rc::Rc;

use tracing::trace;

use super::runtime::Runtime;
use super::subscriber::ComputationId;

/// A side-effecting computation that re-runs when its dependencies change.
///
/// # Example
///
/// ```rust
/// use mycel_core::reactive::Runtime;
///
/// let rt = Runtime::new();
/// let count = rt.cell(0);
///
/// let effect = rt.computation({
///     let count = count.clone();
///     move || println!("Count is: {}", count.read())
/// });
///
/// count.set(5).unwrap(); // Prints: "Count is: 5"
/// assert_eq!(effect.run_count(), 2);
/// ```
#[derive(Clone)]
#[must_use = "a computation stops reacting once every handle to it is dropped"]
pub struct Computation {
    inner: Rc<ComputationInner>,
}

pub(crate) struct ComputationInner {
    id: ComputationId,

    /// The runtime this computation tracks and schedules through.
    runtime: Runtime,

    func: Box<dyn Fn()>,

    /// Incremented at the start of every run.
    generation: std::cell::Cell<u64>,

    /// Number of completed runs.
    run_count: std::cell::Cell<usize>,
}

impl Computation {
    /// Create a new computation with the given function.
    ///
    /// The function runs immediately to establish initial dependencies.
    pub fn new<F>(runtime: &Runtime, func: F) -> Self
    where
        F: Fn() + 'static,
    {
        let computation = Self::new_lazy(runtime, func);
        computation.run();
        computation
    }

    /// Create a computation without running it.
    ///
    /// It subscribes to nothing until its first run.
    pub(crate) fn new_lazy<F>(runtime: &Runtime, func: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self {
            inner: Rc::new(ComputationInner {
                id: ComputationId::new(),
                runtime: runtime.clone(),
                func: Box::new(func),
                generation: std::cell::Cell::new(0),
                run_count: std::cell::Cell::new(0),
            }),
        }
    }

    /// Get the computation's unique ID.
    pub fn id(&self) -> ComputationId {
        self.inner.id
    }

    /// The runtime this computation belongs to.
    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    /// Run the computation now, rebuilding its dependencies.
    ///
    /// This bypasses the scheduler: it runs even inside a batch.
    pub fn run(&self) {
        self.inner.run();
    }

    /// Get the number of times the computation has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.get()
    }

    pub(crate) fn inner(&self) -> &Rc<ComputationInner> {
        &self.inner
    }
}

impl ComputationInner {
    pub(crate) fn id(&self) -> ComputationId {
        self.id
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.get()
    }

    pub(crate) fn run(self: &Rc<Self>) {
        self.run_with(|| (self.func)());
    }

    /// Run `f` as this computation: a new generation starts and every cell
    /// read inside `f` subscribes this computation.
    pub(crate) fn run_with<R>(self: &Rc<Self>, f: impl FnOnce() -> R) -> R {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);

        trace!(
            runtime = ?self.runtime.label(),
            computation = %self.id,
            generation,
            "running computation"
        );

        let result = {
            let _ctx = self.runtime.context().enter(self);
            f()
        };

        self.run_count.set(self.run_count.get() + 1);
        result
    }
}

impl fmt::Debug for Computation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computation")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
