//! Reactive Runtime
//!
//! The runtime is the scheduler that connects cells and computations. It
//! knows which computation is currently running, holds the queue of
//! computations waiting to re-run, and tracks whether a batch is open.
//!
//! # How It Works
//!
//! 1. When a computation runs, it pushes itself onto the runtime's context
//!    stack. Cells read during the run subscribe it.
//!
//! 2. When a cell is written, it hands each live subscriber to
//!    [`Runtime::schedule`]:
//!    a. outside a batch, the computation re-runs right away;
//!    b. inside a batch (or while a flush is in progress), it is queued.
//!
//! 3. [`Runtime::flush`] drains the queue pass by pass. Each pass works on a
//!    snapshot, so computations scheduled while it runs land in the next pass.
//!
//! # Threading
//!
//! A runtime is a cheap `Rc` handle and is `!Send`. Each reactive graph lives
//! on the thread that created its runtime. Any number of runtimes may exist
//! side by side; they share nothing.

use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tracing::{debug, trace};

use super::cell::Cell;
use super::computation::{Computation, ComputationInner};
use super::context::ContextStack;
use super::subscriber::ComputationId;

/// Scheduler and tracking state for one reactive graph.
///
/// Cloning a `Runtime` yields another handle to the same graph.
#[derive(Clone, Default)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

#[derive(Default)]
struct RuntimeInner {
    /// Name attached to log events.
    label: Option<String>,

    /// Computations currently executing, innermost last.
    context: ContextStack,

    /// Computations waiting for the next flush, in first-scheduled order.
    queue: std::cell::RefCell<IndexMap<ComputationId, Weak<ComputationInner>>>,

    /// The rest of the snapshot the current flush pass is working through.
    in_flight: std::cell::RefCell<VecDeque<(ComputationId, Weak<ComputationInner>)>>,

    /// Number of open batches.
    batch_depth: std::cell::Cell<usize>,

    /// Set while `flush` is draining the queue.
    flushing: std::cell::Cell<bool>,
}

impl Runtime {
    /// Create a new, empty runtime.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a runtime whose log events carry `label`.
    pub fn named(label: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                label: Some(label.into()),
                ..RuntimeInner::default()
            }),
        }
    }

    /// The label given to [`Runtime::named`], if any.
    pub fn label(&self) -> Option<&str> {
        self.inner.label.as_deref()
    }

    /// Whether two handles refer to the same runtime.
    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn context(&self) -> &ContextStack {
        &self.inner.context
    }

    /// The computation currently running, if any.
    ///
    /// Returns `None` outside any computation and inside
    /// [`Runtime::untracked`].
    pub fn current_computation(&self) -> Option<ComputationId> {
        self.inner.context.current_id()
    }

    /// Check if reads right now would subscribe a computation.
    pub fn is_tracking(&self) -> bool {
        self.current_computation().is_some()
    }

    /// Run `f` with dependency tracking suspended.
    ///
    /// Cells read inside `f` do not subscribe the surrounding computation.
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        let _ctx = self.inner.context.enter_untracked();
        f()
    }

    /// Route a computation to an immediate run or to the queue.
    ///
    /// While a batch is open or a flush is in progress the computation is
    /// queued; queuing it again before it runs is a no-op. Otherwise it runs
    /// synchronously before this call returns.
    pub fn schedule(&self, computation: &Computation) {
        self.schedule_inner(Rc::clone(computation.inner()));
    }

    pub(crate) fn schedule_inner(&self, computation: Rc<ComputationInner>) {
        if self.is_batching() || self.is_flushing() {
            let id = computation.id();
            let mut queue = self.inner.queue.borrow_mut();
            if !queue.contains_key(&id) {
                queue.insert(id, Rc::downgrade(&computation));
                trace!(
                    runtime = ?self.label(),
                    computation = %id,
                    pending = queue.len(),
                    "queued computation"
                );
            }
        } else {
            computation.run();
        }
    }

    /// Run every queued computation.
    ///
    /// Each pass takes a snapshot of the queue and runs its members in the
    /// order they were first scheduled. Work scheduled during a pass goes to
    /// the next pass; a computation that is still waiting in the current
    /// snapshot absorbs any such duplicate, so it runs once. Passes repeat
    /// until the queue is empty. Computations dropped since being queued are
    /// skipped.
    ///
    /// Calling `flush` while a flush is already in progress returns at once;
    /// the outer flush picks up whatever was queued.
    ///
    /// If a computation panics, the panic propagates out of `flush`. The
    /// computations of the interrupted pass that had not run yet go back to
    /// the front of the queue, ahead of anything scheduled during the pass,
    /// and run on the next flush.
    pub fn flush(&self) {
        if self.is_flushing() {
            return;
        }

        self.inner.flushing.set(true);
        let _flushing = FlushGuard { runtime: &self.inner };

        let mut pass = 0usize;
        loop {
            let pending = std::mem::take(&mut *self.inner.queue.borrow_mut());
            if pending.is_empty() {
                break;
            }

            pass += 1;
            debug!(
                runtime = ?self.label(),
                pass,
                pending = pending.len(),
                "flushing queued computations"
            );

            self.inner.in_flight.borrow_mut().extend(pending);
            loop {
                let next = self.inner.in_flight.borrow_mut().pop_front();
                let Some((id, computation)) = next else {
                    break;
                };

                self.inner.queue.borrow_mut().shift_remove(&id);
                if let Some(computation) = computation.upgrade() {
                    computation.run();
                }
            }
        }
    }

    /// Check if at least one batch is open.
    pub fn is_batching(&self) -> bool {
        self.inner.batch_depth.get() > 0
    }

    /// Number of batches currently open.
    pub fn batch_depth(&self) -> usize {
        self.inner.batch_depth.get()
    }

    /// Check if a flush is in progress.
    pub fn is_flushing(&self) -> bool {
        self.inner.flushing.get()
    }

    /// Number of computations waiting in the queue.
    pub fn pending_count(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    pub(crate) fn open_batch(&self) -> usize {
        let depth = self.inner.batch_depth.get() + 1;
        self.inner.batch_depth.set(depth);
        depth
    }

    pub(crate) fn close_batch(&self) -> usize {
        let depth = self.inner.batch_depth.get().saturating_sub(1);
        self.inner.batch_depth.set(depth);
        depth
    }

    /// Create a source cell in this runtime.
    pub fn cell<T: 'static>(&self, value: T) -> Cell<T> {
        Cell::new(self, value)
    }

    /// Create a derived cell in this runtime.
    pub fn derived<T, F>(&self, derive: F) -> Cell<T>
    where
        T: 'static,
        F: Fn() -> T + 'static,
    {
        Cell::derived(self, derive)
    }

    /// Create a computation in this runtime. It runs once immediately.
    pub fn computation<F>(&self, f: F) -> Computation
    where
        F: Fn() + 'static,
    {
        Computation::new(self, f)
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("label", &self.label())
            .field("tracking_depth", &self.inner.context.depth())
            .field("batch_depth", &self.batch_depth())
            .field("flushing", &self.is_flushing())
            .field("pending", &self.pending_count())
            .finish()
    }
}

/// Clears the flushing flag when the flush ends. After a panic it also
/// requeues the part of the pass that never ran.
struct FlushGuard<'a> {
    runtime: &'a RuntimeInner,
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.runtime.flushing.set(false);

        let unfinished = std::mem::take(&mut *self.runtime.in_flight.borrow_mut());
        if unfinished.is_empty() {
            return;
        }

        let mut queue = self.runtime.queue.borrow_mut();
        let scheduled_later = std::mem::take(&mut *queue);
        queue.extend(unfinished);
        for (id, computation) in scheduled_later {
            queue.entry(id).or_insert(computation);
        }

        debug!(
            runtime = ?self.runtime.label.as_deref(),
            pending = queue.len(),
            "flush interrupted, requeued unfinished computations"
        );
    }
}
