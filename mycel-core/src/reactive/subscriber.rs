//! Subscriber types for the reactive system.
//!
//! A subscriber is a computation that has read a cell. The cell does not own
//! the computation; it records a [`Subscription`], which is a weak reference
//! stamped with the computation's run generation at the time of the read.

use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use super::computation::ComputationInner;

/// Unique identifier for a computation.
///
/// Each computation (including the hidden computation behind a derived cell)
/// gets a unique ID when created. Cells and the scheduler queue are keyed by
/// it, which is what makes repeated reads and repeated schedules idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComputationId(u64);

impl ComputationId {
    /// Generate a new unique computation ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ComputationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ComputationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A computation's interest in a single cell.
///
/// Created when a cell is read inside a running computation. It goes stale on
/// its own once the computation starts another run (the run will register a
/// fresh subscription if it still reads the cell) or once the computation is
/// dropped.
#[derive(Clone)]
pub(crate) struct Subscription {
    computation: Weak<ComputationInner>,
    generation: u64,
}

impl Subscription {
    /// Subscribe `computation` as of its current run.
    pub(crate) fn new(computation: &Rc<ComputationInner>) -> Self {
        Self {
            computation: Rc::downgrade(computation),
            generation: computation.generation(),
        }
    }

    /// Resolve the subscription, returning the computation if it is still
    /// alive and has not re-run since subscribing.
    pub(crate) fn live(&self) -> Option<Rc<ComputationInner>> {
        self.computation
            .upgrade()
            .filter(|computation| computation.generation() == self.generation)
    }

    pub(crate) fn is_live(&self) -> bool {
        self.live().is_some()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("generation", &self.generation)
            .field("live", &self.is_live())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Computation, Runtime};

    #[test]
    fn computation_ids_are_unique() {
        let id1 = ComputationId::new();
        let id2 = ComputationId::new();
        let id3 = ComputationId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn subscription_goes_stale_after_rerun() {
        let rt = Runtime::new();
        let computation = Computation::new(&rt, || {});

        let subscription = Subscription::new(computation.inner());
        assert!(subscription.is_live());

        computation.run();
        assert!(!subscription.is_live());
    }

    #[test]
    fn subscription_goes_stale_after_drop() {
        let rt = Runtime::new();
        let computation = Computation::new(&rt, || {});

        let subscription = Subscription::new(computation.inner());
        drop(computation);

        assert!(subscription.live().is_none());
    }
}
