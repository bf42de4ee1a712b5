//! Batched Updates
//!
//! A batch defers notification delivery until a block of writes has finished.
//! Computations notified inside the batch are queued instead of run, and the
//! queue is flushed once, when the outermost batch closes. A computation that
//! depends on several of the written cells, or on one cell written several
//! times, runs once.
//!
//! Batches nest. The runtime keeps a depth counter, so closing an inner batch
//! neither flushes nor ends deferral for the outer one.

use tracing::debug;

use super::runtime::Runtime;

impl Runtime {
    /// Run `f` with notifications deferred, then flush.
    ///
    /// Returns whatever `f` returns. Only the outermost batch flushes. If `f`
    /// panics the batch is still closed, but queued work stays queued until
    /// the next flush.
    ///
    /// # Example
    ///
    /// ```rust
    /// use mycel_core::reactive::Runtime;
    ///
    /// let rt = Runtime::new();
    /// let x = rt.cell(0);
    /// let effect = rt.computation({
    ///     let x = x.clone();
    ///     move || { x.read(); }
    /// });
    ///
    /// rt.batch(|| {
    ///     x.set(1).unwrap();
    ///     x.set(2).unwrap();
    /// });
    ///
    /// assert_eq!(effect.run_count(), 2);
    /// assert_eq!(x.peek(), 2);
    /// ```
    pub fn batch<R, F>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let result = {
            let _batch = BatchGuard::open(self);
            f()
        };

        if !self.is_batching() {
            self.flush();
        }

        result
    }
}

/// Keeps the batch depth balanced.
struct BatchGuard<'a> {
    runtime: &'a Runtime,
}

impl<'a> BatchGuard<'a> {
    fn open(runtime: &'a Runtime) -> Self {
        let depth = runtime.open_batch();
        debug!(runtime = ?runtime.label(), depth, "batch opened");
        Self { runtime }
    }
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        let depth = self.runtime.close_batch();
        debug!(
            runtime = ?self.runtime.label(),
            depth,
            pending = self.runtime.pending_count(),
            "batch closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Cell, Computation};
    use std::cell::{Cell as Counter, RefCell};
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::rc::Rc;

    fn observe(rt: &Runtime, cells: &[Cell<i32>]) -> (Computation, Rc<RefCell<Vec<i32>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let cells = cells.to_vec();
        let computation = Computation::new(rt, move || {
            let sum: i32 = cells.iter().map(Cell::read).sum();
            seen_clone.borrow_mut().push(sum);
        });
        (computation, seen)
    }

    #[test]
    fn batch_coalesces_writes_to_one_cell() {
        let rt = Runtime::new();
        let x = Cell::new(&rt, 0);
        let (_computation, seen) = observe(&rt, &[x.clone()]);

        rt.batch(|| {
            x.set(1).unwrap();
            x.set(2).unwrap();
            assert_eq!(rt.pending_count(), 1);
        });

        assert_eq!(*seen.borrow(), vec![0, 2]);
        assert_eq!(x.peek(), 2);
    }

    #[test]
    fn batch_coalesces_writes_to_many_cells() {
        let rt = Runtime::new();
        let a = Cell::new(&rt, 1);
        let b = Cell::new(&rt, 10);
        let (_computation, seen) = observe(&rt, &[a.clone(), b.clone()]);

        rt.batch(|| {
            a.set(2).unwrap();
            b.set(20).unwrap();
        });

        assert_eq!(*seen.borrow(), vec![11, 22]);
    }

    #[test]
    fn nothing_runs_until_batch_ends() {
        let rt = Runtime::new();
        let x = Cell::new(&rt, 0);
        let (_computation, seen) = observe(&rt, &[x.clone()]);

        rt.batch(|| {
            x.set(5).unwrap();
            assert_eq!(seen.borrow().len(), 1);
            assert!(rt.is_batching());
        });

        assert!(!rt.is_batching());
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn nested_batches_flush_only_at_outermost_exit() {
        let rt = Runtime::new();
        let x = Cell::new(&rt, 0);
        let (_computation, seen) = observe(&rt, &[x.clone()]);

        rt.batch(|| {
            x.set(1).unwrap();
            rt.batch(|| {
                x.set(2).unwrap();
                assert_eq!(rt.batch_depth(), 2);
            });
            assert_eq!(rt.batch_depth(), 1);
            assert_eq!(seen.borrow().len(), 1);
            x.set(3).unwrap();
        });

        assert_eq!(*seen.borrow(), vec![0, 3]);
        assert_eq!(rt.batch_depth(), 0);
    }

    #[test]
    fn batch_returns_closure_result() {
        let rt = Runtime::new();
        let value = rt.batch(|| 40 + 2);
        assert_eq!(value, 42);
    }

    #[test]
    fn panicking_batch_is_closed() {
        let rt = Runtime::new();
        let x = Cell::new(&rt, 0);
        let runs = Rc::new(Counter::new(0));

        let x_clone = x.clone();
        let runs_clone = runs.clone();
        let _computation = Computation::new(&rt, move || {
            x_clone.read();
            runs_clone.set(runs_clone.get() + 1);
        });

        let result = catch_unwind(AssertUnwindSafe(|| {
            rt.batch(|| {
                x.set(1).unwrap();
                panic!("boom");
            })
        }));

        assert!(result.is_err());
        assert!(!rt.is_batching());
        assert_eq!(rt.pending_count(), 1);
        assert_eq!(runs.get(), 1);

        rt.flush();
        assert_eq!(runs.get(), 2);
    }
}
