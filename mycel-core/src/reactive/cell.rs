//! Cell Implementation
//!
//! A Cell is the fundamental reactive primitive. It holds a value and tracks
//! which computations read it.
//!
//! # How Cells Work
//!
//! 1. When a cell is read within a running computation, the cell records a
//!    subscription for that computation.
//!
//! 2. When the cell is written, it takes its whole listener set and hands
//!    every still-live subscriber to the runtime's scheduler. The set is left
//!    empty: a computation that still cares will subscribe again when it
//!    re-runs and reads the cell.
//!
//! 3. There is no equality check. Every successful `set` notifies, even if
//!    the new value equals the old one.
//!
//! # Source and Derived Cells
//!
//! A source cell is written from outside with [`Cell::set`] and
//! [`Cell::update`]. A derived cell owns a hidden computation that assigns
//! the result of its derivation function to the cell each time it runs, and
//! then notifies the cell's own listeners, so derived cells can feed further
//! derived cells and computations. Writing to a derived cell from outside is
//! rejected with [`ReactiveError::DerivedWrite`].

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::error::{ReactiveError, Result};

use super::computation::Computation;
use super::runtime::Runtime;
use super::subscriber::{ComputationId, Subscription};

/// Smallest listener count at which stale subscriptions are swept out.
const PRUNE_THRESHOLD: usize = 32;

/// Unique identifier for a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(u64);

impl CellId {
    /// Generate a new unique cell ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for CellId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<u64> for CellId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which way a cell gets its value. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    /// Written from outside with `set` / `update`.
    Source,

    /// Written only by its own computation.
    Derived,
}

/// A reactive cell holding a value of type `T`.
///
/// Handles are cheap to clone and share the same state.
///
/// # Example
///
/// ```rust
/// use mycel_core::reactive::Runtime;
///
/// let rt = Runtime::new();
/// let count = rt.cell(3);
/// let doubled = rt.derived({
///     let count = count.clone();
///     move || count.read() * 2
/// });
///
/// assert_eq!(doubled.peek(), 6);
/// count.set(10).unwrap();
/// assert_eq!(doubled.peek(), 20);
/// assert!(doubled.set(5).is_err());
/// ```
pub struct Cell<T: 'static> {
    inner: Rc<CellInner<T>>,
}

struct CellInner<T: 'static> {
    id: CellId,

    runtime: Runtime,

    value: RefCell<T>,

    /// Subscribers since the last notification, in first-read order.
    listeners: RefCell<IndexMap<ComputationId, Subscription>>,

    /// Listener count at which `track` next sweeps out stale subscriptions.
    prune_at: std::cell::Cell<usize>,

    /// Present for derived cells only.
    computation: Option<Computation>,
}

impl<T: 'static> Cell<T> {
    /// Create a source cell with the given initial value.
    pub fn new(runtime: &Runtime, value: T) -> Self {
        Self {
            inner: Rc::new(CellInner {
                id: CellId::new(),
                runtime: runtime.clone(),
                value: RefCell::new(value),
                listeners: RefCell::new(IndexMap::new()),
                prune_at: std::cell::Cell::new(PRUNE_THRESHOLD),
                computation: None,
            }),
        }
    }

    /// Create a derived cell.
    ///
    /// `derive` runs immediately, inside the cell's own computation, to
    /// produce the initial value and subscribe to whatever it reads. It runs
    /// again each time one of those cells changes.
    pub fn derived<F>(runtime: &Runtime, derive: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        let derive = Rc::new(derive);

        let inner = Rc::new_cyclic(|weak: &Weak<CellInner<T>>| {
            let cell = weak.clone();
            let rerun = Rc::clone(&derive);
            let computation = Computation::new_lazy(runtime, move || {
                if let Some(cell) = cell.upgrade() {
                    let value = rerun();
                    cell.write(value);
                }
            });

            let value = computation.inner().run_with(|| derive());

            CellInner {
                id: CellId::new(),
                runtime: runtime.clone(),
                value: RefCell::new(value),
                listeners: RefCell::new(IndexMap::new()),
                prune_at: std::cell::Cell::new(PRUNE_THRESHOLD),
                computation: Some(computation),
            }
        });

        Self { inner }
    }

    /// Get the cell's unique ID.
    pub fn id(&self) -> CellId {
        self.inner.id
    }

    /// Whether this is a source or a derived cell.
    pub fn kind(&self) -> CellKind {
        if self.inner.computation.is_some() {
            CellKind::Derived
        } else {
            CellKind::Source
        }
    }

    /// Check if this cell is derived.
    pub fn is_derived(&self) -> bool {
        self.kind() == CellKind::Derived
    }

    /// The runtime this cell belongs to.
    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    /// The computation backing a derived cell.
    pub fn computation(&self) -> Option<&Computation> {
        self.inner.computation.as_ref()
    }

    /// Borrow the value, subscribing the current computation (if any).
    ///
    /// The value stays borrowed while `f` runs, so anything `f` does that
    /// writes this cell panics. That covers a direct `set` on this cell and
    /// indirect writes: for a derived cell `d` over `x`, `d.with(|_| x.set(1))`
    /// re-runs `d`'s computation, which writes `d`. Writes to unrelated cells
    /// are fine. Use [`Cell::read`] to work on a copy instead.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&*self.inner.value.borrow())
    }

    /// Borrow the value without subscribing anything.
    ///
    /// The same borrow rules as [`Cell::with`] apply.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.inner.value.borrow())
    }

    /// Set a new value and notify subscribers.
    ///
    /// Outside a batch every live subscriber re-runs before this returns.
    /// Fails without touching the value if the cell is derived.
    pub fn set(&self, value: T) -> Result<()> {
        self.ensure_writable()?;
        self.inner.write(value);
        Ok(())
    }

    /// Get the number of computations that would be notified by a write now.
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .borrow()
            .values()
            .filter(|subscription| subscription.is_live())
            .count()
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.is_derived() {
            debug!(
                runtime = ?self.inner.runtime.label(),
                cell = %self.inner.id,
                "rejected write to derived cell"
            );
            return Err(ReactiveError::DerivedWrite {
                cell: self.inner.id,
            });
        }
        Ok(())
    }

    fn track(&self) {
        let Some(current) = self.inner.runtime.context().current() else {
            return;
        };

        trace!(
            runtime = ?self.inner.runtime.label(),
            cell = %self.inner.id,
            computation = %current.id(),
            "subscribed"
        );

        let mut listeners = self.inner.listeners.borrow_mut();
        listeners.insert(current.id(), Subscription::new(&current));

        // A cell that is read often but never written would otherwise keep
        // one entry per computation that ever read it.
        if listeners.len() >= self.inner.prune_at.get() {
            listeners.retain(|_, subscription| subscription.is_live());
            self.inner
                .prune_at
                .set((listeners.len() * 2).max(PRUNE_THRESHOLD));
        }
    }
}

impl<T: Clone + 'static> Cell<T> {
    /// Get the current value.
    ///
    /// If called within a running computation, this also subscribes that
    /// computation to the cell.
    pub fn read(&self) -> T {
        self.with(T::clone)
    }

    /// Get the current value without subscribing anything.
    pub fn peek(&self) -> T {
        self.with_untracked(T::clone)
    }

    /// Update the value using a function of the current value.
    ///
    /// Equivalent to `set(f(&current))`. `f` gets a copy of the value, so it
    /// may write cells freely, this one included; the result of `f` is then
    /// written over whatever those writes left. `f` is not called if the
    /// cell is derived.
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&T) -> T,
    {
        self.ensure_writable()?;
        let current = self.peek();
        let value = f(&current);
        self.inner.write(value);
        Ok(())
    }
}

impl<T: 'static> CellInner<T> {
    fn write(&self, value: T) {
        *self.value.borrow_mut() = value;
        self.notify();
    }

    /// Hand every live subscriber to the scheduler and start a fresh
    /// listener set.
    fn notify(&self) {
        let listeners = std::mem::take(&mut *self.listeners.borrow_mut());
        self.prune_at.set(PRUNE_THRESHOLD);
        if listeners.is_empty() {
            return;
        }

        trace!(
            runtime = ?self.runtime.label(),
            cell = %self.id,
            listeners = listeners.len(),
            "notifying"
        );

        for subscription in listeners.into_values() {
            // Checked one at a time: an earlier listener's run may already
            // have re-run this one.
            if let Some(computation) = subscription.live() {
                self.runtime.schedule_inner(computation);
            }
        }
    }
}

impl<T: 'static> Clone for Cell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Cell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Cell");
        debug.field("id", &self.inner.id).field("kind", &self.kind());
        match self.inner.value.try_borrow() {
            Ok(value) => debug.field("value", &*value),
            Err(_) => debug.field("value", &format_args!("<borrowed>")),
        };
        debug
            .field("listener_count", &self.listener_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
