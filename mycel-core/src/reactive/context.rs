//! Tracking Context
//!
//! The tracking context records which computation is currently running so
//! that a cell, when read, knows whom to subscribe.
//!
//! # Implementation
//!
//! Each runtime owns a stack of frames. Running a computation pushes a frame
//! for it; the returned guard pops it again. A computation created inside
//! another computation's closure therefore shadows the outer one for the
//! duration of its own run, and the outer one becomes current again
//! afterwards.
//!
//! An untracked frame (no computation) can also be pushed. Reads under it
//! register nothing, even if a computation is running further down the stack.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use super::computation::ComputationInner;
use super::subscriber::ComputationId;

/// One entry of the context stack.
#[derive(Debug)]
struct Frame {
    /// `None` for an untracked frame.
    id: Option<ComputationId>,
    computation: Weak<ComputationInner>,
}

/// Stack of running computations for one runtime.
#[derive(Debug, Default)]
pub(crate) struct ContextStack {
    frames: RefCell<SmallVec<[Frame; 4]>>,
}

impl ContextStack {
    /// Make `computation` the current computation until the guard drops.
    pub(crate) fn enter(&self, computation: &Rc<ComputationInner>) -> ContextGuard<'_> {
        let id = Some(computation.id());
        self.frames.borrow_mut().push(Frame {
            id,
            computation: Rc::downgrade(computation),
        });
        ContextGuard { stack: self, id }
    }

    /// Suspend tracking until the guard drops.
    pub(crate) fn enter_untracked(&self) -> ContextGuard<'_> {
        self.frames.borrow_mut().push(Frame {
            id: None,
            computation: Weak::new(),
        });
        ContextGuard {
            stack: self,
            id: None,
        }
    }

    /// The computation reads should currently be attributed to, if any.
    pub(crate) fn current(&self) -> Option<Rc<ComputationInner>> {
        self.frames
            .borrow()
            .last()
            .and_then(|frame| frame.computation.upgrade())
    }

    pub(crate) fn current_id(&self) -> Option<ComputationId> {
        self.frames.borrow().last().and_then(|frame| frame.id)
    }

    pub(crate) fn depth(&self) -> usize {
        self.frames.borrow().len()
    }
}

/// Pops its frame when dropped, including during unwinding.
pub(crate) struct ContextGuard<'a> {
    stack: &'a ContextStack,
    id: Option<ComputationId>,
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        let popped = self.stack.frames.borrow_mut().pop();

        if let Some(frame) = popped {
            debug_assert_eq!(
                frame.id, self.id,
                "context mismatch: expected {:?}, got {:?}",
                self.id, frame.id
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Computation, Runtime};

    #[test]
    fn context_tracks_computation() {
        let rt = Runtime::new();
        let computation = Computation::new(&rt, || {});
        let stack = ContextStack::default();

        assert_eq!(stack.depth(), 0);
        assert!(stack.current().is_none());

        {
            let _ctx = stack.enter(computation.inner());
            assert_eq!(stack.depth(), 1);
            assert_eq!(stack.current_id(), Some(computation.id()));
        }

        assert_eq!(stack.depth(), 0);
        assert!(stack.current_id().is_none());
    }

    #[test]
    fn nested_contexts() {
        let rt = Runtime::new();
        let outer = Computation::new(&rt, || {});
        let inner = Computation::new(&rt, || {});
        let stack = ContextStack::default();

        {
            let _outer = stack.enter(outer.inner());
            assert_eq!(stack.current_id(), Some(outer.id()));

            {
                let _inner = stack.enter(inner.inner());
                assert_eq!(stack.current_id(), Some(inner.id()));
            }

            assert_eq!(stack.current_id(), Some(outer.id()));
        }

        assert!(stack.current_id().is_none());
    }

    #[test]
    fn untracked_frame_hides_running_computation() {
        let rt = Runtime::new();
        let computation = Computation::new(&rt, || {});
        let stack = ContextStack::default();

        let _ctx = stack.enter(computation.inner());
        {
            let _untracked = stack.enter_untracked();
            assert!(stack.current().is_none());
            assert_eq!(stack.depth(), 2);
        }
        assert_eq!(stack.current_id(), Some(computation.id()));
    }
}
