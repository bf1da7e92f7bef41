//! Reactive Context
//!
//! The reactive context tracks which computation is currently running and
//! which scope owns anything created right now. This enables automatic
//! dependency tracking: when a signal is read, we can register the current
//! computation as a dependent.
//!
//! # Implementation
//!
//! Each runtime carries its own stack of frames. When entering a reactive
//! context (running a memo or effect, untracking, running inside a scope)
//! we push a frame; the returned guard pops it when dropped, so the stack
//! is restored even if the computation panics.
//!
//! This design supports nested reactive contexts (e.g., a memo that reads
//! from another memo): reads always attribute to the innermost frame.

use std::cell::RefCell;

use crate::graph::NodeId;

use super::ScopeId;

/// An entry in the reactive context stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frame {
    /// The computation recording dependencies, if any.
    observer: Option<NodeId>,
    /// The scope adopting newly created nodes and scopes, if any.
    owner: Option<ScopeId>,
}

/// The per-runtime stack of active computations and owners.
#[derive(Debug, Default)]
pub struct ReactiveContext {
    frames: RefCell<Vec<Frame>>,
}

/// Guard that pops the context when dropped.
///
/// This ensures the context stack is properly maintained even if
/// the computation panics.
#[must_use = "the context is exited as soon as the guard is dropped"]
pub struct ContextGuard<'a> {
    context: &'a ReactiveContext,
    frame: Frame,
}

impl ReactiveContext {
    /// Create an empty context stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a context where `observer` records dependencies and `owner`
    /// adopts new nodes.
    pub fn enter(&self, observer: Option<NodeId>, owner: Option<ScopeId>) -> ContextGuard<'_> {
        let frame = Frame { observer, owner };
        self.frames.borrow_mut().push(frame);
        ContextGuard {
            context: self,
            frame,
        }
    }

    /// Enter a context where reads are not tracked. Ownership is inherited.
    pub fn untracked(&self) -> ContextGuard<'_> {
        self.enter(None, self.current_owner())
    }

    /// Check if there is an active computation recording reads.
    pub fn is_active(&self) -> bool {
        self.current_observer().is_some()
    }

    /// Get the computation currently recording reads, if any.
    pub fn current_observer(&self) -> Option<NodeId> {
        self.frames.borrow().last().and_then(|frame| frame.observer)
    }

    /// Get the scope currently adopting new nodes, if any.
    pub fn current_owner(&self) -> Option<ScopeId> {
        self.frames.borrow().last().and_then(|frame| frame.owner)
    }

    /// Whether a memo or effect body is running somewhere below the top
    /// frame, even if the top frame itself is untracked.
    pub fn in_computation(&self) -> bool {
        self.frames.borrow().iter().any(|frame| frame.observer.is_some())
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        let popped = self.context.frames.borrow_mut().pop();

        // Verify we're popping the right context.
        // This helps catch bugs where contexts are mismatched.
        debug_assert_eq!(
            popped,
            Some(self.frame),
            "ReactiveContext mismatch: expected {:?}, got {:?}",
            self.frame,
            popped
        );
    }
}
