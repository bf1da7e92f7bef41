//! Batch Scheduling
//!
//! Writes store their value immediately but defer notification while a
//! batch is open. Affected effects collect in a pending queue that the
//! outermost batch drains when it closes.
//!
//! # Ordering
//!
//! The queue is first-scheduled, first-flushed. An effect scheduled again
//! while it is still pending keeps its original position, so it appears at
//! most once. Once it has been popped it can be queued again, which is how
//! an effect that writes one of its own inputs gets re-run.
//!
//! Every signal write goes through a batch: a write outside any batch opens
//! a one-write batch and flushes on the way out. While the queue drains the
//! batch is still open, so writes made by running effects land in the same
//! queue and are drained by the same loop instead of recursing.

use std::collections::{HashSet, VecDeque};

use crate::graph::NodeId;

/// Pending computations plus the nesting depth of open batches.
#[derive(Debug, Default)]
pub(crate) struct BatchQueue {
    depth: usize,
    pending: VecDeque<NodeId>,
    queued: HashSet<NodeId>,
}

impl BatchQueue {
    /// Create an empty queue with no open batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a batch. Returns the new depth.
    pub fn enter(&mut self) -> usize {
        self.depth += 1;
        self.depth
    }

    /// Close a batch. Returns the new depth.
    pub fn exit(&mut self) -> usize {
        debug_assert!(self.depth > 0, "batch exited more often than entered");
        self.depth = self.depth.saturating_sub(1);
        self.depth
    }

    /// Whether any batch is open.
    pub fn is_batching(&self) -> bool {
        self.depth > 0
    }

    /// Queue a computation. Returns `false` if it was already pending.
    pub fn push(&mut self, id: NodeId) -> bool {
        if !self.queued.insert(id) {
            return false;
        }
        self.pending.push_back(id);
        true
    }

    /// Take the oldest pending computation.
    pub fn pop(&mut self) -> Option<NodeId> {
        let id = self.pending.pop_front()?;
        self.queued.remove(&id);
        Some(id)
    }

    /// Number of pending computations.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Drop everything pending. Returns how many entries were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        self.queued.clear();
        dropped
    }
}
