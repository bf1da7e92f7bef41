//! Dependency Graph
//!
//! This module implements the dependency graph that tracks relationships
//! between signals and the computations that read them.
//!
//! # Overview
//!
//! - Nodes represent reactive values (signals) or computations (memos, effects)
//! - Edges represent dependencies: if A reads B, there is an edge from B to A
//!
//! Edges are rebuilt from scratch every time a computation runs, so the
//! graph always reflects what each computation read during its most recent
//! run and nothing older.
//!
//! # Design Decisions
//!
//! 1. We use a centralized graph per runtime rather than storing edge lists
//!    inside each handle, so that disposal and propagation never need to
//!    reach into user-owned values.
//!
//! 2. The graph is indexed by node ID for O(1) lookups.
//!
//! 3. We maintain both forward (dependencies) and reverse (dependents) edges
//!    to enable efficient traversal in both directions. Both are
//!    insertion-ordered so that notification order is deterministic.

mod node;
mod scheduler;

pub use node::{DirtyState, NodeId, NodeKind};
pub(crate) use node::{Body, Node};
pub(crate) use scheduler::UpdateScheduler;
