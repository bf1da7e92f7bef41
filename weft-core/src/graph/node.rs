//! Graph Nodes
//!
//! This module defines the node types that live in the dependency graph.

use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexSet;

use crate::reactive::{Computation, ScopeId};

/// Unique identifier for a node in the dependency graph.
///
/// Identifiers come from a process-wide counter, so ids from two different
/// runtimes never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A source node (signal). Signals have dependents but never
    /// dependencies, and are always clean.
    Signal,

    /// A derived node (memo). Memos have dependencies and may have
    /// dependents. They cache their computed value and recompute lazily.
    Memo,

    /// An effect node. Effects are leaves of the graph: they have
    /// dependencies but nothing can depend on them.
    Effect,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NodeKind::Signal => "signal",
            NodeKind::Memo => "memo",
            NodeKind::Effect => "effect",
        })
    }
}

/// Dirty state of a node.
///
/// States are ordered: marking a node never lowers its state, only
/// refreshing it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DirtyState {
    /// The node's value is up-to-date.
    Clean,

    /// The node might need to recompute. Something upstream changed, but
    /// we have not yet verified if any of its direct inputs are different.
    MaybeDirty,

    /// The node definitely needs to recompute. Its inputs have changed.
    Dirty,
}

/// The runnable part of a computation node.
///
/// Effects are owned by the graph and live until disposed. Memos are owned
/// by their handles; the graph only keeps a weak reference so that a memo
/// nobody can read any more is released.
pub(crate) enum Body {
    Owned(Rc<dyn Computation>),
    Held(Weak<dyn Computation>),
}

/// A node in the dependency graph.
pub struct Node {
    /// Unique identifier for this node.
    id: NodeId,

    /// What kind of node this is.
    kind: NodeKind,

    /// Current dirty state.
    dirty: DirtyState,

    /// Nodes that this node read during its most recent run.
    dependencies: IndexSet<NodeId>,

    /// Nodes that read this node during their most recent run, in the
    /// order they subscribed.
    dependents: IndexSet<NodeId>,

    /// Scope that disposes this node.
    owner: Option<ScopeId>,

    /// Private scope owning everything created while the body runs.
    scope: Option<ScopeId>,

    body: Option<Body>,
}

impl Node {
    /// Create a new node with the given kind.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            id: NodeId::new(),
            kind,
            dirty: match kind {
                NodeKind::Signal => DirtyState::Clean,
                // Start dirty to ensure first computation
                NodeKind::Memo | NodeKind::Effect => DirtyState::Dirty,
            },
            dependencies: IndexSet::new(),
            dependents: IndexSet::new(),
            owner: None,
            scope: None,
            body: None,
        }
    }

    /// Create a new signal node.
    pub fn signal() -> Self {
        Self::new(NodeKind::Signal)
    }

    /// Create a new memo node.
    pub fn memo() -> Self {
        Self::new(NodeKind::Memo)
    }

    /// Create a new effect node.
    pub fn effect() -> Self {
        Self::new(NodeKind::Effect)
    }

    pub(crate) fn with_owner(mut self, owner: Option<ScopeId>) -> Self {
        self.owner = owner;
        self
    }

    pub(crate) fn with_scope(mut self, scope: ScopeId) -> Self {
        self.scope = Some(scope);
        self
    }

    pub(crate) fn set_body(&mut self, body: Body) {
        self.body = Some(body);
    }

    /// Get the node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Get the node's kind.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Get the scope that owns this node, if any.
    pub fn owner(&self) -> Option<ScopeId> {
        self.owner
    }

    /// Get the node's private scope (computations only).
    pub fn scope(&self) -> Option<ScopeId> {
        self.scope
    }

    /// Get the current dirty state.
    pub fn dirty_state(&self) -> DirtyState {
        self.dirty
    }

    /// Mark the node as clean.
    pub fn mark_clean(&mut self) {
        self.dirty = DirtyState::Clean;
    }

    /// Raise the dirty state to `state`.
    ///
    /// Returns the previous state if it was raised, `None` if the node was
    /// already at least that stale.
    pub fn raise(&mut self, state: DirtyState) -> Option<DirtyState> {
        if self.dirty >= state {
            return None;
        }
        let previous = self.dirty;
        self.dirty = state;
        Some(previous)
    }

    /// Mark the node as definitely dirty (needs recomputation).
    pub fn mark_dirty(&mut self) {
        self.dirty = DirtyState::Dirty;
    }

    /// Add a dependency (a node that this node reads from).
    pub fn add_dependency(&mut self, node_id: NodeId) {
        self.dependencies.insert(node_id);
    }

    /// Remove a dependency.
    pub fn remove_dependency(&mut self, node_id: NodeId) {
        self.dependencies.shift_remove(&node_id);
    }

    /// Get all dependencies, in the order they were first read.
    pub fn dependencies(&self) -> &IndexSet<NodeId> {
        &self.dependencies
    }

    /// Add a dependent (a node that reads from this node).
    pub fn add_dependent(&mut self, node_id: NodeId) {
        self.dependents.insert(node_id);
    }

    /// Remove a dependent.
    pub fn remove_dependent(&mut self, node_id: NodeId) {
        self.dependents.shift_remove(&node_id);
    }

    /// Get all dependents, in subscription order.
    pub fn dependents(&self) -> &IndexSet<NodeId> {
        &self.dependents
    }

    /// Clear all dependencies, returning them.
    pub fn take_dependencies(&mut self) -> IndexSet<NodeId> {
        std::mem::take(&mut self.dependencies)
    }

    /// Clear all dependents, returning them.
    pub fn take_dependents(&mut self) -> IndexSet<NodeId> {
        std::mem::take(&mut self.dependents)
    }

    /// Get a strong reference to the node's body, if it is still alive.
    pub(crate) fn computation(&self) -> Option<Rc<dyn Computation>> {
        match self.body.as_ref()? {
            Body::Owned(body) => Some(Rc::clone(body)),
            Body::Held(body) => body.upgrade(),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("dirty", &self.dirty)
            .field("dependencies", &self.dependencies)
            .field("dependents", &self.dependents)
            .field("owner", &self.owner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_are_unique() {
        let id1 = NodeId::new();
        let id2 = NodeId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn signal_node_starts_clean() {
        let node = Node::signal();
        assert_eq!(node.kind(), NodeKind::Signal);
        assert_eq!(node.dirty_state(), DirtyState::Clean);
    }

    #[test]
    fn computation_nodes_start_dirty() {
        assert_eq!(Node::memo().dirty_state(), DirtyState::Dirty);
        assert_eq!(Node::effect().dirty_state(), DirtyState::Dirty);
    }

    #[test]
    fn dependency_management() {
        let mut node = Node::memo();
        let dep1 = NodeId::new();
        let dep2 = NodeId::new();

        node.add_dependency(dep1);
        node.add_dependency(dep2);
        node.add_dependency(dep1);

        assert_eq!(node.dependencies().len(), 2);
        assert_eq!(node.dependencies().get_index(0), Some(&dep1));

        node.remove_dependency(dep1);
        assert!(!node.dependencies().contains(&dep1));
        assert_eq!(node.dependencies().len(), 1);

        let taken = node.take_dependencies();
        assert!(taken.contains(&dep2));
        assert!(node.dependencies().is_empty());
    }

    #[test]
    fn dirty_state_only_rises_through_raise() {
        let mut node = Node::memo();
        node.mark_clean();

        assert_eq!(node.raise(DirtyState::MaybeDirty), Some(DirtyState::Clean));
        assert_eq!(node.raise(DirtyState::MaybeDirty), None);
        assert_eq!(node.raise(DirtyState::Dirty), Some(DirtyState::MaybeDirty));
        assert_eq!(node.raise(DirtyState::MaybeDirty), None);
        assert_eq!(node.dirty_state(), DirtyState::Dirty);

        node.mark_clean();
        assert_eq!(node.dirty_state(), DirtyState::Clean);
    }

    #[test]
    fn display_formats() {
        assert_eq!(NodeId::from(12).to_string(), "#12");
        assert_eq!(NodeKind::Effect.to_string(), "effect");
    }
}
