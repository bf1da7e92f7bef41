//! Update Scheduler
//!
//! The scheduler owns every node of one runtime's dependency graph and
//! keeps both edge directions consistent.
//!
//! # Algorithm
//!
//! Staleness is pushed, values are pulled:
//!
//! 1. When a signal changes, each direct dependent is marked `Dirty`.
//! 2. Everything further downstream is marked `MaybeDirty`.
//! 3. Every effect reached is reported to the caller, which queues it in
//!    subscription order (ignoring effects already pending).
//! 4. Nothing is recomputed here. Memos refresh when read, effects when
//!    the batch queue drains.
//!
//! There is no topological sort: queued effects run in the order they were
//! first scheduled, and a `MaybeDirty` node refreshes its dependencies on
//! demand before deciding whether to run.

use std::collections::{HashMap, HashSet};

use smallvec::SmallVec;

use super::node::{DirtyState, Node, NodeId, NodeKind};

/// Effects reached by one propagation.
pub type StaleEffects = SmallVec<[NodeId; 8]>;

/// The update scheduler manages the dependency graph of a runtime.
pub struct UpdateScheduler {
    /// All nodes in the graph, indexed by ID.
    nodes: HashMap<NodeId, Node>,
}

impl UpdateScheduler {
    /// Create a new empty scheduler.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Add a node to the graph.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id();
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node from the graph.
    ///
    /// Also removes all edges involving this node. The node is handed back
    /// so the caller can drop its body once no borrow of the graph is held.
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        let mut node = self.nodes.remove(&node_id)?;

        // Remove this node from its dependencies' dependent lists
        for dep_id in node.take_dependencies() {
            if let Some(dep) = self.nodes.get_mut(&dep_id) {
                dep.remove_dependent(node_id);
            }
        }

        // Remove this node from its dependents' dependency lists
        for dependent_id in node.take_dependents() {
            if let Some(dependent) = self.nodes.get_mut(&dependent_id) {
                dependent.remove_dependency(node_id);
            }
        }

        Some(node)
    }

    /// Check whether a node is still part of the graph.
    pub fn contains(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    /// Get a mutable reference to a node.
    pub fn get_node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Get the kind of a node.
    pub fn kind(&self, node_id: NodeId) -> Option<NodeKind> {
        self.nodes.get(&node_id).map(Node::kind)
    }

    /// Get the dirty state of a node.
    pub fn dirty_state(&self, node_id: NodeId) -> Option<DirtyState> {
        self.nodes.get(&node_id).map(Node::dirty_state)
    }

    /// Add a dependency edge: `dependent` depends on `dependency`.
    ///
    /// This means when `dependency` changes, `dependent` may need to update.
    /// Both ends must exist; edges to removed nodes are never recorded.
    pub fn add_edge(&mut self, dependency: NodeId, dependent: NodeId) {
        if !self.nodes.contains_key(&dependency) || !self.nodes.contains_key(&dependent) {
            return;
        }
        if let Some(dep_node) = self.nodes.get_mut(&dependency) {
            dep_node.add_dependent(dependent);
        }
        if let Some(dependent_node) = self.nodes.get_mut(&dependent) {
            dependent_node.add_dependency(dependency);
        }
    }

    /// Drop every edge from `node_id` to the nodes it depends on.
    ///
    /// This is the first half of a re-run: dependencies are rebuilt from
    /// scratch by the reads of the next run.
    pub fn clear_dependencies(&mut self, node_id: NodeId) {
        let Some(node) = self.nodes.get_mut(&node_id) else {
            return;
        };
        for dep_id in node.take_dependencies() {
            if let Some(dep) = self.nodes.get_mut(&dep_id) {
                dep.remove_dependent(node_id);
            }
        }
    }

    /// Dependents of a node in subscription order.
    pub fn dependents_of(&self, node_id: NodeId) -> SmallVec<[NodeId; 8]> {
        self.nodes
            .get(&node_id)
            .map(|node| node.dependents().iter().copied().collect())
            .unwrap_or_default()
    }

    /// Dependencies of a node in the order they were first read.
    pub fn dependencies_of(&self, node_id: NodeId) -> SmallVec<[NodeId; 8]> {
        self.nodes
            .get(&node_id)
            .map(|node| node.dependencies().iter().copied().collect())
            .unwrap_or_default()
    }

    /// Raise `root` to `state` and everything downstream of it to
    /// `MaybeDirty`.
    ///
    /// Returns every effect reached, in depth-first subscription order,
    /// including effects that were already stale. The caller's queue drops
    /// the ones still pending; the others were left stale by a refresh that
    /// panicked and must be queued again.
    pub fn mark_stale(&mut self, root: NodeId, state: DirtyState) -> StaleEffects {
        let mut effects = StaleEffects::new();
        let mut visited = HashSet::new();
        let mut stack: SmallVec<[(NodeId, DirtyState); 16]> = SmallVec::new();
        stack.push((root, state));

        while let Some((node_id, state)) = stack.pop() {
            if !visited.insert(node_id) {
                continue;
            }
            let Some(node) = self.nodes.get_mut(&node_id) else {
                continue;
            };
            node.raise(state);

            if node.kind() == NodeKind::Effect {
                effects.push(node_id);
            }

            // Push in reverse so the first subscriber is visited first
            for dependent_id in node.dependents().iter().rev() {
                stack.push((*dependent_id, DirtyState::MaybeDirty));
            }
        }

        effects
    }

    /// Get the total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// IDs of every node in the graph, in no particular order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }
}

impl Default for UpdateScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(scheduler: &mut UpdateScheduler, ids: &[NodeId]) {
        for id in ids {
            scheduler.get_node_mut(*id).unwrap().mark_clean();
        }
    }

    #[test]
    fn add_and_remove_nodes() {
        let mut scheduler = UpdateScheduler::new();

        let id1 = scheduler.add_node(Node::signal());
        let id2 = scheduler.add_node(Node::memo());

        assert_eq!(scheduler.node_count(), 2);

        let removed = scheduler.remove_node(id1);
        assert_eq!(removed.map(|n| n.id()), Some(id1));
        assert_eq!(scheduler.node_count(), 1);
        assert!(!scheduler.contains(id1));
        assert!(scheduler.contains(id2));
    }

    #[test]
    fn add_and_clear_edges() {
        let mut scheduler = UpdateScheduler::new();

        let source_id = scheduler.add_node(Node::signal());
        let derived_id = scheduler.add_node(Node::memo());

        scheduler.add_edge(source_id, derived_id);

        // Check the edge exists in both directions
        assert_eq!(scheduler.dependents_of(source_id).as_slice(), &[derived_id]);
        assert_eq!(scheduler.dependencies_of(derived_id).as_slice(), &[source_id]);

        // Drop it from the dependent's side
        scheduler.clear_dependencies(derived_id);

        assert!(scheduler.dependents_of(source_id).is_empty());
        assert!(scheduler.dependencies_of(derived_id).is_empty());
    }

    #[test]
    fn edges_to_missing_nodes_are_ignored() {
        let mut scheduler = UpdateScheduler::new();
        let source_id = scheduler.add_node(Node::signal());

        scheduler.add_edge(source_id, NodeId::new());
        assert!(scheduler.dependents_of(source_id).is_empty());
    }

    #[test]
    fn removing_a_node_removes_its_edges() {
        let mut scheduler = UpdateScheduler::new();

        let source = scheduler.add_node(Node::signal());
        let memo = scheduler.add_node(Node::memo());
        let effect = scheduler.add_node(Node::effect());

        scheduler.add_edge(source, memo);
        scheduler.add_edge(memo, effect);

        scheduler.remove_node(memo);

        assert!(scheduler.dependents_of(source).is_empty());
        assert!(scheduler.dependencies_of(effect).is_empty());
    }

    #[test]
    fn clear_dependencies_unsubscribes_from_every_source() {
        let mut scheduler = UpdateScheduler::new();

        let a = scheduler.add_node(Node::signal());
        let b = scheduler.add_node(Node::signal());
        let effect = scheduler.add_node(Node::effect());

        scheduler.add_edge(a, effect);
        scheduler.add_edge(b, effect);
        scheduler.clear_dependencies(effect);

        assert!(scheduler.dependents_of(a).is_empty());
        assert!(scheduler.dependents_of(b).is_empty());
        assert!(scheduler.dependencies_of(effect).is_empty());
    }

    #[test]
    fn mark_stale_propagates() {
        let mut scheduler = UpdateScheduler::new();

        // Create a chain: source -> memo1 -> memo2 -> effect
        let source = scheduler.add_node(Node::signal());
        let memo1 = scheduler.add_node(Node::memo());
        let memo2 = scheduler.add_node(Node::memo());
        let effect = scheduler.add_node(Node::effect());

        scheduler.add_edge(source, memo1);
        scheduler.add_edge(memo1, memo2);
        scheduler.add_edge(memo2, effect);
        clean(&mut scheduler, &[memo1, memo2, effect]);

        let effects = scheduler.mark_stale(memo1, DirtyState::Dirty);

        assert_eq!(effects.as_slice(), &[effect]);
        assert_eq!(scheduler.dirty_state(memo1), Some(DirtyState::Dirty));
        assert_eq!(scheduler.dirty_state(memo2), Some(DirtyState::MaybeDirty));
        assert_eq!(scheduler.dirty_state(effect), Some(DirtyState::MaybeDirty));
    }

    #[test]
    fn mark_stale_visits_each_node_once_per_call() {
        let mut scheduler = UpdateScheduler::new();

        // Diamond: source -> (left, right) -> effect
        let source = scheduler.add_node(Node::signal());
        let left = scheduler.add_node(Node::memo());
        let right = scheduler.add_node(Node::memo());
        let effect = scheduler.add_node(Node::effect());

        scheduler.add_edge(source, left);
        scheduler.add_edge(source, right);
        scheduler.add_edge(left, effect);
        scheduler.add_edge(right, effect);
        scheduler.add_edge(left, right);
        clean(&mut scheduler, &[left, right, effect]);

        let effects = scheduler.mark_stale(left, DirtyState::Dirty);
        assert_eq!(effects.as_slice(), &[effect]);

        // The second branch reaches the effect again; the queue dedups it
        let effects = scheduler.mark_stale(right, DirtyState::Dirty);
        assert_eq!(effects.as_slice(), &[effect]);
        assert_eq!(scheduler.dirty_state(effect), Some(DirtyState::MaybeDirty));
    }

    #[test]
    fn mark_stale_keeps_subscription_order() {
        let mut scheduler = UpdateScheduler::new();

        let memo = scheduler.add_node(Node::memo());
        let first = scheduler.add_node(Node::effect());
        let second = scheduler.add_node(Node::effect());

        scheduler.add_edge(memo, first);
        scheduler.add_edge(memo, second);
        clean(&mut scheduler, &[memo, first, second]);

        let effects = scheduler.mark_stale(memo, DirtyState::Dirty);
        assert_eq!(effects.as_slice(), &[first, second]);
    }

    #[test]
    fn mark_stale_walks_through_already_stale_memos() {
        let mut scheduler = UpdateScheduler::new();

        let memo = scheduler.add_node(Node::memo());
        let effect = scheduler.add_node(Node::effect());
        scheduler.add_edge(memo, effect);

        // The memo is still dirty from an earlier change; the effect is clean
        scheduler.get_node_mut(effect).unwrap().mark_clean();

        let effects = scheduler.mark_stale(memo, DirtyState::Dirty);
        assert_eq!(effects.as_slice(), &[effect]);
        assert_eq!(scheduler.dirty_state(effect), Some(DirtyState::MaybeDirty));
    }
}
