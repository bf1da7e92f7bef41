//! Keyed Reconciliation
//!
//! Given an old and a new version of a keyed sequence, compute the
//! structural operations that turn one into the other. The output layer
//! replays them to reuse every element whose key survived instead of
//! rebuilding the whole list.
//!
//! # Algorithm
//!
//! 1. Map every old key to its index.
//! 2. Walk the new sequence in order. For each key:
//!    - absent from the old map: `Add`
//!    - present at the same index with an equal item: `Keep`
//!    - present at the same index with a different item: `Update`
//!    - present at a different index: `Move`
//! 3. Every old key not seen in the new sequence: `Remove`, in old order.
//!
//! Operations for the new sequence come first, in new order, followed by
//! the removals.
//!
//! # Duplicate Keys
//!
//! Keys are expected to be unique within each sequence. When the old
//! sequence repeats a key, the last occurrence is the one that can be
//! reused and every earlier occurrence gets a `Remove`. Such a key only
//! lands in `to_remove` if the new sequence lacks it, so `stats().removed`
//! can exceed `to_remove.len()`. When the new sequence repeats a key, each
//! occurrence gets its own operation and `moved` keeps the last new index.

mod op;

use std::collections::HashSet;
use std::hash::Hash;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::trace;

pub use op::{Op, OpKind};

/// The edit script produced by [`reconcile`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "K: Serialize",
    deserialize = "K: Deserialize<'de> + Eq + Hash"
))]
pub struct ReconcileResult<K> {
    /// All operations: new-sequence order first, then removals.
    pub ops: Vec<Op<K>>,

    /// Keys that are new.
    pub to_add: IndexSet<K>,

    /// Keys that are gone.
    pub to_remove: IndexSet<K>,

    /// Keys that changed position, mapped to their new index.
    pub moved: IndexMap<K, usize>,
}

/// Operation counts of a [`ReconcileResult`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileStats {
    pub added: usize,
    pub removed: usize,
    pub moved: usize,
    pub updated: usize,
    pub kept: usize,
}

impl<K> ReconcileResult<K>
where
    K: Eq + Hash,
{
    fn with_capacity(capacity: usize) -> Self {
        Self {
            ops: Vec::with_capacity(capacity),
            to_add: IndexSet::new(),
            to_remove: IndexSet::new(),
            moved: IndexMap::new(),
        }
    }

    /// True iff any operation is not a `Keep`.
    pub fn has_changes(&self) -> bool {
        self.ops.iter().any(Op::is_change)
    }

    /// True if both sequences were empty.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Count operations by kind.
    pub fn stats(&self) -> ReconcileStats {
        let mut stats = ReconcileStats::default();
        for op in &self.ops {
            match op.kind() {
                OpKind::Add => stats.added += 1,
                OpKind::Remove => stats.removed += 1,
                OpKind::Move => stats.moved += 1,
                OpKind::Update => stats.updated += 1,
                OpKind::Keep => stats.kept += 1,
            }
        }
        stats
    }

    /// Replay the script: build the new sequence, cloning reusable
    /// elements from `old` and taking the rest from `new`.
    ///
    /// Returns `None` if an index does not fit the given slices, which
    /// means they are not the sequences this script was computed from.
    pub fn apply<T: Clone>(&self, old: &[T], new: &[T]) -> Option<Vec<T>> {
        self.ops
            .iter()
            .filter(|op| op.kind() != OpKind::Remove)
            .map(|op| match op {
                Op::Keep { index, .. } => old.get(*index),
                Op::Move {
                    old_index,
                    changed: false,
                    ..
                } => old.get(*old_index),
                _ => op.new_index().and_then(|index| new.get(index)),
            })
            .map(|item| item.cloned())
            .collect()
    }
}

/// Whether a reconciliation found anything to do.
pub fn has_changes<K: Eq + Hash>(result: &ReconcileResult<K>) -> bool {
    result.has_changes()
}

/// Diff two keyed sequences, comparing items with `PartialEq`.
///
/// # Example
///
/// ```rust
/// use weft_core::reconcile::{reconcile, Op};
///
/// let old = ["a", "b", "c"];
/// let new = ["c", "a", "b"];
/// let result = reconcile(&old, &new, |item| *item);
///
/// assert_eq!(result.moved.get("c"), Some(&0));
/// assert!(result.to_add.is_empty() && result.to_remove.is_empty());
/// assert!(matches!(result.ops[0], Op::Move { key: "c", old_index: 2, .. }));
/// ```
pub fn reconcile<T, K, F>(old: &[T], new: &[T], key_fn: F) -> ReconcileResult<K>
where
    T: PartialEq,
    K: Eq + Hash + Clone,
    F: Fn(&T) -> K,
{
    reconcile_by(old, new, key_fn, |a, b| a == b)
}

/// Diff two keyed sequences with an explicit identity test.
///
/// `same_fn(old_item, new_item)` decides between `Keep` and `Update` (and
/// sets `changed` on moves). Pass `Rc::ptr_eq` to compare by reference.
pub fn reconcile_by<T, K, F, S>(old: &[T], new: &[T], key_fn: F, same_fn: S) -> ReconcileResult<K>
where
    K: Eq + Hash + Clone,
    F: Fn(&T) -> K,
    S: Fn(&T, &T) -> bool,
{
    // Last occurrence wins for duplicate old keys
    let old_keys: Vec<K> = old.iter().map(&key_fn).collect();
    let mut old_positions: IndexMap<K, usize> = IndexMap::with_capacity(old.len());
    for (index, key) in old_keys.iter().enumerate() {
        old_positions.insert(key.clone(), index);
    }

    let mut result = ReconcileResult::with_capacity(new.len());
    let mut seen: HashSet<K> = HashSet::with_capacity(new.len());

    for (new_index, item) in new.iter().enumerate() {
        let key = key_fn(item);
        seen.insert(key.clone());

        let op = match old_positions.get(&key).copied() {
            None => {
                result.to_add.insert(key.clone());
                Op::Add { key, new_index }
            }
            Some(old_index) if old_index == new_index => {
                if same_fn(&old[old_index], item) {
                    Op::Keep {
                        key,
                        index: new_index,
                    }
                } else {
                    Op::Update {
                        key,
                        index: new_index,
                    }
                }
            }
            Some(old_index) => {
                let changed = !same_fn(&old[old_index], item);
                result.moved.insert(key.clone(), new_index);
                Op::Move {
                    key,
                    old_index,
                    new_index,
                    changed,
                }
            }
        };
        result.ops.push(op);
    }

    for (old_index, key) in old_keys.into_iter().enumerate() {
        let shadowed = old_positions.get(&key) != Some(&old_index);
        if !seen.contains(&key) {
            result.to_remove.insert(key.clone());
        } else if !shadowed {
            continue;
        }
        result.ops.push(Op::Remove { key, old_index });
    }

    let stats = result.stats();
    trace!(
        old_len = old.len(),
        new_len = new.len(),
        added = stats.added,
        removed = stats.removed,
        moved = stats.moved,
        updated = stats.updated,
        "reconciled keyed sequence"
    );
    result
}

/// Keeps the previous sequence and diffs each new one against it.
///
/// Handy inside an effect that renders a list:
///
/// ```rust
/// use weft_core::reconcile::Reconciler;
///
/// let mut rows = Reconciler::new(|row: &(u32, char)| row.0);
///
/// let first = rows.next(vec![(1, 'a'), (2, 'b')]);
/// assert_eq!(first.to_add.len(), 2);
///
/// let second = rows.next(vec![(2, 'b'), (1, 'a')]);
/// assert_eq!(second.moved.len(), 2);
/// ```
pub struct Reconciler<T, K> {
    items: Vec<T>,
    key_fn: Box<dyn Fn(&T) -> K>,
}

impl<T, K> Reconciler<T, K>
where
    T: PartialEq,
    K: Eq + Hash + Clone,
{
    /// Start from an empty sequence.
    pub fn new<F>(key_fn: F) -> Self
    where
        F: Fn(&T) -> K + 'static,
    {
        Self::with_items(Vec::new(), key_fn)
    }

    /// Start from an existing sequence.
    pub fn with_items<F>(items: Vec<T>, key_fn: F) -> Self
    where
        F: Fn(&T) -> K + 'static,
    {
        Self {
            items,
            key_fn: Box::new(key_fn),
        }
    }

    /// Diff `items` against the previous sequence and keep it for next time.
    pub fn next(&mut self, items: Vec<T>) -> ReconcileResult<K> {
        let result = reconcile(&self.items, &items, &self.key_fn);
        self.items = items;
        result
    }

    /// The most recent sequence.
    pub fn current(&self) -> &[T] {
        &self.items
    }
}

impl<T: std::fmt::Debug, K> std::fmt::Debug for Reconciler<T, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("items", &self.items)
            .finish_non_exhaustive()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: &'static str,
        label: &'static str,
    }

    fn row(id: &'static str, label: &'static str) -> Row {
        Row { id, label }
    }

    fn key(row: &Row) -> &'static str {
        row.id
    }

    #[test]
    fn pure_reorder_only_moves() {
        let old = [row("1", "a"), row("2", "b"), row("3", "c")];
        let new = [row("3", "c"), row("1", "a"), row("2", "b")];

        let result = reconcile(&old, &new, key);

        let moved: Vec<_> = result.moved.iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(moved, vec![("3", 0), ("1", 1), ("2", 2)]);
        assert!(result.to_add.is_empty());
        assert!(result.to_remove.is_empty());
        assert_eq!(result.stats().moved, 3);
    }

    #[test]
    fn disjoint_sets_add_and_remove() {
        let old = [row("1", "a")];
        let new = [row("2", "b")];

        let result = reconcile(&old, &new, key);

        assert_eq!(
            result.ops,
            vec![
                Op::Add {
                    key: "2",
                    new_index: 0
                },
                Op::Remove {
                    key: "1",
                    old_index: 0
                },
            ]
        );
        assert!(result.to_add.contains("2"));
        assert!(result.to_remove.contains("1"));
    }

    #[test]
    fn changed_item_in_place_is_an_update() {
        let old = [row("1", "a"), row("2", "b")];
        let new = [row("1", "a"), row("2", "B")];

        let result = reconcile(&old, &new, key);

        assert_eq!(result.ops[0], Op::Keep { key: "1", index: 0 });
        assert_eq!(result.ops[1], Op::Update { key: "2", index: 1 });
        assert_eq!(
            result.stats(),
            ReconcileStats {
                updated: 1,
                kept: 1,
                ..ReconcileStats::default()
            }
        );
    }

    #[test]
    fn identical_sequences_have_no_changes() {
        let items = [row("1", "a"), row("2", "b")];
        let result = reconcile(&items, &items, key);

        assert!(!has_changes(&result));
        assert_eq!(result.len(), 2);
        assert!(reconcile::<Row, &str, _>(&[], &[], key).is_empty());
    }

    #[test]
    fn moved_item_records_change() {
        let old = [row("1", "a"), row("2", "b")];
        let new = [row("2", "b!"), row("1", "a")];

        let result = reconcile(&old, &new, key);

        assert_eq!(
            result.ops[0],
            Op::Move {
                key: "2",
                old_index: 1,
                new_index: 0,
                changed: true
            }
        );
        assert_eq!(
            result.ops[1],
            Op::Move {
                key: "1",
                old_index: 0,
                new_index: 1,
                changed: false
            }
        );
    }

    #[test]
    fn removals_come_last_in_old_order() {
        let old = [row("1", "a"), row("2", "b"), row("3", "c"), row("4", "d")];
        let new = [row("3", "c")];

        let result = reconcile(&old, &new, key);
        let removed: Vec<_> = result
            .ops
            .iter()
            .filter(|op| op.kind() == OpKind::Remove)
            .map(|op| (*op.key(), op.old_index()))
            .collect();

        assert_eq!(
            removed,
            vec![("1", Some(0)), ("2", Some(1)), ("4", Some(3))]
        );
        assert_eq!(result.ops[0].kind(), OpKind::Move);
    }

    #[test]
    fn duplicate_old_keys_use_last_occurrence() {
        let old = [row("x", "first"), row("y", "b"), row("x", "last")];
        let new = [row("x", "last")];

        let result = reconcile(&old, &new, key);

        assert_eq!(
            result.ops[0],
            Op::Move {
                key: "x",
                old_index: 2,
                new_index: 0,
                changed: false
            }
        );
        assert_eq!(result.to_remove.iter().copied().collect::<Vec<_>>(), vec!["y"]);
    }

    #[test]
    fn shadowed_old_occurrences_are_removed() {
        let old = [row("x", "first"), row("y", "b"), row("x", "last")];

        let result = reconcile(&old, &[row("x", "last")], key);
        let removed: Vec<_> = result
            .ops
            .iter()
            .filter(|op| op.kind() == OpKind::Remove)
            .map(|op| (*op.key(), op.old_index()))
            .collect();
        assert_eq!(removed, vec![("x", Some(0)), ("y", Some(1))]);
        assert_eq!(result.stats().removed, 2);

        // Every old index is accounted for exactly once
        let mut covered: Vec<usize> = result
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::Move { old_index, .. } | Op::Remove { old_index, .. } => Some(*old_index),
                Op::Keep { index, .. } | Op::Update { index, .. } => Some(*index),
                Op::Add { .. } => None,
            })
            .collect();
        covered.sort_unstable();
        assert_eq!(covered, vec![0, 1, 2]);

        // A key missing from the new sequence is listed once
        let gone = reconcile(&old, &[], key);
        assert_eq!(gone.stats().removed, 3);
        assert_eq!(gone.to_remove.iter().copied().collect::<Vec<_>>(), vec!["x", "y"]);
    }

    #[test]
    fn duplicate_new_keys_each_get_an_op() {
        let old = [row("x", "a")];
        let new = [row("x", "a"), row("x", "a")];

        let result = reconcile(&old, &new, key);

        assert_eq!(result.ops.len(), 2);
        assert_eq!(result.moved.get("x"), Some(&1));
    }

    #[test]
    fn reconcile_by_compares_references() {
        let shared = Rc::new(row("1", "a"));
        let old = vec![Rc::clone(&shared), Rc::new(row("2", "b"))];
        let new = vec![Rc::clone(&shared), Rc::new(row("2", "b"))];

        let result = reconcile_by(&old, &new, |r| r.id, Rc::ptr_eq);

        assert_eq!(result.ops[0].kind(), OpKind::Keep);
        assert_eq!(result.ops[1].kind(), OpKind::Update);

        // By value both are equal
        assert!(!reconcile(&old, &new, |r| r.id).has_changes());
    }

    #[test]
    fn apply_rebuilds_the_new_sequence() {
        let old = [row("1", "a"), row("2", "b"), row("3", "c")];
        let new = [row("4", "d"), row("2", "B"), row("1", "a")];

        let result = reconcile(&old, &new, key);

        assert_eq!(result.apply(&old, &new), Some(new.to_vec()));
        assert_eq!(result.apply(&old, &new[..1]), None);
    }

    #[test]
    fn reconciler_diffs_against_previous() {
        let mut reconciler = Reconciler::new(key);

        let first = reconciler.next(vec![row("1", "a"), row("2", "b")]);
        assert_eq!(first.stats().added, 2);

        let second = reconciler.next(vec![row("2", "b")]);
        assert_eq!(
            second.ops,
            vec![
                Op::Move {
                    key: "2",
                    old_index: 1,
                    new_index: 0,
                    changed: false
                },
                Op::Remove {
                    key: "1",
                    old_index: 0
                },
            ]
        );
        assert_eq!(reconciler.current(), &[row("2", "b")]);
    }

    #[test]
    fn result_serializes_sets_in_order() {
        let old = [row("1", "a")];
        let new = [row("2", "b"), row("1", "a")];

        let result = reconcile(&old, &new, key);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["to_add"], serde_json::json!(["2"]));
        assert_eq!(json["moved"], serde_json::json!({ "1": 1 }));
        assert_eq!(json["ops"][0]["op"], "ADD");
    }
}
