//! Edit Script Operations
//!
//! Defines the operations a reconciliation emits. They serialize as
//! internally tagged objects so an output layer written in any language
//! can consume them as data:
//!
//! ```json
//! {"op": "MOVE", "key": "a", "old_index": 0, "new_index": 2, "changed": false}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Operation codes, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpKind {
    Add,
    Remove,
    Move,
    Update,
    Keep,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OpKind::Add => "ADD",
            OpKind::Remove => "REMOVE",
            OpKind::Move => "MOVE",
            OpKind::Update => "UPDATE",
            OpKind::Keep => "KEEP",
        })
    }
}

/// A single structural operation in an edit script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Op<K> {
    /// The key is new. Build an element from the new item.
    Add {
        key: K,
        new_index: usize,
    },

    /// The element at `old_index` is not reused. Drop it.
    Remove {
        key: K,
        old_index: usize,
    },

    /// The key changed position. `changed` is set when the item itself also
    /// differs, so the relocated element needs an update as well.
    Move {
        key: K,
        old_index: usize,
        new_index: usize,
        changed: bool,
    },

    /// Same key, same position, different item.
    Update {
        key: K,
        index: usize,
    },

    /// Same key, same position, same item.
    Keep {
        key: K,
        index: usize,
    },
}

impl<K> Op<K> {
    /// Get the key this operation applies to.
    pub fn key(&self) -> &K {
        match self {
            Op::Add { key, .. }
            | Op::Remove { key, .. }
            | Op::Move { key, .. }
            | Op::Update { key, .. }
            | Op::Keep { key, .. } => key,
        }
    }

    /// Get the operation code.
    pub fn kind(&self) -> OpKind {
        match self {
            Op::Add { .. } => OpKind::Add,
            Op::Remove { .. } => OpKind::Remove,
            Op::Move { .. } => OpKind::Move,
            Op::Update { .. } => OpKind::Update,
            Op::Keep { .. } => OpKind::Keep,
        }
    }

    /// Position in the old sequence, if the key was present there.
    pub fn old_index(&self) -> Option<usize> {
        match self {
            Op::Add { .. } => None,
            Op::Remove { old_index, .. } | Op::Move { old_index, .. } => Some(*old_index),
            Op::Update { index, .. } | Op::Keep { index, .. } => Some(*index),
        }
    }

    /// Position in the new sequence, if the key is present there.
    pub fn new_index(&self) -> Option<usize> {
        match self {
            Op::Remove { .. } => None,
            Op::Add { new_index, .. } | Op::Move { new_index, .. } => Some(*new_index),
            Op::Update { index, .. } | Op::Keep { index, .. } => Some(*index),
        }
    }

    /// Whether the operation requires any work from the output layer.
    pub fn is_change(&self) -> bool {
        !matches!(self, Op::Keep { .. })
    }

    /// Whether the element at the new position can be reused as is.
    pub fn reuses_element(&self) -> bool {
        matches!(self, Op::Keep { .. } | Op::Move { changed: false, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_cover_every_variant() {
        let add = Op::Add {
            key: "a",
            new_index: 1,
        };
        assert_eq!(add.kind(), OpKind::Add);
        assert_eq!(add.old_index(), None);
        assert_eq!(add.new_index(), Some(1));

        let remove = Op::Remove {
            key: "b",
            old_index: 4,
        };
        assert_eq!(remove.key(), &"b");
        assert_eq!(remove.old_index(), Some(4));
        assert_eq!(remove.new_index(), None);

        let keep = Op::Keep { key: "c", index: 2 };
        assert_eq!(keep.old_index(), keep.new_index());
        assert!(!keep.is_change());
        assert!(keep.reuses_element());
    }

    #[test]
    fn moved_element_is_reused_only_when_unchanged() {
        let moved = |changed| Op::Move {
            key: 1,
            old_index: 0,
            new_index: 3,
            changed,
        };
        assert!(moved(false).reuses_element());
        assert!(!moved(true).reuses_element());
        assert!(moved(false).is_change());
    }

    #[test]
    fn serializes_with_op_tag() {
        let op = Op::Move {
            key: "a".to_string(),
            old_index: 0,
            new_index: 2,
            changed: false,
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "op": "MOVE",
                "key": "a",
                "old_index": 0,
                "new_index": 2,
                "changed": false
            })
        );
    }

    #[test]
    fn parses_an_op_from_json() {
        let json = r#"{"op": "UPDATE", "key": 7, "index": 3}"#;
        let op: Op<u32> = serde_json::from_str(json).unwrap();
        assert_eq!(op, Op::Update { key: 7, index: 3 });
        assert_eq!(op.kind().to_string(), "UPDATE");
    }
}
