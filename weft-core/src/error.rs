//! Error types for the reactive runtime.
//!
//! Misusing a disposed handle is a programming error. The plain accessors
//! (`get`, `set`, ...) panic with the [`ReactiveError`] message, while the
//! `try_*` variants hand the error back to the caller.

use std::any::Any;

use thiserror::Error;

use crate::graph::{NodeId, NodeKind};
use crate::reactive::ScopeId;

/// Result alias used throughout the crate.
pub type Result<T, E = ReactiveError> = std::result::Result<T, E>;

/// Errors raised by the reactive runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// A signal, memo or effect was used after its owner disposed it.
    #[error("{kind} {id} was used after it was disposed")]
    Disposed {
        /// What kind of node the handle pointed at.
        kind: NodeKind,
        /// The node the handle pointed at.
        id: NodeId,
    },

    /// `run_in_scope` was called with a scope that is already disposed.
    #[error("scope {0} was used after it was disposed")]
    ScopeDisposed(ScopeId),

    /// A handle outlived the runtime that created it.
    #[error("the reactive runtime backing this handle has been dropped")]
    RuntimeDropped,

    /// A signal or memo was written while a `with` closure still held a
    /// reference to its value. The write can come from the closure itself
    /// or from an effect the closure's own writes triggered.
    #[error("{kind} {id} was written while a `with` closure was still reading it")]
    ReentrantWrite {
        /// What kind of node was written.
        kind: NodeKind,
        /// The node that was written.
        id: NodeId,
    },

    /// A computation run by the triggered flush panicked.
    #[error("computation {id} panicked: {message}")]
    ComputationPanicked {
        /// The computation that panicked.
        id: NodeId,
        /// Panic message, when the payload was a string.
        message: String,
    },
}

impl ReactiveError {
    /// Build a [`ReactiveError::ComputationPanicked`] from a panic payload.
    ///
    /// A payload that already is a `ReactiveError` is handed back as is.
    pub(crate) fn from_panic(id: NodeId, payload: &(dyn Any + Send)) -> Self {
        if let Some(err) = payload.downcast_ref::<ReactiveError>() {
            return err.clone();
        }
        Self::ComputationPanicked {
            id,
            message: panic_message(payload),
        }
    }
}

/// Extract a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(err) = payload.downcast_ref::<ReactiveError>() {
        err.to_string()
    } else {
        "non-string panic payload".to_string()
    }
}
