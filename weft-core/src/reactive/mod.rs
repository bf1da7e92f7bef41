//! Reactive Primitives
//!
//! This module implements the core reactive system: signals, memos, and effects.
//! These primitives form the foundation of weft's fine-grained reactivity.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! within a tracking context (such as a memo or effect), the signal automatically
//! registers that context as a dependent. When the signal's value changes, all
//! dependents are notified.
//!
//! ## Memos
//!
//! A Memo is a derived value that caches its result. It re-evaluates only when
//! one of its dependencies changes. Memos are useful for expensive computations
//! that should not be repeated unnecessarily.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs whenever its dependencies
//! change. Effects are used to synchronize reactive state with external systems,
//! such as updating the output layer or logging.
//!
//! ## Scopes
//!
//! Every node belongs to the scope that was current when it was created.
//! Disposing a scope disposes everything it owns. Memos and effects own a
//! private scope that is reset before each run, so nested effects never
//! outlive the run that created them.
//!
//! # Implementation Notes
//!
//! All state lives in an explicit [`Runtime`] rather than in globals. The
//! runtime's tracking context detects dependencies automatically: when a
//! signal is read, we check if there is an active computation and, if so,
//! record the dependency.
//!
//! This approach (sometimes called "automatic dependency tracking" or
//! "transparent reactivity") is used by SolidJS, Vue 3, and Leptos.

mod batch;
mod computation;
mod context;
mod effect;
mod memo;
mod owner;
mod runtime;
mod signal;

pub(crate) use computation::Computation;
pub use computation::{Cleanup, IntoCleanup};
pub use effect::Effect;
pub use memo::Memo;
pub use owner::{Scope, ScopeId};
pub use runtime::Runtime;
pub use signal::{ReadSignal, Signal, WriteSignal};
