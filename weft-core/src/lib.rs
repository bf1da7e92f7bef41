//! Weft Core
//!
//! This crate provides the core runtime for the Weft reactive UI framework.
//! It implements:
//!
//! - Reactive primitives (signals, memos, effects)
//! - Ownership scopes with deterministic, idempotent disposal
//! - Batched, glitch-free change propagation
//! - Keyed reconciliation of list state into structural edit scripts
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Core reactive primitives, scopes and the runtime
//! - `graph`: Dependency graph storage and staleness propagation
//! - `reconcile`: Keyed diffing of sequences
//! - `config`: Runtime settings
//! - `error`: Error types
//!
//! Everything reactive hangs off an explicit [`Runtime`]. Runtimes are
//! single-threaded and independent of each other.
//!
//! # Example
//!
//! ```rust
//! use weft_core::Runtime;
//!
//! let rt = Runtime::new();
//!
//! // Create a signal
//! let (count, set_count) = rt.create_signal(0);
//!
//! // Create a derived value
//! let doubled = rt.create_memo({
//!     let count = count.clone();
//!     move || count.get() * 2
//! });
//!
//! // Create an effect
//! rt.create_effect({
//!     let (count, doubled) = (count.clone(), doubled.clone());
//!     move || println!("Count: {}, Doubled: {}", count.get(), doubled.get())
//! });
//!
//! // Update the signal
//! set_count.set(5);
//! // Effect automatically runs, prints: "Count: 5, Doubled: 10"
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;
pub mod reconcile;

pub use config::RuntimeConfig;
pub use error::{ReactiveError, Result};
pub use reactive::{Cleanup, Effect, Memo, ReadSignal, Runtime, Scope, Signal, WriteSignal};
pub use reconcile::{has_changes, reconcile, reconcile_by, Op, ReconcileResult, Reconciler};
