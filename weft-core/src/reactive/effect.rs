//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. When any dependency changes, the effect is queued and re-runs once
//!    the outermost batch closes.
//!
//! 3. Before re-running, the effect runs the cleanup its last run returned,
//!    disposes whatever that run created, and clears its old dependencies.
//!    The new run tracks dependencies from scratch, so branches that were
//!    not taken stop triggering it.
//!
//! # Differences from Memo
//!
//! - Memos return a value; effects do not.
//! - Memos are pulled when read; effects are pushed when deps change.
//! - Nothing can depend on an effect.
//!
//! # Cleanup
//!
//! Effects can optionally return a [`Cleanup`]. It is called before the
//! effect re-runs and when the effect is disposed. This is useful for
//! releasing resources like event listeners or timers.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use crate::error::Result;
use crate::graph::{Body, Node, NodeId, NodeKind};

use super::computation::{Cleanup, Computation, IntoCleanup};
use super::runtime::{FlushFailure, Runtime, RuntimeInner};

type EffectFn = Box<dyn FnMut() -> Option<Cleanup>>;

/// The runnable part of an effect, owned by the graph.
struct EffectState {
    body: RefCell<EffectFn>,
    cleanup: RefCell<Option<Cleanup>>,
    disposed: Cell<bool>,
    run_count: Cell<usize>,
}

impl Computation for EffectState {
    fn run(&self) -> bool {
        let next = {
            let mut body = self.body.borrow_mut();
            (&mut *body)()
        };
        self.run_count.set(self.run_count.get() + 1);

        if self.disposed.get() {
            // Disposed by its own run: nobody will call cleanup later
            if let Some(cleanup) = next {
                cleanup.run();
            }
        } else {
            *self.cleanup.borrow_mut() = next;
        }
        false
    }

    fn cleanup(&self) {
        let cleanup = self.cleanup.borrow_mut().take();
        if let Some(cleanup) = cleanup {
            cleanup.run();
        }
    }

    fn dispose(&self) {
        self.disposed.set(true);
        self.cleanup();
    }
}

/// A side-effecting computation that runs when dependencies change.
///
/// Dropping the handle does not stop the effect. It lives until it is
/// disposed explicitly or its owner scope is disposed.
///
/// # Example
///
/// ```rust
/// use weft_core::reactive::Runtime;
///
/// let rt = Runtime::new();
/// let count = rt.signal(0);
///
/// let effect = rt.create_effect({
///     let count = count.clone();
///     move || println!("Count is: {}", count.get())
/// });
///
/// count.set(5); // Prints: "Count is: 5"
/// effect.dispose();
/// ```
#[derive(Clone)]
pub struct Effect {
    id: NodeId,
    runtime: Weak<RuntimeInner>,
    state: Rc<EffectState>,
}

impl Effect {
    pub(crate) fn new<F, R>(runtime: &Runtime, f: F) -> Self
    where
        F: FnMut() -> R + 'static,
        R: IntoCleanup,
    {
        let inner = runtime.inner();
        let owner = inner.context.current_owner();
        let scope = inner.create_computation_scope();

        let mut f = f;
        let state = Rc::new(EffectState {
            body: RefCell::new(Box::new(move || f().into_cleanup())),
            cleanup: RefCell::new(None),
            disposed: Cell::new(false),
            run_count: Cell::new(0),
        });

        let mut node = Node::effect().with_owner(owner).with_scope(scope);
        let computation: Rc<dyn Computation> = state.clone();
        node.set_body(Body::Owned(computation));
        let id = inner.insert_node(node);

        // Run immediately to establish dependencies
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            inner.run_batch(|| inner.refresh(id))
        }));
        match outcome {
            Ok(((), None)) => {}
            Ok(((), Some(failure))) => failure.resume(),
            Err(payload) => {
                // The caller never gets a handle, so nothing could dispose it
                inner.dispose_node(id);
                FlushFailure { id, payload }.resume();
            }
        }

        Self {
            id,
            runtime: runtime.downgrade(),
            state,
        }
    }

    /// Get the effect's unique ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Schedule the effect to re-run even though no dependency changed.
    ///
    /// Outside a batch the effect runs before this returns.
    pub fn run(&self) -> Result<()> {
        let runtime = Runtime::upgrade(&self.runtime)?;
        let inner = runtime.inner();
        inner.ensure_live(self.id, NodeKind::Effect)?;

        let ((), failure) = inner.run_batch(|| inner.schedule(self.id));
        match failure {
            Some(failure) => Err(failure.into_error()),
            None => Ok(()),
        }
    }

    /// Dispose of the effect.
    ///
    /// Runs the last cleanup, unsubscribes from every dependency and
    /// disposes everything the effect created. After disposal, the effect
    /// will not run again. Idempotent.
    pub fn dispose(&self) {
        if let Ok(runtime) = Runtime::upgrade(&self.runtime) {
            runtime.inner().dispose_node(self.id);
        }
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.state.disposed.get() || self.runtime.strong_count() == 0
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.state.run_count.get()
    }

    /// Get the number of dependencies read by the most recent run.
    pub fn dependency_count(&self) -> usize {
        let Ok(runtime) = Runtime::upgrade(&self.runtime) else {
            return 0;
        };
        let count = runtime.inner().graph.borrow().dependencies_of(self.id).len();
        count
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
