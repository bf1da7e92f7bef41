//! Memo Implementation
//!
//! A Memo is a cached derived value that re-evaluates only when its
//! dependencies change.
//!
//! # How Memos Work
//!
//! 1. On creation, the memo runs its computation and caches the result.
//!
//! 2. When accessed again, if no dependencies have changed, returns cached value.
//!
//! 3. When a signal it reads changes, the memo is marked "dirty"; memos
//!    further downstream are marked "maybe dirty".
//!
//! 4. On next access, a maybe-dirty memo re-checks whether its memo inputs
//!    actually changed.
//!
//! 5. If inputs changed, recompute. Otherwise, mark clean and return cache.
//!
//! # Why This Matters
//!
//! This "lazy" approach avoids unnecessary recomputation:
//!
//! - A signal changes
//! - 10 memos depend on it
//! - Only the memos actually accessed will recompute
//! - Memos that are never read stay dirty (no wasted work)
//!
//! A recomputed value equal to the cached one does not propagate: effects
//! downstream see a clean input and are not re-run.

use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use crate::error::{ReactiveError, Result};
use crate::graph::{Body, DirtyState, Node, NodeId, NodeKind};

use super::computation::Computation;
use super::runtime::{FlushFailure, Runtime, RuntimeInner};

/// Storage shared by every handle of one memo.
struct MemoState<T> {
    id: NodeId,
    runtime: Weak<RuntimeInner>,
    compute: Box<dyn Fn() -> T>,
    /// The cached value (None until the first run completes).
    value: RefCell<Option<T>>,
}

impl<T: PartialEq> Computation for MemoState<T> {
    fn run(&self) -> bool {
        let next = (self.compute)();
        // Runs are always under catch_unwind; the flush turns this payload
        // back into the error.
        let Ok(mut value) = self.value.try_borrow_mut() else {
            panic::panic_any(ReactiveError::ReentrantWrite {
                kind: NodeKind::Memo,
                id: self.id,
            })
        };
        if value.as_ref() == Some(&next) {
            return false;
        }
        *value = Some(next);
        true
    }
}

impl<T> Drop for MemoState<T> {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.release(self.id);
        }
    }
}

/// A cached derived value that recomputes only when dependencies change.
///
/// # Type Parameters
///
/// - `T`: The type of the computed value. Must be Clone + PartialEq.
///
/// The PartialEq bound is needed to detect when the computed value actually
/// changed (some memos might return the same value even if inputs changed).
///
/// # Example
///
/// ```rust
/// use weft_core::reactive::Runtime;
///
/// let rt = Runtime::new();
/// let items = rt.signal(vec![1, 2, 3]);
/// let total = rt.create_memo({
///     let items = items.clone();
///     move || items.with(|items| items.iter().sum::<i32>())
/// });
///
/// items.update(|items| {
///     let mut next = items.clone();
///     next.push(4);
///     next
/// });
/// assert_eq!(total.get(), 10);
/// ```
pub struct Memo<T> {
    state: Rc<MemoState<T>>,
}

impl<T> Memo<T>
where
    T: Clone + PartialEq + 'static,
{
    pub(crate) fn new<F>(runtime: &Runtime, compute: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        let inner = runtime.inner();
        let owner = inner.context.current_owner();
        let scope = inner.create_computation_scope();

        let mut node = Node::memo().with_owner(owner).with_scope(scope);
        let id = node.id();
        let state = Rc::new(MemoState {
            id,
            runtime: runtime.downgrade(),
            compute: Box::new(compute),
            value: RefCell::new(None),
        });

        // The graph only holds the memo weakly; its handles own it
        let computation: Rc<dyn Computation> = state.clone();
        node.set_body(Body::Held(Rc::downgrade(&computation)));
        drop(computation);
        inner.insert_node(node);

        let memo = Self { state };
        if let Err(failure) = memo.refresh() {
            failure.resume();
        }
        memo
    }

    /// Get the memo's unique ID.
    pub fn id(&self) -> NodeId {
        self.state.id
    }

    fn runtime(&self) -> Result<Runtime> {
        let runtime = Runtime::upgrade(&self.state.runtime)?;
        runtime.inner().ensure_live(self.state.id, NodeKind::Memo)?;
        Ok(runtime)
    }

    /// Bring the cached value up to date.
    fn refresh(&self) -> std::result::Result<(), FlushFailure> {
        let Ok(runtime) = Runtime::upgrade(&self.state.runtime) else {
            return Ok(());
        };
        let inner = runtime.inner();
        let id = self.state.id;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            inner.run_batch(|| inner.refresh(id))
        }));
        match outcome {
            Ok(((), None)) => Ok(()),
            Ok(((), Some(failure))) => Err(failure),
            Err(payload) => Err(FlushFailure { id, payload }),
        }
    }

    /// Read the value by reference, recomputing first if needed.
    ///
    /// If called within a reactive context, this also registers the
    /// current computation as a dependent.
    ///
    /// The cached value stays borrowed while `f` runs. If `f` writes an
    /// input and an effect then pulls this memo, the recomputation cannot
    /// store its result and the write reports
    /// [`ReactiveError::ReentrantWrite`]. The memo stays dirty and the
    /// next read recomputes it.
    pub fn try_with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        let runtime = self.runtime()?;
        self.refresh().map_err(FlushFailure::into_error)?;
        // Subscribe after refreshing, so the reader is not marked stale by
        // the memo's own recomputation
        runtime.inner().track(self.state.id);
        Ok(self.read(f))
    }

    /// Get the current value, recomputing first if needed.
    pub fn try_get(&self) -> Result<T> {
        self.try_with(T::clone)
    }

    /// Read the value by reference. See [`get`](Self::get).
    ///
    /// Writing one of the memo's inputs from `f` is only safe while nothing
    /// pulls the memo before `f` returns. See [`try_with`](Self::try_with).
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let runtime = self.runtime().unwrap_or_else(|err| panic!("{err}"));
        if let Err(failure) = self.refresh() {
            failure.resume();
        }
        runtime.inner().track(self.state.id);
        self.read(f)
    }

    /// Get the current value.
    ///
    /// If the memo is dirty, it will recompute first.
    ///
    /// # Panics
    ///
    /// Panics if the memo was disposed, and re-raises a panic from the
    /// computation. The cached value is kept and the next read retries.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Get the current value without tracking dependencies.
    ///
    /// Still recomputes if the memo is stale.
    pub fn get_untracked(&self) -> T {
        self.with_untracked(T::clone)
    }

    /// Read the value by reference without tracking dependencies.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        if let Err(err) = self.runtime() {
            panic!("{err}");
        }
        if let Err(failure) = self.refresh() {
            failure.resume();
        }
        self.read(f)
    }

    fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let value = self.state.value.borrow();
        let value = value
            .as_ref()
            .expect("memo value is computed on creation");
        f(value)
    }

    /// Get the current dirty state, or `None` once disposed.
    pub fn state(&self) -> Option<DirtyState> {
        let runtime = Runtime::upgrade(&self.state.runtime).ok()?;
        let state = runtime.inner().graph.borrow().dirty_state(self.state.id);
        state
    }

    /// Get the number of computations that read the memo in their most
    /// recent run.
    pub fn dependent_count(&self) -> usize {
        let Ok(runtime) = Runtime::upgrade(&self.state.runtime) else {
            return 0;
        };
        let count = runtime.inner().graph.borrow().dependents_of(self.state.id).len();
        count
    }

    /// Check if the memo has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.runtime().is_err()
    }

    /// Dispose the memo.
    ///
    /// Dependents keep their last value; further reads through any handle
    /// return [`ReactiveError::Disposed`](crate::error::ReactiveError).
    pub fn dispose(&self) {
        if let Ok(runtime) = Runtime::upgrade(&self.state.runtime) {
            runtime.inner().dispose_node(self.state.id);
        }
    }
}

impl<T> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Memo");
        debug.field("id", &self.state.id);
        match self.state.value.try_borrow() {
            Ok(value) => debug.field("value", &*value),
            Err(_) => debug.field("value", &format_args!("<borrowed>")),
        };
        debug.finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
