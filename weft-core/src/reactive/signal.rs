//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a reactive context (memo/effect), the
//!    runtime records an edge from the signal to that computation.
//!
//! 2. When a signal's value changes, every dependent is marked stale and
//!    the affected effects are queued.
//!
//! 3. Writes that store an equal value notify nobody.
//!
//! # Handles
//!
//! [`Signal`] is the combined read-write handle. [`ReadSignal`] and
//! [`WriteSignal`] split it into halves that can be passed to different
//! owners. All handles to one signal share the same cell; when the last
//! one is dropped the signal leaves the graph.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::error::{ReactiveError, Result};
use crate::graph::{Node, NodeId, NodeKind};

use super::runtime::{FlushFailure, Runtime, RuntimeInner};

/// Storage shared by every handle of one signal.
struct SignalCell<T> {
    id: NodeId,
    runtime: Weak<RuntimeInner>,
    value: RefCell<T>,
}

impl<T> Drop for SignalCell<T> {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.release(self.id);
        }
    }
}

/// A reactive signal holding a value of type T.
///
/// # Example
///
/// ```rust
/// use weft_core::reactive::Runtime;
///
/// let rt = Runtime::new();
/// let count = rt.signal(0);
///
/// count.set(5);
/// count.update(|n| n + 1);
/// assert_eq!(count.get(), 6);
/// ```
pub struct Signal<T> {
    cell: Rc<SignalCell<T>>,
}

impl<T> Signal<T>
where
    T: Clone + PartialEq + 'static,
{
    pub(crate) fn new(runtime: &Runtime, value: T) -> Self {
        let inner = runtime.inner();
        let node = Node::signal().with_owner(inner.context.current_owner());
        let id = inner.insert_node(node);

        Self {
            cell: Rc::new(SignalCell {
                id,
                runtime: runtime.downgrade(),
                value: RefCell::new(value),
            }),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> NodeId {
        self.cell.id
    }

    /// Runtime handle, provided the signal is still part of it.
    fn live_runtime(&self) -> Result<Runtime> {
        let runtime = Runtime::upgrade(&self.cell.runtime)?;
        runtime.inner().ensure_live(self.cell.id, NodeKind::Signal)?;
        Ok(runtime)
    }

    /// Read the value by reference, recording a dependency.
    ///
    /// The value stays borrowed while `f` runs. Writing this signal in
    /// that window fails with [`ReactiveError::ReentrantWrite`], whether
    /// the write comes from `f` or from an effect that `f` triggers.
    pub fn try_with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        let runtime = self.live_runtime()?;
        runtime.inner().track(self.cell.id);
        Ok(f(&self.cell.value.borrow()))
    }

    /// Read the value by reference without recording a dependency.
    pub fn try_with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        self.live_runtime()?;
        Ok(f(&self.cell.value.borrow()))
    }

    /// Get the current value, recording a dependency.
    pub fn try_get(&self) -> Result<T> {
        self.try_with(T::clone)
    }

    /// Get the current value.
    ///
    /// If called within a reactive context, this also registers the
    /// current computation as a dependent.
    ///
    /// # Panics
    ///
    /// Panics if the signal was disposed or its runtime dropped.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Read the value by reference. See [`get`](Self::get).
    ///
    /// # Panics
    ///
    /// Panics if this signal is written before `f` returns, either by `f`
    /// itself or by an effect it triggers. See [`try_with`](Self::try_with).
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.try_with(f).unwrap_or_else(|err| panic!("{err}"))
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.with_untracked(T::clone)
    }

    /// Read the value by reference without tracking dependencies.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.try_with_untracked(f)
            .unwrap_or_else(|err| panic!("{err}"))
    }

    /// Store `value` and notify dependents if it differs from the current
    /// value.
    fn write(&self, value: T) -> Result<Option<FlushFailure>> {
        let runtime = self.live_runtime()?;

        let changed = {
            let Ok(mut current) = self.cell.value.try_borrow_mut() else {
                return Err(ReactiveError::ReentrantWrite {
                    kind: NodeKind::Signal,
                    id: self.cell.id,
                });
            };
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        };
        if !changed {
            trace!(signal = %self.cell.id, "write skipped, value unchanged");
            return Ok(None);
        }

        let inner = runtime.inner();
        let ((), failure) = inner.run_batch(|| inner.notify_changed(self.cell.id));
        Ok(failure)
    }

    /// Set a new value and notify dependents.
    ///
    /// Outside a batch, affected effects run before this returns.
    ///
    /// # Panics
    ///
    /// Panics if the signal was disposed or is being read through
    /// [`with`](Self::with), and re-raises the first panic of an effect
    /// this write triggered.
    pub fn set(&self, value: T) {
        match self.write(value) {
            Ok(None) => {}
            Ok(Some(failure)) => failure.resume(),
            Err(err) => match self.cell.runtime.upgrade() {
                Some(runtime) => runtime.raise(err),
                None => panic!("{err}"),
            },
        }
    }

    /// Like [`set`](Self::set), but reports failures as errors.
    pub fn try_set(&self, value: T) -> Result<()> {
        match self.write(value)? {
            Some(failure) => Err(failure.into_error()),
            None => Ok(()),
        }
    }

    /// Update the value using a function.
    ///
    /// This is useful for updates that depend on the current value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = self.with_untracked(f);
        self.set(next);
    }

    /// Like [`update`](Self::update), but reports failures as errors.
    pub fn try_update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&T) -> T,
    {
        let next = self.try_with_untracked(f)?;
        self.try_set(next)
    }

    /// Check if the signal has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.live_runtime().is_err()
    }

    /// Get the number of computations that read the signal in their most
    /// recent run.
    pub fn subscriber_count(&self) -> usize {
        let Ok(runtime) = Runtime::upgrade(&self.cell.runtime) else {
            return 0;
        };
        let count = runtime.inner().graph.borrow().dependents_of(self.cell.id).len();
        count
    }

    /// A read-only handle to the same signal.
    pub fn read_only(&self) -> ReadSignal<T> {
        ReadSignal(self.clone())
    }

    /// Split into read and write halves.
    pub fn split(self) -> (ReadSignal<T>, WriteSignal<T>) {
        (ReadSignal(self.clone()), WriteSignal(self))
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Signal");
        debug.field("id", &self.cell.id);
        match self.cell.value.try_borrow() {
            Ok(value) => debug.field("value", &*value),
            Err(_) => debug.field("value", &format_args!("<borrowed>")),
        };
        debug.finish()
    }
}

/// The read half of a signal.
pub struct ReadSignal<T>(Signal<T>);

impl<T> ReadSignal<T>
where
    T: Clone + PartialEq + 'static,
{
    /// Get the signal's unique ID.
    pub fn id(&self) -> NodeId {
        self.0.id()
    }

    /// Get the current value, recording a dependency.
    pub fn get(&self) -> T {
        self.0.get()
    }

    /// Read the value by reference, recording a dependency.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.0.with(f)
    }

    pub fn get_untracked(&self) -> T {
        self.0.get_untracked()
    }

    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.0.with_untracked(f)
    }

    pub fn try_get(&self) -> Result<T> {
        self.0.try_get()
    }

    pub fn try_with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        self.0.try_with(f)
    }

    pub fn is_disposed(&self) -> bool {
        self.0.is_disposed()
    }
}

impl<T> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: fmt::Debug> fmt::Debug for ReadSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadSignal").field(&self.0).finish()
    }
}

/// The write half of a signal.
pub struct WriteSignal<T>(Signal<T>);

impl<T> WriteSignal<T>
where
    T: Clone + PartialEq + 'static,
{
    /// Get the signal's unique ID.
    pub fn id(&self) -> NodeId {
        self.0.id()
    }

    /// Set a new value. See [`Signal::set`].
    pub fn set(&self, value: T) {
        self.0.set(value);
    }

    /// Update the value using a function. See [`Signal::update`].
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        self.0.update(f);
    }

    pub fn try_set(&self, value: T) -> Result<()> {
        self.0.try_set(value)
    }

    pub fn try_update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&T) -> T,
    {
        self.0.try_update(f)
    }

    pub fn is_disposed(&self) -> bool {
        self.0.is_disposed()
    }
}

impl<T> Clone for WriteSignal<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: fmt::Debug> fmt::Debug for WriteSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WriteSignal").field(&self.0).finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
