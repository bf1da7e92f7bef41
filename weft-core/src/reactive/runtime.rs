//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects signals, memos, and
//! effects. It owns the dependency graph, the ownership tree, the tracking
//! context and the batch queue, and schedules updates when signals change.
//!
//! # How It Works
//!
//! 1. When a signal, memo or effect is created, it registers a node with
//!    the runtime, owned by the current scope.
//!
//! 2. When a memo or effect reads a signal or memo, the runtime records a
//!    bidirectional edge between the two nodes.
//!
//! 3. When a signal's value changes, the runtime:
//!    a. Marks direct dependents dirty and everything downstream maybe-dirty
//!    b. Queues every effect it reached
//!    c. Drains the queue once the outermost batch closes
//!    d. Memos are lazy - they recompute on next access
//!
//! 4. Before a computation re-runs, its previous cleanup runs, whatever it
//!    created last time is disposed, and all its edges are dropped. The run
//!    then records its dependencies from scratch.
//!
//! # Threading
//!
//! A runtime is confined to the thread that created it. Several runtimes
//! may coexist; each is a completely separate graph.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use tracing::{debug, debug_span, trace, warn};

use crate::config::RuntimeConfig;
use crate::error::{panic_message, ReactiveError, Result};
use crate::graph::{DirtyState, Node, NodeId, NodeKind, UpdateScheduler};

use super::batch::BatchQueue;
use super::computation::IntoCleanup;
use super::context::ReactiveContext;
use super::effect::Effect;
use super::memo::Memo;
use super::owner::{Scope, ScopeContents, ScopeId, ScopeTree};
use super::signal::{ReadSignal, Signal, WriteSignal};

/// A panic caught while draining the batch queue.
pub(crate) struct FlushFailure {
    pub(crate) id: NodeId,
    pub(crate) payload: Box<dyn Any + Send>,
}

impl FlushFailure {
    /// Re-raise the original panic at the caller.
    ///
    /// A [`ReactiveError`] payload is raised again with its message, so the
    /// caller sees something readable instead of an opaque `Box<dyn Any>`.
    pub(crate) fn resume(self) -> ! {
        match self.payload.downcast::<ReactiveError>() {
            Ok(err) => panic!("{err}"),
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    pub(crate) fn into_error(self) -> ReactiveError {
        ReactiveError::from_panic(self.id, self.payload.as_ref())
    }
}

/// Shared state behind a [`Runtime`] handle.
pub(crate) struct RuntimeInner {
    pub(crate) config: RuntimeConfig,
    pub(crate) graph: RefCell<UpdateScheduler>,
    pub(crate) scopes: RefCell<ScopeTree>,
    pub(crate) context: ReactiveContext,
    pub(crate) queue: RefCell<BatchQueue>,
    /// Nodes whose last handle was dropped, waiting for a safe point.
    released: RefCell<Vec<NodeId>>,
}

/// Closes a batch when dropped, also while unwinding.
struct BatchGuard<'a> {
    runtime: &'a RuntimeInner,
    outermost: bool,
}

impl<'a> BatchGuard<'a> {
    fn enter(runtime: &'a RuntimeInner) -> Self {
        let depth = runtime.queue.borrow_mut().enter();
        Self {
            runtime,
            outermost: depth == 1,
        }
    }
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        let mut queue = self.runtime.queue.borrow_mut();
        let depth = queue.exit();
        if depth == 0 && std::thread::panicking() {
            let dropped = queue.clear();
            if dropped > 0 {
                warn!(dropped, "batch abandoned by a panic, pending computations discarded");
            }
        }
    }
}

impl RuntimeInner {
    fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            graph: RefCell::new(UpdateScheduler::new()),
            scopes: RefCell::new(ScopeTree::new()),
            context: ReactiveContext::new(),
            queue: RefCell::new(BatchQueue::new()),
            released: RefCell::new(Vec::new()),
        }
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    /// Add a node to the graph and hand it to its owner.
    pub(crate) fn insert_node(&self, node: Node) -> NodeId {
        let owner = node.owner();
        let kind = node.kind();
        let id = self.graph.borrow_mut().add_node(node);
        if let Some(owner) = owner {
            self.scopes.borrow_mut().adopt_node(owner, id);
        }
        trace!(node = %id, %kind, "node created");
        id
    }

    /// Create the private scope of a new computation.
    pub(crate) fn create_computation_scope(&self) -> ScopeId {
        let owner = self.context.current_owner();
        self.scopes.borrow_mut().create(owner)
    }

    /// Panic with `err`.
    ///
    /// Inside a computation the error itself is the payload, so the flush
    /// that catches it can hand it back unchanged from `try_*` calls.
    pub(crate) fn raise(&self, err: ReactiveError) -> ! {
        if self.context.in_computation() {
            panic::panic_any(err)
        }
        panic!("{err}")
    }

    /// Fail with [`ReactiveError::Disposed`] if the node is gone.
    pub(crate) fn ensure_live(&self, id: NodeId, kind: NodeKind) -> Result<()> {
        if self.graph.borrow().contains(id) {
            Ok(())
        } else {
            Err(ReactiveError::Disposed { kind, id })
        }
    }

    pub(crate) fn is_live(&self, id: NodeId) -> bool {
        self.graph.borrow().contains(id)
    }

    /// Record that the active computation, if any, read `source`.
    pub(crate) fn track(&self, source: NodeId) {
        if let Some(observer) = self.context.current_observer() {
            trace!(source = %source, observer = %observer, "dependency tracked");
            self.graph.borrow_mut().add_edge(source, observer);
        }
    }

    /// Mark everything downstream of `source` stale and queue the effects.
    ///
    /// Must be called inside a batch so the queue is drained afterwards.
    pub(crate) fn notify_changed(&self, source: NodeId) {
        debug_assert!(self.queue.borrow().is_batching());

        let dependents = self.graph.borrow().dependents_of(source);
        for dependent in dependents {
            let effects = self
                .graph
                .borrow_mut()
                .mark_stale(dependent, DirtyState::Dirty);
            let mut queue = self.queue.borrow_mut();
            for effect in effects {
                queue.push(effect);
            }
        }
    }

    /// Force a computation to run on the next flush.
    pub(crate) fn schedule(&self, id: NodeId) {
        if let Some(node) = self.graph.borrow_mut().get_node_mut(id) {
            node.mark_dirty();
        }
        self.queue.borrow_mut().push(id);
    }

    // ------------------------------------------------------------------
    // Refreshing computations
    // ------------------------------------------------------------------

    /// Bring a computation up to date.
    ///
    /// A `MaybeDirty` node first refreshes the memos it depends on, in the
    /// order it read them. If one of them changed, it is now `Dirty` and
    /// runs; otherwise it is clean without running.
    pub(crate) fn refresh(&self, id: NodeId) {
        let state = self.graph.borrow().dirty_state(id);
        match state {
            None | Some(DirtyState::Clean) => return,
            Some(DirtyState::Dirty) => {}
            Some(DirtyState::MaybeDirty) => {
                let dependencies = self.graph.borrow().dependencies_of(id);
                for dependency in dependencies {
                    if self.graph.borrow().kind(dependency) == Some(NodeKind::Memo) {
                        self.refresh(dependency);
                    }
                    if self.graph.borrow().dirty_state(id) == Some(DirtyState::Dirty) {
                        break;
                    }
                }
            }
        }

        let dirty = self.graph.borrow().dirty_state(id) == Some(DirtyState::Dirty);
        if dirty {
            self.update(id);
        } else if let Some(node) = self.graph.borrow_mut().get_node_mut(id) {
            node.mark_clean();
        }
    }

    /// Re-run a computation unconditionally.
    fn update(&self, id: NodeId) {
        let (computation, scope) = {
            let mut graph = self.graph.borrow_mut();
            let Some(node) = graph.get_node_mut(id) else {
                return;
            };
            // Clean before running, so a write to one of its own inputs
            // during the run marks it dirty again.
            node.mark_clean();
            (node.computation(), node.scope())
        };
        let Some(computation) = computation else {
            return;
        };

        // Tear down what the previous run left behind
        computation.cleanup();
        if let Some(scope) = scope {
            self.reset_scope(scope);
        }
        if !self.is_live(id) {
            return;
        }
        self.graph.borrow_mut().clear_dependencies(id);

        let outcome = {
            let _frame = self.context.enter(Some(id), scope);
            panic::catch_unwind(AssertUnwindSafe(|| computation.run()))
        };

        match outcome {
            Ok(true) => self.notify_changed(id),
            Ok(false) => {}
            Err(payload) => {
                // A memo that failed keeps its old value and retries on the
                // next read.
                if let Some(node) = self.graph.borrow_mut().get_node_mut(id) {
                    if node.kind() == NodeKind::Memo {
                        node.mark_dirty();
                    }
                }
                panic::resume_unwind(payload);
            }
        }
    }

    // ------------------------------------------------------------------
    // Batching
    // ------------------------------------------------------------------

    /// Run `f` inside a batch. The outermost batch drains the queue before
    /// returning.
    ///
    /// Panics raised by `f` itself propagate. Panics raised by queued
    /// computations are caught one by one and the first is handed back.
    pub(crate) fn run_batch<R>(&self, f: impl FnOnce() -> R) -> (R, Option<FlushFailure>) {
        let guard = BatchGuard::enter(self);
        let value = f();
        let outermost = guard.outermost;
        let failure = if outermost { self.flush() } else { None };
        drop(guard);

        if outermost {
            self.sweep_released();
        }
        (value, failure)
    }

    /// Drain the queue in first-scheduled order.
    fn flush(&self) -> Option<FlushFailure> {
        let span = debug_span!("flush", runtime = %self.config.label);
        let _entered = span.enter();

        let threshold = self.config.flush_warn_threshold;
        let mut ran = 0usize;
        let mut failure: Option<FlushFailure> = None;

        loop {
            let next = self.queue.borrow_mut().pop();
            let Some(id) = next else {
                break;
            };

            ran += 1;
            if ran == threshold.saturating_add(1) {
                warn!(
                    threshold,
                    "flush exceeded its computation budget; effects may be feeding their own inputs"
                );
            }

            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| self.refresh(id))) {
                warn!(
                    node = %id,
                    message = %panic_message(payload.as_ref()),
                    "computation panicked during flush"
                );
                if failure.is_none() {
                    failure = Some(FlushFailure { id, payload });
                }
            }
        }

        if ran > 0 {
            debug!(ran, failed = failure.is_some(), "flush complete");
        }
        failure
    }

    // ------------------------------------------------------------------
    // Disposal
    // ------------------------------------------------------------------

    /// Dispose a scope and everything it owns. Idempotent.
    pub(crate) fn dispose_scope(&self, id: ScopeId) {
        let contents = self.scopes.borrow_mut().remove(id);
        if let Some(contents) = contents {
            debug!(scope = %id, "scope disposed");
            self.dispose_contents(contents);
        }
    }

    /// Dispose everything a scope owns but keep the scope itself.
    fn reset_scope(&self, id: ScopeId) {
        let contents = self.scopes.borrow_mut().take_contents(id);
        if let Some(contents) = contents {
            self.dispose_contents(contents);
        }
    }

    fn dispose_contents(&self, contents: ScopeContents) {
        for child in contents.children {
            self.dispose_scope(child);
        }
        for node in contents.nodes {
            self.dispose_node(node);
        }
        for cleanup in contents.cleanups {
            cleanup();
        }
    }

    /// Remove a node from the graph. Idempotent.
    pub(crate) fn dispose_node(&self, id: NodeId) {
        let node = self.graph.borrow_mut().remove_node(id);
        let Some(node) = node else {
            return;
        };
        trace!(node = %id, kind = %node.kind(), "node disposed");

        if let Some(owner) = node.owner() {
            self.scopes.borrow_mut().release_node(owner, id);
        }
        if let Some(computation) = node.computation() {
            computation.dispose();
        }
        if let Some(scope) = node.scope() {
            self.dispose_scope(scope);
        }
        // The body (and whatever its closure captured) drops here, with no
        // borrow of the graph held.
        drop(node);
    }

    pub(crate) fn add_cleanup(&self, scope: ScopeId, cleanup: Box<dyn FnOnce()>) -> Result<()> {
        self.scopes
            .borrow_mut()
            .add_cleanup(scope, cleanup)
            .map_err(|_| ReactiveError::ScopeDisposed(scope))
    }

    /// Called when the last handle to a signal or memo is dropped.
    pub(crate) fn release(&self, id: NodeId) {
        match self.released.try_borrow_mut() {
            Ok(mut released) => released.push(id),
            Err(_) => return,
        }
        let idle = self
            .queue
            .try_borrow()
            .map(|queue| !queue.is_batching())
            .unwrap_or(false);
        if idle {
            self.sweep_released();
        }
    }

    /// Remove released nodes, unless the graph is busy.
    fn sweep_released(&self) {
        loop {
            if self.graph.try_borrow_mut().is_err() || self.scopes.try_borrow_mut().is_err() {
                return;
            }
            let next = match self.released.try_borrow_mut() {
                Ok(mut released) => released.pop(),
                Err(_) => return,
            };
            let Some(id) = next else {
                return;
            };
            self.dispose_node(id);
        }
    }
}

/// A handle to one reactive runtime.
///
/// The runtime is an explicit context object: every signal, memo, effect
/// and scope is created through it and belongs to it. Cloning the handle
/// is cheap and shares the runtime.
///
/// # Example
///
/// ```rust
/// use weft_core::reactive::Runtime;
///
/// let rt = Runtime::new();
/// let (count, set_count) = rt.create_signal(0);
///
/// let doubled = rt.create_memo({
///     let count = count.clone();
///     move || count.get() * 2
/// });
///
/// rt.create_effect({
///     let doubled = doubled.clone();
///     move || println!("doubled: {}", doubled.get())
/// });
///
/// set_count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    /// Create a runtime with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a runtime with the given configuration.
    pub fn with_config(config: RuntimeConfig) -> Self {
        debug!(label = %config.label, "runtime created");
        Self {
            inner: Rc::new(RuntimeInner::new(config)),
        }
    }

    pub(crate) fn upgrade(weak: &Weak<RuntimeInner>) -> Result<Self> {
        weak.upgrade()
            .map(|inner| Self { inner })
            .ok_or(ReactiveError::RuntimeDropped)
    }

    pub(crate) fn downgrade(&self) -> Weak<RuntimeInner> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn inner(&self) -> &RuntimeInner {
        &self.inner
    }

    /// The configuration this runtime was created with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    // ------------------------------------------------------------------
    // Primitives
    // ------------------------------------------------------------------

    /// Create a signal and return its read and write halves.
    pub fn create_signal<T>(&self, initial: T) -> (ReadSignal<T>, WriteSignal<T>)
    where
        T: Clone + PartialEq + 'static,
    {
        Signal::new(self, initial).split()
    }

    /// Create a signal as a single read-write handle.
    pub fn signal<T>(&self, initial: T) -> Signal<T>
    where
        T: Clone + PartialEq + 'static,
    {
        Signal::new(self, initial)
    }

    /// Create an effect and run it once.
    ///
    /// The body may return a [`Cleanup`](super::Cleanup) that runs before
    /// the next run and when the effect is disposed. A panic during this
    /// first run propagates to the caller.
    pub fn create_effect<F, R>(&self, f: F) -> Effect
    where
        F: FnMut() -> R + 'static,
        R: IntoCleanup,
    {
        Effect::new(self, f)
    }

    /// Create a memo and compute its first value.
    pub fn create_memo<T, F>(&self, f: F) -> Memo<T>
    where
        T: Clone + PartialEq + 'static,
        F: Fn() -> T + 'static,
    {
        Memo::new(self, f)
    }

    // ------------------------------------------------------------------
    // Batching and tracking
    // ------------------------------------------------------------------

    /// Run `f` with notifications deferred until it returns.
    ///
    /// Values are written immediately; affected effects run once each after
    /// the outermost batch closes. If one of them panics, the others still
    /// run and the first panic is re-raised here.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        let (value, failure) = self.inner.run_batch(f);
        if let Some(failure) = failure {
            failure.resume();
        }
        value
    }

    /// Like [`batch`](Self::batch), but reports a panicking computation as
    /// [`ReactiveError::ComputationPanicked`].
    pub fn try_batch<R>(&self, f: impl FnOnce() -> R) -> Result<R> {
        let (value, failure) = self.inner.run_batch(f);
        match failure {
            Some(failure) => Err(failure.into_error()),
            None => Ok(value),
        }
    }

    /// Whether a batch is currently open.
    pub fn is_batching(&self) -> bool {
        self.inner.queue.borrow().is_batching()
    }

    /// Run `f` without recording any reads as dependencies.
    pub fn untrack<R>(&self, f: impl FnOnce() -> R) -> R {
        let _frame = self.inner.context.untracked();
        f()
    }

    /// Whether a computation is currently recording reads.
    pub fn is_tracking(&self) -> bool {
        self.inner.context.is_active()
    }

    // ------------------------------------------------------------------
    // Ownership
    // ------------------------------------------------------------------

    /// Create a scope owned by the current scope, if any.
    pub fn create_scope(&self) -> Scope {
        let owner = self.inner.context.current_owner();
        let id = self.inner.scopes.borrow_mut().create(owner);
        Scope::new(id, self.downgrade())
    }

    /// Create a scope with no parent.
    pub fn create_root(&self) -> Scope {
        let id = self.inner.scopes.borrow_mut().create(None);
        Scope::new(id, self.downgrade())
    }

    /// The scope currently adopting new nodes, if any.
    pub fn current_scope(&self) -> Option<Scope> {
        self.inner
            .context
            .current_owner()
            .map(|id| Scope::new(id, self.downgrade()))
    }

    /// Run `f` with `scope` as the owner of anything it creates.
    ///
    /// Reads inside `f` are not tracked by any enclosing computation.
    pub fn run_in_scope<R>(&self, scope: &Scope, f: impl FnOnce() -> R) -> Result<R> {
        let id = scope.id();
        if !self.inner.scopes.borrow().contains(id) {
            return Err(ReactiveError::ScopeDisposed(id));
        }
        let _frame = self.inner.context.enter(None, Some(id));
        Ok(f())
    }

    /// Register a callback on the current scope.
    ///
    /// Inside a memo or effect this is the computation's own scope, so the
    /// callback runs before the next run. Returns `false` (and drops the
    /// callback) when there is no current scope.
    pub fn on_cleanup<F>(&self, cleanup: F) -> bool
    where
        F: FnOnce() + 'static,
    {
        let Some(owner) = self.inner.context.current_owner() else {
            debug!("on_cleanup called outside any scope, callback dropped");
            return false;
        };
        self.inner.add_cleanup(owner, Box::new(cleanup)).is_ok()
    }

    /// Dispose every scope and node of this runtime.
    ///
    /// Handles stay valid as values but report
    /// [`ReactiveError::Disposed`] from then on.
    pub fn dispose(&self) {
        let roots = self.inner.scopes.borrow().roots();
        for root in roots {
            self.inner.dispose_scope(root);
        }
        let remaining = self.inner.graph.borrow().node_ids();
        for id in remaining {
            self.inner.dispose_node(id);
        }
        let dropped = self.inner.queue.borrow_mut().clear();
        debug!(dropped, "runtime disposed");
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Number of live nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.inner.graph.borrow().node_count()
    }

    /// Number of live scopes.
    pub fn scope_count(&self) -> usize {
        self.inner.scopes.borrow().len()
    }

    /// Number of computations waiting for the current batch to close.
    pub fn pending_count(&self) -> usize {
        self.inner.queue.borrow().len()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("label", &self.inner.config.label)
            .field("node_count", &self.node_count())
            .field("scope_count", &self.scope_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn batch_defers_until_outermost_closes() {
        let rt = Runtime::new();
        let signal = rt.signal(0);
        let runs = Rc::new(Cell::new(0));

        rt.create_effect({
            let signal = signal.clone();
            let runs = runs.clone();
            move || {
                signal.get();
                runs.set(runs.get() + 1);
            }
        });
        assert_eq!(runs.get(), 1);

        rt.batch(|| {
            signal.set(1);
            rt.batch(|| signal.set(2));
            assert_eq!(runs.get(), 1);
            assert_eq!(rt.pending_count(), 1);
        });

        assert_eq!(runs.get(), 2);
        assert!(!rt.is_batching());
    }

    #[test]
    fn batch_returns_value() {
        let rt = Runtime::new();
        assert_eq!(rt.batch(|| 42), 42);
        assert_eq!(rt.try_batch(|| "ok"), Ok("ok"));
    }

    #[test]
    fn panicking_batch_restores_depth_and_drops_pending() {
        let rt = Runtime::new();
        let signal = rt.signal(0);
        let runs = Rc::new(Cell::new(0));

        rt.create_effect({
            let signal = signal.clone();
            let runs = runs.clone();
            move || {
                signal.get();
                runs.set(runs.get() + 1);
            }
        });

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            rt.batch(|| {
                signal.set(1);
                panic!("abandon");
            })
        }));

        assert!(result.is_err());
        assert!(!rt.is_batching());
        assert_eq!(rt.pending_count(), 0);
        assert_eq!(runs.get(), 1);

        // The value was written; later writes still propagate
        assert_eq!(signal.get_untracked(), 1);
        signal.set(2);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn untrack_hides_reads() {
        let rt = Runtime::new();
        let signal = rt.signal(1);
        let runs = Rc::new(Cell::new(0));

        rt.create_effect({
            let rt = rt.clone();
            let signal = signal.clone();
            let runs = runs.clone();
            move || {
                assert!(rt.is_tracking());
                rt.untrack(|| signal.get());
                runs.set(runs.get() + 1);
            }
        });

        signal.set(2);
        assert_eq!(runs.get(), 1);
        assert!(!rt.is_tracking());
    }

    #[test]
    fn run_in_scope_rejects_disposed_scope() {
        let rt = Runtime::new();
        let scope = rt.create_root();
        scope.dispose();

        assert_eq!(
            rt.run_in_scope(&scope, || ()),
            Err(ReactiveError::ScopeDisposed(scope.id()))
        );
    }

    #[test]
    fn on_cleanup_needs_a_scope() {
        let rt = Runtime::new();
        assert!(!rt.on_cleanup(|| {}));

        let scope = rt.create_root();
        let registered = rt.run_in_scope(&scope, || rt.on_cleanup(|| {})).unwrap();
        assert!(registered);
    }

    #[test]
    fn dispose_tears_down_everything() {
        let rt = Runtime::new();
        let signal = rt.signal(0);
        let scope = rt.create_root();
        let cleaned = Rc::new(Cell::new(false));

        rt.run_in_scope(&scope, || {
            let cleaned = cleaned.clone();
            rt.on_cleanup(move || cleaned.set(true));
        })
        .unwrap();
        rt.create_effect({
            let signal = signal.clone();
            move || {
                signal.get();
            }
        });

        rt.dispose();

        assert!(cleaned.get());
        assert_eq!(rt.node_count(), 0);
        assert_eq!(rt.scope_count(), 0);
        assert!(signal.try_get().is_err());
    }

    #[test]
    fn dropped_handles_release_their_nodes() {
        let rt = Runtime::new();
        let signal = rt.signal(0);
        let memo = rt.create_memo({
            let signal = signal.clone();
            move || signal.get() + 1
        });
        assert_eq!(rt.node_count(), 2);

        drop(memo);
        assert_eq!(rt.node_count(), 1);

        drop(signal);
        assert_eq!(rt.node_count(), 0);
    }

    #[test]
    fn runtimes_are_independent() {
        let a = Runtime::new();
        let b = Runtime::new();
        let signal = a.signal(1);
        let runs = Rc::new(Cell::new(0));

        b.create_effect({
            let signal = signal.clone();
            let runs = runs.clone();
            move || {
                // Read through a foreign runtime: not tracked by `b`
                signal.get();
                runs.set(runs.get() + 1);
            }
        });

        signal.set(2);
        assert_eq!(runs.get(), 1);
        assert_eq!(b.node_count(), 1);
    }

    #[test]
    fn handles_report_dropped_runtime() {
        let rt = Runtime::new();
        let signal = rt.signal(3);
        drop(rt);

        assert_eq!(signal.try_get(), Err(ReactiveError::RuntimeDropped));
    }
}
