//! Ownership Scopes
//!
//! Scopes group the nodes and cleanup callbacks created while they are the
//! current owner. Disposing a scope disposes everything it owns: child
//! scopes first, depth-first, then owned nodes, then its own cleanups.
//!
//! Every memo and effect gets a private child scope. Anything created
//! while its body runs lands there and is torn down before the next run.
//!
//! Disposal is idempotent. A disposed scope is removed from the tree, so
//! disposing it again (directly, or through a parent disposed later) finds
//! nothing to do.

use std::collections::HashMap;
use std::fmt;
use std::rc::Weak;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexSet;

use crate::error::Result;
use crate::graph::NodeId;

use super::runtime::{Runtime, RuntimeInner};

/// Unique identifier for an ownership scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u64);

impl ScopeId {
    /// Generate a new unique scope ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ScopeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type CleanupFn = Box<dyn FnOnce()>;

/// Bookkeeping for one live scope.
#[derive(Default)]
struct ScopeData {
    parent: Option<ScopeId>,
    children: IndexSet<ScopeId>,
    nodes: IndexSet<NodeId>,
    cleanups: Vec<CleanupFn>,
}

/// What a scope owned at the moment it was emptied.
#[derive(Default)]
pub(crate) struct ScopeContents {
    pub(crate) children: Vec<ScopeId>,
    pub(crate) nodes: Vec<NodeId>,
    pub(crate) cleanups: Vec<CleanupFn>,
}

/// All live scopes of a runtime.
#[derive(Default)]
pub(crate) struct ScopeTree {
    scopes: HashMap<ScopeId, ScopeData>,
}

impl ScopeTree {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Create a scope. A missing (already disposed) parent yields a root.
    pub(crate) fn create(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId::new();
        let parent = parent.filter(|parent| self.scopes.contains_key(parent));
        if let Some(parent) = parent.and_then(|parent| self.scopes.get_mut(&parent)) {
            parent.children.insert(id);
        }
        self.scopes.insert(
            id,
            ScopeData {
                parent,
                ..ScopeData::default()
            },
        );
        id
    }

    pub(crate) fn contains(&self, id: ScopeId) -> bool {
        self.scopes.contains_key(&id)
    }

    pub(crate) fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.scopes.get(&id).and_then(|scope| scope.parent)
    }

    /// Record `node` as owned by `scope`. Returns `false` if the scope is gone.
    pub(crate) fn adopt_node(&mut self, scope: ScopeId, node: NodeId) -> bool {
        match self.scopes.get_mut(&scope) {
            Some(data) => {
                data.nodes.insert(node);
                true
            }
            None => false,
        }
    }

    /// Forget a node that was disposed on its own.
    pub(crate) fn release_node(&mut self, scope: ScopeId, node: NodeId) {
        if let Some(data) = self.scopes.get_mut(&scope) {
            data.nodes.shift_remove(&node);
        }
    }

    /// Register a cleanup. Hands the callback back if the scope is gone.
    pub(crate) fn add_cleanup(
        &mut self,
        scope: ScopeId,
        cleanup: CleanupFn,
    ) -> std::result::Result<(), CleanupFn> {
        match self.scopes.get_mut(&scope) {
            Some(data) => {
                data.cleanups.push(cleanup);
                Ok(())
            }
            None => Err(cleanup),
        }
    }

    /// Empty a scope without removing it.
    pub(crate) fn take_contents(&mut self, id: ScopeId) -> Option<ScopeContents> {
        let data = self.scopes.get_mut(&id)?;
        Some(ScopeContents {
            children: std::mem::take(&mut data.children).into_iter().collect(),
            nodes: std::mem::take(&mut data.nodes).into_iter().collect(),
            cleanups: std::mem::take(&mut data.cleanups),
        })
    }

    /// Remove a scope, detaching it from its parent.
    ///
    /// Returns whatever it still owned so the caller can dispose it.
    pub(crate) fn remove(&mut self, id: ScopeId) -> Option<ScopeContents> {
        let data = self.scopes.remove(&id)?;
        if let Some(parent) = data.parent.and_then(|parent| self.scopes.get_mut(&parent)) {
            parent.children.shift_remove(&id);
        }
        Some(ScopeContents {
            children: data.children.into_iter().collect(),
            nodes: data.nodes.into_iter().collect(),
            cleanups: data.cleanups,
        })
    }

    /// Scopes without a parent, in no particular order.
    pub(crate) fn roots(&self) -> Vec<ScopeId> {
        self.scopes
            .iter()
            .filter(|(_, data)| data.parent.is_none())
            .map(|(id, _)| *id)
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.scopes.len()
    }
}

/// Handle to an ownership scope.
///
/// Cloning the handle does not clone the scope. Dropping every handle does
/// not dispose it either; disposal is always explicit (or cascades from a
/// parent).
#[derive(Clone)]
pub struct Scope {
    id: ScopeId,
    runtime: Weak<RuntimeInner>,
}

impl Scope {
    pub(crate) fn new(id: ScopeId, runtime: Weak<RuntimeInner>) -> Self {
        Self { id, runtime }
    }

    /// Get the scope's unique ID.
    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Dispose the scope and everything it owns.
    ///
    /// Calling this more than once, or after a parent was disposed, does
    /// nothing.
    pub fn dispose(&self) {
        if let Ok(runtime) = Runtime::upgrade(&self.runtime) {
            runtime.inner().dispose_scope(self.id);
        }
    }

    /// Check if the scope has been disposed.
    pub fn is_disposed(&self) -> bool {
        let Ok(runtime) = Runtime::upgrade(&self.runtime) else {
            return true;
        };
        let live = runtime.inner().scopes.borrow().contains(self.id);
        !live
    }

    /// The scope that owns this one, if it is still alive.
    pub fn parent(&self) -> Option<Scope> {
        let runtime = Runtime::upgrade(&self.runtime).ok()?;
        let parent = runtime.inner().scopes.borrow().parent(self.id);
        parent.map(|id| Scope::new(id, self.runtime.clone()))
    }

    /// Register a callback to run when this scope is disposed.
    pub fn on_cleanup<F>(&self, cleanup: F) -> Result<()>
    where
        F: FnOnce() + 'static,
    {
        let runtime = Runtime::upgrade(&self.runtime)?;
        runtime.inner().add_cleanup(self.id, Box::new(cleanup))
    }

    /// Run `f` with this scope as the owner. See [`Runtime::run_in_scope`].
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> Result<R> {
        let runtime = Runtime::upgrade(&self.runtime)?;
        runtime.run_in_scope(self, f)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
