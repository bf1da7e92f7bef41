//! Computation types for the reactive system.
//!
//! A computation is any node that runs a body and reads reactive values
//! while doing so: memos and effects. The runtime only sees them through
//! the [`Computation`] trait.

use std::fmt;

/// The runnable part of a memo or effect.
///
/// The runtime takes care of dependency tracking, ownership and dirty
/// state. Implementations only run their body and manage whatever the body
/// leaves behind.
pub(crate) trait Computation {
    /// Run the body once.
    ///
    /// Returns `true` if the value observable by dependents changed.
    fn run(&self) -> bool;

    /// Invoke the cleanup left behind by the previous run, if any.
    fn cleanup(&self) {}

    /// Called once when the node is disposed, after which `run` is never
    /// called again.
    fn dispose(&self) {
        self.cleanup();
    }
}

/// A callback run before an effect re-runs and when it is disposed.
///
/// Return one from an effect body to release whatever the run acquired.
///
/// ```rust,ignore
/// rt.create_effect(move || {
///     let handle = listen(target.get());
///     Cleanup::new(move || handle.remove())
/// });
/// ```
pub struct Cleanup(Box<dyn FnOnce()>);

impl Cleanup {
    /// Wrap a callback.
    pub fn new<F>(cleanup: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self(Box::new(cleanup))
    }

    /// Invoke the callback.
    pub fn run(self) {
        (self.0)();
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cleanup(..)")
    }
}

/// Values an effect body may return.
pub trait IntoCleanup {
    /// Convert into the cleanup to store for the next run.
    fn into_cleanup(self) -> Option<Cleanup>;
}

impl IntoCleanup for () {
    fn into_cleanup(self) -> Option<Cleanup> {
        None
    }
}

impl IntoCleanup for Cleanup {
    fn into_cleanup(self) -> Option<Cleanup> {
        Some(self)
    }
}

impl IntoCleanup for Option<Cleanup> {
    fn into_cleanup(self) -> Option<Cleanup> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn cleanup_runs_callback() {
        let called = Rc::new(Cell::new(false));
        let called_clone = called.clone();

        let cleanup = Cleanup::new(move || called_clone.set(true));
        assert!(!called.get());

        cleanup.run();
        assert!(called.get());
    }

    #[test]
    fn unit_and_option_convert() {
        assert!(().into_cleanup().is_none());
        assert!(None::<Cleanup>.into_cleanup().is_none());
        assert!(Some(Cleanup::new(|| {})).into_cleanup().is_some());
        assert!(Cleanup::new(|| {}).into_cleanup().is_some());
    }
}
