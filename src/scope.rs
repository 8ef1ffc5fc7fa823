//! Nested lifetime scopes that release the resources they hand out.
//!
//! A [`LifetimeScope`] is the unit of "checked out": every resource a scope
//! acquires through a scope-owned policy is released when the scope ends,
//! either through [`end`](LifetimeScope::end) or when the scope is dropped.
//! Nested scopes borrow their parent, so the borrow checker guarantees a
//! nested scope ends before the scope it was created from.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::internal::ReleaseBag;
use crate::ledger::ResourceLedger;
use crate::resource::SharedResource;
use crate::traits::{Release, ResourceSource};

/// Identifies the source a per-scope instance was cached for.
pub type ScopeSlot = u64;

/// Scoped owner of tracked resources.
///
/// # Examples
///
/// ```
/// use scope_probe::{LifecyclePolicy, LifetimeScope, PolicySource, ResourceLedger};
///
/// let ledger = ResourceLedger::new_shared();
/// let source = PolicySource::new(LifecyclePolicy::PerScope, ledger.clone());
/// let root = LifetimeScope::root(ledger.clone());
///
/// {
///     let inner = root.begin_nested();
///     let resource = inner.resolve(&source);
///     resource.perform_operation().unwrap();
///     assert_eq!(ledger.snapshot().undisposed, 1);
/// } // inner scope ends here
///
/// assert!(ledger.snapshot().is_quiescent());
/// ```
pub struct LifetimeScope<'p> {
    ledger: Arc<ResourceLedger>,
    parent: Option<&'p LifetimeScope<'p>>,
    depth: usize,
    scoped: Mutex<HashMap<ScopeSlot, SharedResource>>,
    releases: Mutex<ReleaseBag>,
    ended: AtomicBool,
}

impl LifetimeScope<'static> {
    /// Creates an outermost scope recording into `ledger`.
    pub fn root(ledger: Arc<ResourceLedger>) -> Self {
        LifetimeScope {
            ledger,
            parent: None,
            depth: 0,
            scoped: Mutex::new(HashMap::new()),
            releases: Mutex::new(ReleaseBag::default()),
            ended: AtomicBool::new(false),
        }
    }
}

impl<'p> LifetimeScope<'p> {
    /// Begins a child scope with its own per-scope instances.
    pub fn begin_nested(&self) -> LifetimeScope<'_> {
        tracing::trace!(depth = self.depth + 1, "lifetime scope begun");
        LifetimeScope {
            ledger: Arc::clone(&self.ledger),
            parent: Some(self),
            depth: self.depth + 1,
            scoped: Mutex::new(HashMap::new()),
            releases: Mutex::new(ReleaseBag::default()),
            ended: AtomicBool::new(false),
        }
    }

    /// Acquires a resource from `source` for use inside this scope.
    pub fn resolve<S>(&self, source: &S) -> SharedResource
    where
        S: ResourceSource + ?Sized,
    {
        source.acquire(self)
    }

    /// Returns the instance cached for `slot`, creating and tracking it on first use.
    pub fn get_or_create_scoped<F>(&self, slot: ScopeSlot, create: F) -> SharedResource
    where
        F: FnOnce() -> SharedResource,
    {
        let mut scoped = self.scoped.lock();
        if let Some(existing) = scoped.get(&slot) {
            return Arc::clone(existing);
        }
        let resource = create();
        scoped.insert(slot, Arc::clone(&resource));
        drop(scoped);

        self.register_release(Arc::clone(&resource));
        resource
    }

    /// Registers `resource` to be released when this scope ends.
    pub fn track(&self, resource: SharedResource) -> SharedResource {
        self.register_release(Arc::clone(&resource));
        resource
    }

    /// Registers any releasable value with this scope.
    pub fn register_release<T>(&self, value: Arc<T>)
    where
        T: Release + 'static,
    {
        if self.is_ended() {
            tracing::warn!(depth = self.depth, "release registered on an ended scope");
        }
        self.releases.lock().push(Box::new(move || {
            value.release();
        }));
    }

    /// Ends the scope, releasing everything it owns newest first.
    ///
    /// Safe to call more than once; later calls only release what was
    /// registered after the previous call. Returns how many hooks ran.
    pub fn end(&self) -> usize {
        self.ended.store(true, Ordering::Release);
        let mut hooks = self.releases.lock().drain();
        let ran = hooks.run_all_reverse();
        // drop cached handles so per-scope instances can be reclaimed
        let cached: Vec<_> = self.scoped.lock().drain().collect();
        drop(cached);
        if ran > 0 {
            tracing::trace!(depth = self.depth, released = ran, "lifetime scope ended");
        }
        ran
    }

    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::Acquire)
    }

    /// Number of release hooks not yet run.
    pub fn pending_releases(&self) -> usize {
        self.releases.lock().len()
    }

    pub fn ledger(&self) -> &Arc<ResourceLedger> {
        &self.ledger
    }

    pub fn parent(&self) -> Option<&LifetimeScope<'p>> {
        self.parent
    }

    /// Nesting depth; the root scope is at depth 0.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Drop for LifetimeScope<'_> {
    fn drop(&mut self) {
        if !self.releases.get_mut().is_empty() || !self.is_ended() {
            self.end();
        }
    }
}

impl fmt::Debug for LifetimeScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifetimeScope")
            .field("depth", &self.depth)
            .field("pending_releases", &self.pending_releases())
            .field("ended", &self.is_ended())
            .finish()
    }
}
