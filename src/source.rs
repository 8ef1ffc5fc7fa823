//! Policy-driven resource sources.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::ledger::ResourceLedger;
use crate::lifetime::LifecyclePolicy;
use crate::resource::{SharedResource, TrackedResource};
use crate::scope::{LifetimeScope, ScopeSlot};
use crate::traits::ResourceSource;

static NEXT_SLOT: AtomicU64 = AtomicU64::new(1);

/// A [`ResourceSource`] implementing one of the built-in lifecycle policies.
///
/// Each source owns a distinct per-scope slot, so two `PerScope` sources
/// never share an instance even within one scope.
pub struct PolicySource {
    policy: LifecyclePolicy,
    ledger: Arc<ResourceLedger>,
    slot: ScopeSlot,
    singleton: Mutex<Option<SharedResource>>,
}

impl PolicySource {
    pub fn new(policy: LifecyclePolicy, ledger: Arc<ResourceLedger>) -> Self {
        Self {
            policy,
            ledger,
            slot: NEXT_SLOT.fetch_add(1, Ordering::Relaxed),
            singleton: Mutex::new(None),
        }
    }

    fn create(&self) -> SharedResource {
        Arc::new(TrackedResource::new(Arc::clone(&self.ledger)))
    }

    /// The singleton instance, if one has been created.
    pub fn singleton_instance(&self) -> Option<SharedResource> {
        self.singleton.lock().clone()
    }

    /// Releases and forgets the singleton instance.
    ///
    /// Returns `true` if an instance existed. The instance is reclaimed once
    /// the last outstanding handle to it is dropped. A later `acquire`
    /// creates a fresh singleton.
    pub fn shutdown(&self) -> bool {
        let taken = self.singleton.lock().take();
        match taken {
            Some(resource) => {
                resource.release();
                true
            }
            None => false,
        }
    }
}

impl ResourceSource for PolicySource {
    fn acquire(&self, scope: &LifetimeScope<'_>) -> SharedResource {
        match self.policy {
            LifecyclePolicy::PerCall => scope.track(self.create()),
            LifecyclePolicy::PerScope => scope.get_or_create_scoped(self.slot, || self.create()),
            LifecyclePolicy::Singleton => {
                let mut singleton = self.singleton.lock();
                Arc::clone(singleton.get_or_insert_with(|| self.create()))
            }
        }
    }

    fn policy(&self) -> LifecyclePolicy {
        self.policy
    }
}

impl Drop for PolicySource {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for PolicySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicySource")
            .field("policy", &self.policy)
            .field("slot", &self.slot)
            .finish()
    }
}
