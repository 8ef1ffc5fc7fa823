//! Tracked resources and their lifecycle bookkeeping.
//!
//! A [`TrackedResource`] reports every edge of its lifecycle to a shared
//! [`ResourceLedger`]: construction, explicit release, and reclamation.
//! Reclamation is Rust's `Drop`, so it runs exactly once per instance and at
//! a deterministic point (when the last owner lets go).

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::error::{ProbeError, ProbeResult};
use crate::ledger::ResourceLedger;
use crate::traits::Release;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier assigned to each tracked resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ResourceId(u64);

impl ResourceId {
    fn next() -> Self {
        ResourceId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shared handle used when a policy hands the same resource to several callers.
pub type SharedResource = Arc<TrackedResource>;

/// A scoped dependency whose lifetime is recorded in a [`ResourceLedger`].
///
/// # Lifecycle
///
/// 1. [`new`](Self::new): `live += 1`, `undisposed += 1`
/// 2. any number of [`perform_operation`](Self::perform_operation) calls
/// 3. [`release`](Self::release): `undisposed -= 1`, once
/// 4. drop (or [`reclaim`](Self::reclaim)): `live -= 1`, once
///
/// # Examples
///
/// ```
/// use scope_probe::{ResourceLedger, TrackedResource};
///
/// let ledger = ResourceLedger::new_shared();
/// let resource = TrackedResource::new(ledger.clone());
/// resource.perform_operation().unwrap();
///
/// assert!(resource.release());
/// assert!(!resource.release()); // idempotent
/// assert!(resource.perform_operation().is_err());
///
/// resource.reclaim();
/// assert!(ledger.snapshot().is_quiescent());
/// ```
pub struct TrackedResource {
    id: ResourceId,
    released: AtomicBool,
    ledger: Arc<ResourceLedger>,
}

impl TrackedResource {
    /// Creates a resource and records it in `ledger`.
    pub fn new(ledger: Arc<ResourceLedger>) -> Self {
        ledger.record_created();
        let id = ResourceId::next();
        tracing::debug!(resource = %id, "resource created");
        Self {
            id,
            released: AtomicBool::new(false),
            ledger,
        }
    }

    /// Creates a resource tracked by the process-wide ledger.
    pub fn tracked_globally() -> Self {
        Self::new(ResourceLedger::global())
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    pub fn ledger(&self) -> &Arc<ResourceLedger> {
        &self.ledger
    }

    /// The guarded operation. Fails once the resource has been released.
    pub fn perform_operation(&self) -> ProbeResult<()> {
        if self.is_released() {
            return Err(ProbeError::AlreadyReleased { id: self.id });
        }
        Ok(())
    }

    /// Releases the resource. Returns `true` only for the call that did the work.
    pub fn release(&self) -> bool {
        if self
            .released
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.ledger.record_released();
        tracing::debug!(resource = %self.id, "resource released");
        true
    }

    /// Reclaims the resource now instead of at the end of the owner's scope.
    pub fn reclaim(self) {
        drop(self);
    }
}

impl Drop for TrackedResource {
    fn drop(&mut self) {
        // Reclaimed without release: settle `undisposed` first so the ledger
        // never shows more undisposed than live resources.
        if self
            .released
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.ledger.record_abandoned();
            self.ledger.record_released();
            tracing::warn!(resource = %self.id, "resource reclaimed without release");
        }
        self.ledger.record_reclaimed();
        tracing::debug!(resource = %self.id, "resource reclaimed");
    }
}

impl AsRef<TrackedResource> for TrackedResource {
    fn as_ref(&self) -> &TrackedResource {
        self
    }
}

impl Release for TrackedResource {
    fn release(&self) -> bool {
        TrackedResource::release(self)
    }
}

impl fmt::Debug for TrackedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedResource")
            .field("id", &self.id)
            .field("released", &self.is_released())
            .finish()
    }
}
