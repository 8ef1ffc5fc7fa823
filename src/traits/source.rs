//! Strategy trait for supplying tracked resources to a scope.

use crate::lifetime::LifecyclePolicy;
use crate::resource::SharedResource;
use crate::scope::LifetimeScope;

/// Supplies resources to lifetime scopes according to a lifecycle policy.
///
/// The resource type does not care which policy produced it; the source
/// decides whether a call creates a new instance, reuses the one cached in
/// `scope`, or hands out a process-wide singleton, and it arranges for the
/// scope to release what it owns.
pub trait ResourceSource: Send + Sync {
    /// Obtains a resource for use inside `scope`.
    fn acquire(&self, scope: &LifetimeScope<'_>) -> SharedResource;

    /// The policy this source implements.
    fn policy(&self) -> LifecyclePolicy;
}
