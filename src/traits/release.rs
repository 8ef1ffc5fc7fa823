//! Release trait for scope-owned cleanup.

/// Trait for explicit, idempotent release of a scoped resource.
///
/// A [`LifetimeScope`](crate::LifetimeScope) calls `release` on everything
/// registered with it, in LIFO order, when the scope ends. Implementations
/// must tolerate repeated calls.
///
/// # Examples
///
/// ```
/// use scope_probe::{LifetimeScope, Release, ResourceLedger};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// struct Connection {
///     closed: AtomicBool,
/// }
///
/// impl Release for Connection {
///     fn release(&self) -> bool {
///         !self.closed.swap(true, Ordering::SeqCst)
///     }
/// }
///
/// let conn = Arc::new(Connection { closed: AtomicBool::new(false) });
/// let scope = LifetimeScope::root(ResourceLedger::new_shared());
/// scope.register_release(conn.clone());
/// scope.end();
/// assert!(conn.closed.load(Ordering::SeqCst));
/// ```
pub trait Release: Send + Sync + 'static {
    /// Releases the resource. Returns `true` if this call did the release.
    fn release(&self) -> bool;
}
