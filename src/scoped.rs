//! Guaranteed-release acquisition.
//!
//! [`with_resource`] is the only place application code should trigger a
//! release: it runs the caller's operation and releases the resource on
//! every exit path, including errors and unwinding panics.

use std::fmt;
use std::ops::Deref;

use crate::resource::TrackedResource;

/// RAII guard that releases its resource when dropped.
///
/// `R` is whatever the factory produced: an owned [`TrackedResource`] (which
/// is then also reclaimed when the guard goes away) or a shared handle whose
/// reclamation waits for its last owner.
pub struct ScopedResource<R>
where
    R: AsRef<TrackedResource>,
{
    inner: R,
}

impl<R> ScopedResource<R>
where
    R: AsRef<TrackedResource>,
{
    /// Obtains a resource from `factory` and arms the release guard.
    pub fn acquire<F>(factory: F) -> Self
    where
        F: FnOnce() -> R,
    {
        Self { inner: factory() }
    }

    pub fn resource(&self) -> &TrackedResource {
        self.inner.as_ref()
    }
}

impl<R> Deref for ScopedResource<R>
where
    R: AsRef<TrackedResource>,
{
    type Target = TrackedResource;

    fn deref(&self) -> &TrackedResource {
        self.inner.as_ref()
    }
}

impl<R> Drop for ScopedResource<R>
where
    R: AsRef<TrackedResource>,
{
    fn drop(&mut self) {
        self.inner.as_ref().release();
    }
}

impl<R> fmt::Debug for ScopedResource<R>
where
    R: AsRef<TrackedResource>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ScopedResource").field(self.resource()).finish()
    }
}

/// Runs `operation` against a freshly acquired resource, then releases it.
///
/// The release happens whether `operation` returns `Ok`, returns `Err`, or
/// panics. The operation's result, error included, is returned unchanged.
///
/// # Examples
///
/// ```
/// use scope_probe::{with_resource, ProbeError, ResourceLedger, TrackedResource};
///
/// let ledger = ResourceLedger::new_shared();
///
/// let result: Result<(), ProbeError> = with_resource(
///     || TrackedResource::new(ledger.clone()),
///     |resource| {
///         resource.perform_operation()?;
///         resource.release(); // out-of-band release
///         resource.perform_operation()
///     },
/// );
///
/// assert!(matches!(result, Err(ProbeError::AlreadyReleased { .. })));
/// assert!(ledger.snapshot().is_quiescent());
/// ```
pub fn with_resource<R, F, Op, T, E>(factory: F, operation: Op) -> Result<T, E>
where
    R: AsRef<TrackedResource>,
    F: FnOnce() -> R,
    Op: FnOnce(&TrackedResource) -> Result<T, E>,
{
    let guard = ScopedResource::acquire(factory);
    let result = operation(guard.resource());
    drop(guard);
    result
}
