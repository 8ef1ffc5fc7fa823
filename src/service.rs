//! The service exercised by each probe iteration.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::ProbeResult;
use crate::resource::SharedResource;
use crate::scope::LifetimeScope;
use crate::scoped::with_resource;
use crate::traits::ResourceSource;

/// Factory delegate handed to a [`ProbeService`].
pub type ResourceFactory<'s> = Box<dyn Fn() -> SharedResource + Send + Sync + 's>;

/// A unit of work that depends on a short-lived resource through a factory.
///
/// Every [`do_something`](Self::do_something) call obtains a resource from
/// the factory, performs the guarded operation and releases it, the way a
/// service holding a factory delegate would inside one lifetime scope.
pub struct ProbeService<'s> {
    factory: ResourceFactory<'s>,
    operations: AtomicU64,
}

impl<'s> ProbeService<'s> {
    pub fn new(factory: ResourceFactory<'s>) -> Self {
        Self {
            factory,
            operations: AtomicU64::new(0),
        }
    }

    /// Builds a service whose factory resolves from `source` within `scope`.
    pub fn resolve<S>(scope: &'s LifetimeScope<'_>, source: &'s S) -> Self
    where
        S: ResourceSource + ?Sized,
    {
        Self::new(Box::new(move || scope.resolve(source)))
    }

    pub fn do_something(&self) -> ProbeResult<()> {
        with_resource(|| (self.factory)(), |resource| resource.perform_operation())?;
        self.operations.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Number of successful `do_something` calls.
    pub fn operations(&self) -> u64 {
        self.operations.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for ProbeService<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeService")
            .field("operations", &self.operations())
            .finish()
    }
}
