//! # scope-probe
//!
//! Leak-detection probe for scoped resource lifetimes.
//!
//! ## Features
//!
//! - **Ledger counters**: process-wide `live` and `undisposed` counts, updated atomically
//! - **Tracked resources**: guarded operation, idempotent release, reclamation on `Drop`
//! - **Guaranteed release**: [`with_resource`] releases on success, error and panic
//! - **Lifecycle policies**: per-call, per-scope and singleton sources
//! - **Nested lifetime scopes**: release what they handed out, newest first
//! - **Probe driver**: a multi-threaded loop with periodic ledger reports
//!
//! ## Quick Start
//!
//! ```rust
//! use scope_probe::{with_resource, ProbeError, ResourceLedger, TrackedResource};
//!
//! let ledger = ResourceLedger::new_shared();
//!
//! let resource = TrackedResource::new(ledger.clone());
//! assert_eq!(ledger.snapshot().live, 1);
//! assert_eq!(ledger.snapshot().undisposed, 1);
//!
//! resource.perform_operation().unwrap();
//! resource.release();
//! assert_eq!(ledger.snapshot().undisposed, 0);
//! assert!(matches!(resource.perform_operation(), Err(ProbeError::AlreadyReleased { .. })));
//!
//! resource.reclaim();
//! assert!(ledger.snapshot().is_quiescent());
//!
//! // Scoped acquisition releases on every exit path
//! let out: Result<(), ProbeError> =
//!     with_resource(|| TrackedResource::new(ledger.clone()), |r| r.perform_operation());
//! assert!(out.is_ok());
//! assert!(ledger.snapshot().is_quiescent());
//! ```
//!
//! ## Lifetime Scopes
//!
//! ```rust
//! use scope_probe::{LifecyclePolicy, LifetimeScope, PolicySource, ProbeService, ResourceLedger};
//!
//! let ledger = ResourceLedger::new_shared();
//! let source = PolicySource::new(LifecyclePolicy::PerScope, ledger.clone());
//! let outer = LifetimeScope::root(ledger.clone());
//!
//! for _ in 0..3 {
//!     let inner = outer.begin_nested();
//!     let service = ProbeService::resolve(&inner, &source);
//!     service.do_something().unwrap();
//! }
//!
//! assert!(ledger.snapshot().is_quiescent());
//! assert_eq!(ledger.snapshot().created_total, 3);
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod ledger;
pub mod lifetime;
pub mod probe;
pub mod resource;
pub mod scope;
pub mod scoped;
pub mod service;
pub mod source;
pub mod traits;

// Internal modules
mod internal;

// Re-export core types
pub use config::{ConfigSource, ConfigValue, EnvironmentConfigSource, MapConfigSource, ProbeConfig};
pub use error::{Counter, ProbeError, ProbeResult};
pub use ledger::{LedgerSnapshot, ResourceLedger};
pub use lifetime::LifecyclePolicy;
pub use probe::{ProbeReport, ProbeRunner, ReportHook};
pub use resource::{ResourceId, SharedResource, TrackedResource};
pub use scope::{LifetimeScope, ScopeSlot};
pub use scoped::{with_resource, ScopedResource};
pub use service::{ProbeService, ResourceFactory};
pub use source::PolicySource;
pub use traits::{Release, ResourceSource};
