//! Error types for the scope probe.

use thiserror::Error;

use crate::resource::ResourceId;

/// Ledger counter named in an invariant violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    /// Resources constructed but not yet reclaimed.
    Live,
    /// Resources constructed but not yet explicitly released.
    Undisposed,
}

impl std::fmt::Display for Counter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Counter::Live => f.write_str("live"),
            Counter::Undisposed => f.write_str("undisposed"),
        }
    }
}

/// Scope probe errors
///
/// Represents the contract violations that can surface while acquiring,
/// operating on, or releasing tracked resources, plus configuration errors
/// raised by the probe driver.
///
/// # Examples
///
/// ```rust
/// use scope_probe::{ProbeError, ResourceLedger, TrackedResource};
///
/// let ledger = ResourceLedger::new_shared();
/// let resource = TrackedResource::new(ledger);
/// resource.release();
///
/// match resource.perform_operation() {
///     Err(ProbeError::AlreadyReleased { id }) => assert_eq!(id, resource.id()),
///     other => panic!("unexpected: {:?}", other),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// Guarded operation invoked on a resource outside its scope
    #[error("resource {id} was already released")]
    AlreadyReleased { id: ResourceId },

    /// A ledger counter would have gone negative, or `undisposed > live`
    #[error("ledger invariant violated on `{counter}` counter: {detail}")]
    InvariantViolation {
        counter: Counter,
        detail: &'static str,
    },

    /// A configuration value could not be interpreted
    #[error("invalid configuration for `{key}`: {reason}")]
    Config { key: String, reason: String },

    /// The operating system refused to start a driver thread
    #[error("failed to spawn driver thread {worker}: {reason}")]
    Spawn { worker: usize, reason: String },
}

impl ProbeError {
    /// Builds a configuration error for `key`.
    pub fn config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        ProbeError::Config {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Builds a spawn error for driver thread `worker`.
    pub fn spawn(worker: usize, err: &std::io::Error) -> Self {
        ProbeError::Spawn {
            worker,
            reason: err.to_string(),
        }
    }

    /// Whether the error signals a usage bug the caller can recover from.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ProbeError::AlreadyReleased { .. })
    }
}

/// Result type for probe operations
///
/// A convenience alias for `Result<T, ProbeError>` used throughout the crate.
pub type ProbeResult<T> = Result<T, ProbeError>;
