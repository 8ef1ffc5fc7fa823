//! Lifecycle policy definitions.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ProbeError;

/// Lifecycle policies controlling how often a resource source creates instances
///
/// Each policy trades allocation churn for sharing. The probe exists to watch
/// how the ledger behaves under each of them.
///
/// # Policy Characteristics
///
/// - **PerCall**: one instance per acquisition, most churn
/// - **PerScope**: one instance per lifetime scope, released when the scope ends
/// - **Singleton**: one instance per source, outlives every scope
///
/// # Examples
///
/// ```rust
/// use scope_probe::{LifecyclePolicy, LifetimeScope, PolicySource, ResourceLedger};
/// use std::sync::Arc;
///
/// let ledger = ResourceLedger::new_shared();
/// let root = LifetimeScope::root(ledger.clone());
///
/// let per_scope = PolicySource::new(LifecyclePolicy::PerScope, ledger.clone());
/// let scope1 = root.begin_nested();
/// let a = scope1.resolve(&per_scope);
/// let b = scope1.resolve(&per_scope);
/// assert!(Arc::ptr_eq(&a, &b)); // same within scope
///
/// let scope2 = root.begin_nested();
/// let c = scope2.resolve(&per_scope);
/// assert!(!Arc::ptr_eq(&a, &c)); // different across scopes
///
/// let per_call = PolicySource::new(LifecyclePolicy::PerCall, ledger);
/// let d = scope1.resolve(&per_call);
/// let e = scope1.resolve(&per_call);
/// assert!(!Arc::ptr_eq(&d, &e)); // always different
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecyclePolicy {
    /// New instance per acquisition
    ///
    /// The scope that asked for it registers its release, so every instance
    /// handed out inside a scope is released when that scope ends.
    PerCall,
    /// Single instance per lifetime scope
    ///
    /// Created on first acquisition within a scope and cached there. Nested
    /// scopes get their own instance. Released when the owning scope ends.
    #[default]
    PerScope,
    /// Single instance per source, shared across all scopes and threads
    ///
    /// Never released by a scope; released by shutting the source down.
    Singleton,
}

impl LifecyclePolicy {
    pub const ALL: [LifecyclePolicy; 3] = [
        LifecyclePolicy::PerCall,
        LifecyclePolicy::PerScope,
        LifecyclePolicy::Singleton,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LifecyclePolicy::PerCall => "per-call",
            LifecyclePolicy::PerScope => "per-scope",
            LifecyclePolicy::Singleton => "singleton",
        }
    }

    /// Whether scopes release the instances this policy hands them.
    pub fn is_scope_owned(self) -> bool {
        !matches!(self, LifecyclePolicy::Singleton)
    }
}

impl fmt::Display for LifecyclePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecyclePolicy {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "per-call" | "transient" => Ok(LifecyclePolicy::PerCall),
            "per-scope" | "scoped" => Ok(LifecyclePolicy::PerScope),
            "singleton" => Ok(LifecyclePolicy::Singleton),
            other => Err(ProbeError::config(
                "policy",
                format!("unknown lifecycle policy `{}`", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("per-call".parse::<LifecyclePolicy>().unwrap(), LifecyclePolicy::PerCall);
        assert_eq!("PER_SCOPE".parse::<LifecyclePolicy>().unwrap(), LifecyclePolicy::PerScope);
        assert_eq!("scoped".parse::<LifecyclePolicy>().unwrap(), LifecyclePolicy::PerScope);
        assert_eq!(" singleton ".parse::<LifecyclePolicy>().unwrap(), LifecyclePolicy::Singleton);
        assert!("forever".parse::<LifecyclePolicy>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for policy in LifecyclePolicy::ALL {
            assert_eq!(policy.to_string().parse::<LifecyclePolicy>().unwrap(), policy);
        }
    }

    #[test]
    fn only_singleton_outlives_scopes() {
        assert!(LifecyclePolicy::PerCall.is_scope_owned());
        assert!(LifecyclePolicy::PerScope.is_scope_owned());
        assert!(!LifecyclePolicy::Singleton.is_scope_owned());
        assert_eq!(LifecyclePolicy::default(), LifecyclePolicy::PerScope);
    }
}
