//! Configuration for the probe driver.
//!
//! Values come from pluggable [`ConfigSource`]s. The environment source reads
//! `SCOPE_PROBE_*` variables; the map source backs tests and callers that
//! build configuration in code. Command-line flags are layered on top by the
//! binary.

use std::collections::HashMap;
use std::env;

use serde::Serialize;

use crate::error::{ProbeError, ProbeResult};
use crate::lifetime::LifecyclePolicy;

/// Prefix for environment variables read by [`EnvironmentConfigSource::probe`].
pub const ENV_PREFIX: &str = "SCOPE_PROBE";

/// A configuration value parsed from a source
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Boolean(bool),
}

impl ConfigValue {
    /// Parses a raw string the way environment values are interpreted.
    pub fn parse(raw: &str) -> Self {
        if let Ok(int_val) = raw.parse::<i64>() {
            ConfigValue::Integer(int_val)
        } else if let Ok(bool_val) = raw.parse::<bool>() {
            ConfigValue::Boolean(bool_val)
        } else {
            ConfigValue::String(raw.to_string())
        }
    }

    /// Try to convert to a non-negative integer
    pub fn as_u64(&self, key: &str) -> ProbeResult<u64> {
        match self {
            ConfigValue::Integer(i) if *i >= 0 => Ok(*i as u64),
            ConfigValue::Integer(i) => Err(ProbeError::config(key, format!("{} is negative", i))),
            other => Err(ProbeError::config(key, format!("expected an integer, got {:?}", other))),
        }
    }

    /// Try to convert to a lifecycle policy
    pub fn as_policy(&self, key: &str) -> ProbeResult<LifecyclePolicy> {
        match self {
            ConfigValue::String(s) => s.parse(),
            other => Err(ProbeError::config(
                key,
                format!("expected a policy name, got {:?}", other),
            )),
        }
    }
}

/// Trait for configuration sources
pub trait ConfigSource: Send + Sync + std::fmt::Debug {
    /// Get a configuration value by key
    fn get(&self, key: &str) -> Option<ConfigValue>;

    /// List all available keys
    fn keys(&self) -> Vec<String>;
}

/// Environment variable configuration source
#[derive(Debug, Default)]
pub struct EnvironmentConfigSource {
    /// Prefix to filter environment variables
    prefix: Option<String>,
}

impl EnvironmentConfigSource {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: Some(prefix.into()) }
    }

    /// Source reading `SCOPE_PROBE_*` variables.
    pub fn probe() -> Self {
        Self::with_prefix(ENV_PREFIX)
    }

    fn env_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix.to_uppercase(), key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }
}

impl ConfigSource for EnvironmentConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        env::var(self.env_key(key)).ok().map(|value| ConfigValue::parse(&value))
    }

    fn keys(&self) -> Vec<String> {
        env::vars()
            .filter_map(|(key, _)| match &self.prefix {
                Some(prefix) => {
                    let prefix_upper = format!("{}_", prefix.to_uppercase());
                    key.strip_prefix(&prefix_upper).map(str::to_lowercase)
                }
                None => Some(key.to_lowercase()),
            })
            .collect()
    }
}

/// In-memory configuration source
#[derive(Debug, Default, Clone)]
pub struct MapConfigSource {
    values: HashMap<String, ConfigValue>,
}

impl MapConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: ConfigValue) -> Self {
        self.values.insert(key.into(), value);
        self
    }
}

impl ConfigSource for MapConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.values.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}

/// Settings for a [`ProbeRunner`](crate::ProbeRunner) run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeConfig {
    /// Iterations per thread; `None` runs until stopped.
    pub iterations: Option<u64>,
    /// Emit a ledger report every this many iterations (0 disables).
    pub report_every: u64,
    /// Lifecycle policy of the probed resource.
    pub policy: LifecyclePolicy,
    /// Number of driver threads.
    pub threads: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            iterations: None,
            report_every: 100_000,
            policy: LifecyclePolicy::PerScope,
            threads: 1,
        }
    }
}

impl ProbeConfig {
    /// Loads settings from `source`, keeping defaults for absent keys.
    ///
    /// Recognised keys: `iterations`, `report_every`, `policy`, `threads`.
    pub fn load(source: &dyn ConfigSource) -> ProbeResult<Self> {
        let mut config = Self::default();
        if let Some(value) = source.get("iterations") {
            let n = value.as_u64("iterations")?;
            config.iterations = (n > 0).then_some(n);
        }
        if let Some(value) = source.get("report_every") {
            config.report_every = value.as_u64("report_every")?;
        }
        if let Some(value) = source.get("policy") {
            config.policy = value.as_policy("policy")?;
        }
        if let Some(value) = source.get("threads") {
            config.threads = value.as_u64("threads")? as usize;
        }
        config.validate()?;
        Ok(config)
    }

    /// Loads settings from `SCOPE_PROBE_*` environment variables.
    pub fn from_env() -> ProbeResult<Self> {
        Self::load(&EnvironmentConfigSource::probe())
    }

    pub fn validate(&self) -> ProbeResult<()> {
        if self.iterations == Some(0) {
            return Err(ProbeError::config(
                "iterations",
                "an iteration limit must be positive; leave it unset to run until stopped",
            ));
        }
        if self.threads == 0 {
            return Err(ProbeError::config("threads", "at least one driver thread is required"));
        }
        Ok(())
    }
}
