//! Cleanup configuration.

use crate::error::ConfigError;

/// Environment variable overriding [`CleanupConfig::drain_cap`].
pub const DRAIN_CAP_ENV: &str = "OPENWORKERS_DIGEST_DRAIN_CAP";

/// Default number of abandoned contexts released per opportunistic drain.
pub const DEFAULT_DRAIN_CAP: usize = 100;

/// Tunables for the abandoned-context cleanup path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupConfig {
    /// Maximum number of notifications drained inline per acquire.
    ///
    /// Bounds the worst-case release work done on the hot path. `0` disables
    /// opportunistic drains; explicit drains still run.
    pub drain_cap: usize,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            drain_cap: DEFAULT_DRAIN_CAP,
        }
    }
}

impl CleanupConfig {
    /// Build the config from the process environment.
    ///
    /// An absent or empty `OPENWORKERS_DIGEST_DRAIN_CAP` keeps the default.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(DRAIN_CAP_ENV) {
            let trimmed = value.trim();

            if !trimmed.is_empty() {
                config.drain_cap = trimmed.parse().map_err(|_| ConfigError::InvalidDrainCap {
                    var: DRAIN_CAP_ENV,
                    value: value.clone(),
                })?;
            }
        }

        tracing::debug!("Cleanup config: drain_cap={}", config.drain_cap);
        Ok(config)
    }

    /// Override the drain cap.
    pub fn with_drain_cap(mut self, drain_cap: usize) -> Self {
        self.drain_cap = drain_cap;
        self
    }
}
