//! Engine configuration.
//!
//! TOML-deserializable settings for the entitlement cache, the retry policy
//! used around contract mutations, and expired-contract pruning. Every field
//! has a default, so an empty document is a valid configuration.
//!
//! # Examples
//!
//! ```
//! use contract_engine::config::EngineConfig;
//!
//! let config = EngineConfig::from_toml(
//!     r#"
//!     [cache]
//!     capacity = 256
//!
//!     [retry]
//!     max_attempts = 5
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.cache.capacity, 256);
//! assert_eq!(config.cache.compute_timeout_ms, 5000);
//! assert_eq!(config.retry_policy().max_attempts, 5);
//! ```

use std::{num::NonZeroUsize, time::Duration};

use serde::Deserialize;

use crate::{
    error::{EngineError, Result},
    reliability::RetryPolicy,
};

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Entitlement cache settings.
    #[serde(default)]
    pub cache: CacheSettings,

    /// Retry settings for contract mutations.
    #[serde(default)]
    pub retry: RetrySettings,

    /// Expired-contract pruning settings.
    #[serde(default)]
    pub pruning: PruningSettings,
}

/// Entitlement cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSettings {
    /// Maximum number of cached entitlement sets (default: 1024).
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Upper bound on one entitlement computation, and on how long a caller
    /// waits for it, in milliseconds (default: 5000).
    #[serde(default = "default_compute_timeout_ms")]
    pub compute_timeout_ms: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { capacity: default_capacity(), compute_timeout_ms: default_compute_timeout_ms() }
    }
}

/// Retry settings, converted into a [`RetryPolicy`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySettings {
    /// Maximum attempts per mutation (default: 3).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds (default: 100).
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Upper bound on a single delay in milliseconds (default: 5000).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Exponential backoff multiplier (default: 2.0).
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

/// Expired-contract pruning settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PruningSettings {
    /// Days a non-renewing contract survives past its billing-period end
    /// (default: 0).
    #[serde(default)]
    pub grace_period_days: u32,

    /// Seconds between pruning sweeps in the server (default: 3600).
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for PruningSettings {
    fn default() -> Self {
        Self { grace_period_days: 0, interval_secs: default_interval_secs() }
    }
}

fn default_capacity() -> usize {
    1024
}
fn default_compute_timeout_ms() -> u64 {
    5000
}
fn default_max_attempts() -> u32 {
    3
}
fn default_initial_delay_ms() -> u64 {
    100
}
fn default_max_delay_ms() -> u64 {
    5000
}
fn default_backoff_multiplier() -> f64 {
    2.0
}
fn default_interval_secs() -> u64 {
    3600
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ConfigError`] if the document does not parse or
    /// fails [`EngineConfig::validate`].
    pub fn from_toml(document: &str) -> Result<Self> {
        let config: Self = toml::from_str(document)
            .map_err(|e| EngineError::ConfigError(format!("failed to parse TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ConfigError`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.cache.capacity == 0 {
            return Err(config_error("cache.capacity must be greater than 0"));
        }
        if self.cache.compute_timeout_ms == 0 {
            return Err(config_error("cache.compute_timeout_ms must be greater than 0"));
        }
        if self.retry.max_attempts == 0 {
            return Err(config_error("retry.max_attempts must be at least 1"));
        }
        if !self.retry.backoff_multiplier.is_finite() || self.retry.backoff_multiplier < 1.0 {
            return Err(config_error(format!(
                "retry.backoff_multiplier must be >= 1.0, got {}",
                self.retry.backoff_multiplier
            )));
        }
        if self.retry.max_delay_ms < self.retry.initial_delay_ms {
            return Err(config_error("retry.max_delay_ms must not be below retry.initial_delay_ms"));
        }
        if self.pruning.interval_secs == 0 {
            return Err(config_error("pruning.interval_secs must be greater than 0"));
        }
        Ok(())
    }

    /// Cache capacity as a non-zero count.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ConfigError`] if the capacity is zero.
    pub fn cache_capacity(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.cache.capacity)
            .ok_or_else(|| config_error("cache.capacity must be greater than 0"))
    }

    /// Bound on a single entitlement computation.
    #[must_use]
    pub const fn compute_timeout(&self) -> Duration {
        Duration::from_millis(self.cache.compute_timeout_ms)
    }

    /// Retry policy for contract mutations.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            backoff_multiplier: self.retry.backoff_multiplier,
        }
    }

    /// Grace period applied by the default pruning rule.
    #[must_use]
    pub fn grace_period(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.pruning.grace_period_days))
    }

    /// Interval between pruning sweeps.
    #[must_use]
    pub const fn pruning_interval(&self) -> Duration {
        Duration::from_secs(self.pruning.interval_secs)
    }
}

fn config_error(message: impl Into<String>) -> EngineError {
    EngineError::ConfigError(message.into())
}
