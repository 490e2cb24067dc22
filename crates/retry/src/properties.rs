//! File-based retry configuration
//!
//! Properties describe the serializable part of a [`RetryConfig`]: attempts
//! and the wait schedule. Predicates, sleepers and clocks stay in code. Every
//! field is optional; instance entries layer over the registry defaults,
//! which layer over a base config.
//!
//! ```toml
//! [defaults]
//! max_attempts = 3
//! wait_duration = 500
//!
//! [instances.backend]
//! max_attempts = 5
//! exponential_backoff = { multiplier = 2.0, max_wait_duration = 10000 }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use rebound_common::error::CommonError;
use rebound_common::option_duration_millis;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::RetryConfig;
use crate::constants::{DEFAULT_MULTIPLIER, DEFAULT_WAIT_DURATION};
use crate::error::RetryResult;
use crate::wait::WaitStrategy;

/// Exponential growth settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExponentialBackoffProperties {
    /// Growth factor per attempt (defaults to 1.5)
    pub multiplier: Option<f64>,
    /// Upper bound on any single wait, in milliseconds
    #[serde(with = "option_duration_millis")]
    pub max_wait_duration: Option<Duration>,
}

/// Serializable retry settings for one instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryProperties {
    /// Maximum number of attempts, the first call included
    pub max_attempts: Option<u32>,
    /// Base wait in milliseconds
    #[serde(with = "option_duration_millis")]
    pub wait_duration: Option<Duration>,
    /// Switch to exponential waits
    pub exponential_backoff: Option<ExponentialBackoffProperties>,
    /// Jitter each wait by this factor, in `[0, 1]`
    pub randomization_factor: Option<f64>,
}

impl RetryProperties {
    /// Fields set in `self` win over those in `base`
    #[must_use]
    pub fn layered_over(&self, base: &Self) -> Self {
        Self {
            max_attempts: self.max_attempts.or(base.max_attempts),
            wait_duration: self.wait_duration.or(base.wait_duration),
            exponential_backoff: match (self.exponential_backoff, base.exponential_backoff) {
                (Some(own), Some(inherited)) => Some(ExponentialBackoffProperties {
                    multiplier: own.multiplier.or(inherited.multiplier),
                    max_wait_duration: own.max_wait_duration.or(inherited.max_wait_duration),
                }),
                (own, inherited) => own.or(inherited),
            },
            randomization_factor: self.randomization_factor.or(base.randomization_factor),
        }
    }

    /// Whether any field touching the wait schedule is set
    #[must_use]
    pub const fn configures_wait(&self) -> bool {
        self.wait_duration.is_some()
            || self.exponential_backoff.is_some()
            || self.randomization_factor.is_some()
    }

    /// Wait strategy described by these properties.
    ///
    /// `None` when no wait field is set, so the base strategy is kept.
    #[must_use]
    pub fn wait_strategy(&self) -> Option<WaitStrategy> {
        if !self.configures_wait() {
            return None;
        }
        let wait = self.wait_duration.unwrap_or(DEFAULT_WAIT_DURATION);
        let strategy = match (self.exponential_backoff, self.randomization_factor) {
            (Some(backoff), Some(randomization_factor)) => WaitStrategy::ExponentialRandomized {
                initial: wait,
                multiplier: backoff.multiplier.unwrap_or(DEFAULT_MULTIPLIER),
                randomization_factor,
                max: backoff.max_wait_duration,
            },
            (Some(backoff), None) => WaitStrategy::Exponential {
                initial: wait,
                multiplier: backoff.multiplier.unwrap_or(DEFAULT_MULTIPLIER),
                max: backoff.max_wait_duration,
            },
            (None, Some(randomization_factor)) => {
                WaitStrategy::Randomized { interval: wait, randomization_factor }
            }
            (None, None) => WaitStrategy::Fixed(wait),
        };
        Some(strategy)
    }

    /// Apply these properties on top of `base` and validate the result
    pub fn apply_to(&self, base: &RetryConfig) -> RetryResult<RetryConfig> {
        let mut builder = base.to_builder();
        if let Some(max_attempts) = self.max_attempts {
            builder = builder.max_attempts(max_attempts);
        }
        if let Some(strategy) = self.wait_strategy() {
            builder = builder.wait_strategy(strategy);
        }
        builder.build()
    }
}

/// Registry-wide properties: shared defaults plus named instances
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryProperties {
    /// Settings every instance starts from
    pub defaults: RetryProperties,
    /// Per-instance overrides, by name
    pub instances: BTreeMap<String, RetryProperties>,
}

impl RegistryProperties {
    /// Parse TOML properties
    pub fn from_toml_str(contents: &str) -> RetryResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Parse JSON properties
    pub fn from_json_str(contents: &str) -> RetryResult<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Load properties from a `.toml` or `.json` file
    pub fn load(path: &Path) -> RetryResult<Self> {
        info!(path = %path.display(), "Loading retry properties from file");
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&contents),
            Some("json") => Self::from_json_str(&contents),
            other => Err(CommonError::config(format!(
                "Unsupported properties format: {}",
                other.unwrap_or("<none>")
            ))
            .into()),
        }
    }

    /// Effective properties for `name`: instance entry over the defaults
    #[must_use]
    pub fn resolve(&self, name: &str) -> RetryProperties {
        self.instances
            .get(name)
            .map_or_else(|| self.defaults.clone(), |own| own.layered_over(&self.defaults))
    }
}
