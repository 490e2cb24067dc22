//! Named retry instances sharing a default configuration

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::config::RetryConfig;
use crate::error::{RetryError, RetryResult};
use crate::properties::RegistryProperties;
use crate::retry::Retry;

/// Get-or-create store of [`Retry`] instances keyed by name.
///
/// Instances created by name alone share the registry's default config.
/// Looking up an existing name always returns the instance already stored,
/// so its event subscribers and counters stay attached.
pub struct RetryRegistry {
    default_config: Arc<RetryConfig>,
    instances: DashMap<String, Retry>,
}

impl RetryRegistry {
    /// Registry whose new instances use `default_config`
    #[must_use]
    pub fn new(default_config: RetryConfig) -> Self {
        Self { default_config: Arc::new(default_config), instances: DashMap::new() }
    }

    /// Registry using [`RetryConfig::default`]
    #[must_use]
    pub fn of_defaults() -> Self {
        Self::new(RetryConfig::default())
    }

    /// Build a registry from properties over [`RetryConfig::default`]
    pub fn from_properties(properties: &RegistryProperties) -> RetryResult<Self> {
        Self::from_properties_over(properties, &RetryConfig::default())
    }

    /// Build a registry from properties layered over `base`.
    ///
    /// Every named instance is built and validated up front; the first
    /// invalid one fails the whole registry.
    pub fn from_properties_over(
        properties: &RegistryProperties,
        base: &RetryConfig,
    ) -> RetryResult<Self> {
        let registry = Self::new(properties.defaults.apply_to(base)?);
        for name in properties.instances.keys() {
            let config = properties.resolve(name).apply_to(base)?;
            registry.instances.insert(name.clone(), Retry::create(name.as_str(), config));
        }
        debug!(instances = registry.len(), "retry registry built from properties");
        Ok(registry)
    }

    /// Configuration given to instances created by name alone
    #[must_use]
    pub fn default_config(&self) -> &RetryConfig {
        &self.default_config
    }

    /// Instance named `name`, created with the default config if missing
    #[must_use]
    pub fn retry(&self, name: &str) -> Retry {
        self.instances
            .entry(name.to_owned())
            .or_insert_with(|| {
                debug!(retry = name, "creating retry instance with default config");
                Retry::from_shared(name, Arc::clone(&self.default_config))
            })
            .clone()
    }

    /// Instance named `name`, created with `config` if missing.
    ///
    /// An existing instance is returned as is; `config` is then dropped.
    #[must_use]
    pub fn retry_with_config(&self, name: &str, config: RetryConfig) -> Retry {
        self.instances
            .entry(name.to_owned())
            .or_insert_with(|| {
                debug!(retry = name, "creating retry instance");
                Retry::create(name, config)
            })
            .clone()
    }

    /// Existing instance named `name`
    #[must_use]
    pub fn find(&self, name: &str) -> Option<Retry> {
        self.instances.get(name).map(|entry| entry.value().clone())
    }

    /// Existing instance named `name`, or [`RetryError::UnknownInstance`]
    pub fn get(&self, name: &str) -> RetryResult<Retry> {
        self.find(name).ok_or_else(|| RetryError::UnknownInstance { name: name.to_owned() })
    }

    /// Remove and return the instance named `name`.
    ///
    /// Clones held elsewhere keep working; the registry just forgets them.
    pub fn remove(&self, name: &str) -> Option<Retry> {
        self.instances.remove(name).map(|(_, retry)| retry)
    }

    /// Names of all instances, sorted
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> =
            self.instances.iter().map(|entry| entry.key().clone()).collect();
        names.sort_unstable();
        names
    }

    /// Number of instances
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether the registry holds no instances
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl Default for RetryRegistry {
    fn default() -> Self {
        Self::of_defaults()
    }
}

impl fmt::Debug for RetryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryRegistry")
            .field("default_config", &self.default_config)
            .field("instances", &self.names())
            .finish()
    }
}
