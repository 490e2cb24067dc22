//! Retry configuration
//!
//! A [`RetryConfig`] is built once through [`RetryConfigBuilder`], validated
//! in `build`, and never changes afterwards. Every call through a retry
//! instance reads the same config concurrently.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rebound_common::error::ErrorClassification;
use rebound_common::time::{Clock, Sleeper, SystemClock, ThreadSleeper};

use crate::classifier::{
    classified_predicate, predicate, result_predicate, type_predicate, typed_predicate, Outcome,
    OutcomeClassifier, ResultPredicate,
};
use crate::constants::{DEFAULT_MAX_ATTEMPTS, MIN_MAX_ATTEMPTS};
use crate::error::{RetryError, RetryResult};
use crate::wait::WaitStrategy;

/// Immutable retry policy shared by all calls of one retry instance
#[derive(Clone)]
pub struct RetryConfig {
    max_attempts: u32,
    wait_strategy: WaitStrategy,
    classifier: OutcomeClassifier,
    result_predicate: Option<ResultPredicate>,
    sleeper: Arc<dyn Sleeper>,
    clock: Arc<dyn Clock>,
}

impl Default for RetryConfig {
    /// Three attempts, fixed 500ms wait, retry on any error
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            wait_strategy: WaitStrategy::default(),
            classifier: OutcomeClassifier::default(),
            result_predicate: None,
            sleeper: Arc::new(ThreadSleeper),
            clock: Arc::new(SystemClock),
        }
    }
}

impl RetryConfig {
    /// Create a configuration builder starting from the defaults
    #[must_use]
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Create a builder seeded with this configuration
    #[must_use]
    pub fn to_builder(&self) -> RetryConfigBuilder {
        RetryConfigBuilder { config: self.clone() }
    }

    /// Validate the configuration
    pub fn validate(&self) -> RetryResult<()> {
        if self.max_attempts < MIN_MAX_ATTEMPTS {
            return Err(RetryError::invalid(format!(
                "max_attempts must be at least {MIN_MAX_ATTEMPTS}, got {}",
                self.max_attempts
            )));
        }
        self.wait_strategy.validate()
    }

    /// Maximum number of attempts, the first call included
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Strategy computing waits between attempts
    #[must_use]
    pub const fn wait_strategy(&self) -> &WaitStrategy {
        &self.wait_strategy
    }

    /// Error classifier
    #[must_use]
    pub const fn classifier(&self) -> &OutcomeClassifier {
        &self.classifier
    }

    /// Sleeper used between attempts
    #[must_use]
    pub fn sleeper(&self) -> &dyn Sleeper {
        self.sleeper.as_ref()
    }

    /// Clock used for event timestamps
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Whether the configured result predicate rejects `value`
    #[must_use]
    pub fn rejects_result(&self, value: &dyn Any) -> bool {
        self.result_predicate.as_ref().is_some_and(|p| p(value))
    }

    /// Classify an attempt's error, or `None` for a produced value
    #[must_use]
    pub fn classify(&self, error: Option<&(dyn StdError + 'static)>) -> Outcome {
        self.classifier.classify(error)
    }

    pub(crate) fn sleeper_handle(&self) -> Arc<dyn Sleeper> {
        Arc::clone(&self.sleeper)
    }
}

impl fmt::Debug for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("max_attempts", &self.max_attempts)
            .field("wait_strategy", &self.wait_strategy)
            .field("classifier", &self.classifier)
            .field("result_predicate", &self.result_predicate.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for RetryConfig with fluent API
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    /// Start from the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum number of attempts, the first call included
    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    /// Fixed wait between attempts
    #[must_use]
    pub fn wait_duration(mut self, wait: Duration) -> Self {
        self.config.wait_strategy = WaitStrategy::Fixed(wait);
        self
    }

    /// Exponential waits starting at `initial`
    #[must_use]
    pub fn exponential_backoff(
        mut self,
        initial: Duration,
        multiplier: f64,
        max: Option<Duration>,
    ) -> Self {
        self.config.wait_strategy = WaitStrategy::Exponential { initial, multiplier, max };
        self
    }

    /// Any wait strategy
    #[must_use]
    pub fn wait_strategy(mut self, strategy: WaitStrategy) -> Self {
        self.config.wait_strategy = strategy;
        self
    }

    /// Wait computed by `f` from the 1-based failed attempt
    #[must_use]
    pub fn wait_fn<F>(self, f: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        self.wait_strategy(WaitStrategy::custom(f))
    }

    /// Retry errors matching `f`. Once any retry-on predicate is set, errors
    /// matching none of them are terminal.
    #[must_use]
    pub fn retry_on<F>(mut self, f: F) -> Self
    where
        F: Fn(&(dyn StdError + 'static)) -> bool + Send + Sync + 'static,
    {
        self.config.classifier.push_retry_on(predicate(f));
        self
    }

    /// Retry errors of type `T` anywhere in the source chain
    #[must_use]
    pub fn retry_on_type<T>(mut self) -> Self
    where
        T: StdError + 'static,
    {
        self.config.classifier.push_retry_on(type_predicate::<T>());
        self
    }

    /// Retry errors of type `T` for which `f` holds
    #[must_use]
    pub fn retry_on_error<T, F>(mut self, f: F) -> Self
    where
        T: StdError + 'static,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.config.classifier.push_retry_on(typed_predicate::<T, F>(f));
        self
    }

    /// Retry errors of type `T` that report themselves retryable
    #[must_use]
    pub fn retry_on_classified<T>(mut self) -> Self
    where
        T: StdError + ErrorClassification + 'static,
    {
        self.config.classifier.push_retry_on(classified_predicate::<T>());
        self
    }

    /// Treat errors matching `f` as success: no retry, IGNORED_ERROR event
    #[must_use]
    pub fn ignore<F>(mut self, f: F) -> Self
    where
        F: Fn(&(dyn StdError + 'static)) -> bool + Send + Sync + 'static,
    {
        self.config.classifier.push_ignore(predicate(f));
        self
    }

    /// Ignore errors of type `T` anywhere in the source chain
    #[must_use]
    pub fn ignore_type<T>(mut self) -> Self
    where
        T: StdError + 'static,
    {
        self.config.classifier.push_ignore(type_predicate::<T>());
        self
    }

    /// Ignore errors of type `T` for which `f` holds
    #[must_use]
    pub fn ignore_error<T, F>(mut self, f: F) -> Self
    where
        T: StdError + 'static,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.config.classifier.push_ignore(typed_predicate::<T, F>(f));
        self
    }

    /// Retry when a produced value of type `T` satisfies `f`.
    ///
    /// `T` must be exactly the computation's value type. Values of any other
    /// type are accepted without consulting `f` (logged at `debug`):
    ///
    /// ```
    /// use std::io;
    ///
    /// use rebound_common::time::RecordingSleeper;
    /// use rebound_retry::{Retry, RetryConfig};
    ///
    /// let config = RetryConfig::builder()
    ///     .retry_on_result(|count: &u32| *count == 0)
    ///     .sleeper(RecordingSleeper::new())
    ///     .build()
    ///     .unwrap();
    /// let retry = Retry::create("counts", config);
    ///
    /// // Predicate type matches: the zero is retried until attempts run out.
    /// let zero: Result<u32, io::Error> = retry.execute_computation(|| Ok(0));
    /// assert_eq!(zero.unwrap(), 0);
    /// assert_eq!(retry.metrics().failed_calls_with_retry, 1);
    ///
    /// // `u64` is not `u32`: the value is accepted on the first attempt.
    /// let wide: Result<u64, io::Error> = retry.execute_computation(|| Ok(0));
    /// assert_eq!(wide.unwrap(), 0);
    /// assert_eq!(retry.metrics().successful_calls_without_retry, 1);
    /// ```
    #[must_use]
    pub fn retry_on_result<T, F>(mut self, f: F) -> Self
    where
        T: 'static,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.config.result_predicate = Some(result_predicate::<T, F>(f));
        self
    }

    /// Sleeper used between attempts
    #[must_use]
    pub fn sleeper<S>(mut self, sleeper: S) -> Self
    where
        S: Sleeper + 'static,
    {
        self.config.sleeper = Arc::new(sleeper);
        self
    }

    /// Clock used for event timestamps
    #[must_use]
    pub fn clock<C>(mut self, clock: C) -> Self
    where
        C: Clock + 'static,
    {
        self.config.clock = Arc::new(clock);
        self
    }

    /// Validate and produce the configuration
    pub fn build(self) -> RetryResult<RetryConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
