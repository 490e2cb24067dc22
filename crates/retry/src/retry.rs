//! Named retry instances
//!
//! A [`Retry`] pairs a name with an immutable [`RetryConfig`], an event
//! publisher and call counters. It is cheap to clone; clones share all three.
//! Each call made through it gets its own [`RetryContext`].

use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rebound_common::error::BoxError;
use rebound_common::event::{EventPublisher, EventStream};
use tracing::{debug, instrument, warn};

use crate::classifier::Outcome;
use crate::config::RetryConfig;
use crate::context::{Decision, RetryContext};
use crate::event::{RetryEvent, RetryEventType};
use crate::metrics::{MetricsRecorder, RetryMetrics};

/// Borrow a work unit's error as a plain `dyn Error` for classification
pub(crate) type ErrorView<E> = fn(&E) -> &(dyn StdError + 'static);

pub(crate) fn as_dyn_error<E>(error: &E) -> &(dyn StdError + 'static)
where
    E: StdError + 'static,
{
    error
}

pub(crate) fn as_dyn_box(error: &BoxError) -> &(dyn StdError + 'static) {
    &**error
}

/// Result of settling one attempt
enum Step<T, E> {
    Done(Result<T, E>),
    Wait(Duration),
}

struct RetryInner {
    name: String,
    config: Arc<RetryConfig>,
    publisher: EventPublisher<RetryEvent>,
    metrics: MetricsRecorder,
}

/// A named retry policy with its event stream and counters
#[derive(Clone)]
pub struct Retry {
    inner: Arc<RetryInner>,
}

impl Retry {
    /// Create an instance from a validated configuration
    pub fn create(name: impl Into<String>, config: RetryConfig) -> Self {
        Self::from_shared(name, Arc::new(config))
    }

    /// Create an instance with [`RetryConfig::default`]
    pub fn of_defaults(name: impl Into<String>) -> Self {
        Self::create(name, RetryConfig::default())
    }

    pub(crate) fn from_shared(name: impl Into<String>, config: Arc<RetryConfig>) -> Self {
        Self {
            inner: Arc::new(RetryInner {
                name: name.into(),
                config,
                publisher: EventPublisher::new(),
                metrics: MetricsRecorder::default(),
            }),
        }
    }

    /// Instance name, carried on every event
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The shared configuration
    #[must_use]
    pub fn config(&self) -> &RetryConfig {
        &self.inner.config
    }

    /// Subscribe to events published from now on
    #[must_use]
    pub fn event_stream(&self) -> EventStream<RetryEvent> {
        self.inner.publisher.subscribe()
    }

    /// Snapshot of the call counters
    #[must_use]
    pub fn metrics(&self) -> RetryMetrics {
        self.inner.metrics.snapshot()
    }

    /// Fresh context for a call driven by hand
    #[must_use]
    pub fn context(&self) -> RetryContext {
        RetryContext::new(Arc::clone(&self.inner.config))
    }

    /// Run `action` under this retry policy
    pub fn execute_action<F, E>(&self, action: F) -> Result<(), E>
    where
        F: FnMut() -> Result<(), E>,
        E: StdError + 'static,
    {
        self.run(action, as_dyn_error::<E>)
    }

    /// Run `computation` under this retry policy
    pub fn execute_computation<F, T, E>(&self, computation: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        T: 'static,
        E: StdError + 'static,
    {
        self.run(computation, as_dyn_error::<E>)
    }

    /// Run a computation failing with boxed errors under this retry policy
    pub fn execute_checked_computation<F, T>(&self, computation: F) -> Result<T, BoxError>
    where
        F: FnMut() -> Result<T, BoxError>,
        T: 'static,
    {
        self.run(computation, as_dyn_box)
    }

    /// Run an async supplier under this retry policy.
    ///
    /// Each attempt awaits a fresh future from `supplier`; waits go through
    /// the configured sleeper's async path. Dropping the returned future
    /// cancels any pending wait and no further events are published.
    pub async fn execute_async_supplier<F, Fut, T, E>(&self, supplier: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: 'static,
        E: StdError + 'static,
    {
        self.run_async(supplier, as_dyn_error::<E>).await
    }

    #[instrument(
        level = "debug",
        skip_all,
        fields(retry = %self.inner.name, max_attempts = self.inner.config.max_attempts())
    )]
    pub(crate) fn run<T, E, F>(&self, mut operation: F, view: ErrorView<E>) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        T: 'static,
    {
        let mut context = self.context();
        context.start();
        loop {
            debug!(attempt = context.attempt(), "executing attempt");
            let outcome = operation();
            match self.settle(&mut context, outcome, view) {
                Step::Done(result) => return result,
                Step::Wait(wait) => {
                    self.inner.config.sleeper().sleep(wait);
                    context.resume(wait);
                }
            }
        }
    }

    #[instrument(
        level = "debug",
        skip_all,
        fields(retry = %self.inner.name, max_attempts = self.inner.config.max_attempts())
    )]
    pub(crate) async fn run_async<T, E, F, Fut>(
        &self,
        mut supplier: F,
        view: ErrorView<E>,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: 'static,
    {
        let sleeper = self.inner.config.sleeper_handle();
        let mut context = self.context();
        context.start();
        loop {
            debug!(attempt = context.attempt(), "executing async attempt");
            let outcome = supplier().await;
            let step = self.settle(&mut context, outcome, view);
            match step {
                Step::Done(result) => return result,
                Step::Wait(wait) => {
                    sleeper.sleep_async(wait).await;
                    context.resume(wait);
                }
            }
        }
    }

    fn settle<T, E>(
        &self,
        context: &mut RetryContext,
        outcome: Result<T, E>,
        view: ErrorView<E>,
    ) -> Step<T, E>
    where
        T: 'static,
    {
        match outcome {
            Ok(value) => {
                if !self.inner.config.rejects_result(&value) {
                    context.on_success();
                    self.finish_success(context, RetryEventType::Success, None);
                    return Step::Done(Ok(value));
                }
                match context.on_retryable_failure() {
                    Decision::Retry(wait) => {
                        self.schedule_retry(context, wait, None);
                        Step::Wait(wait)
                    }
                    Decision::Exhausted => {
                        self.finish_failure(context, None);
                        Step::Done(Ok(value))
                    }
                }
            }
            Err(error) => {
                let source = view(&error);
                match self.inner.config.classify(Some(source)) {
                    Outcome::Ignored | Outcome::Success => {
                        context.on_success();
                        self.finish_success(context, RetryEventType::IgnoredError, Some(source));
                        Step::Done(Err(error))
                    }
                    Outcome::Terminal => {
                        context.on_terminal_failure();
                        self.finish_failure(context, Some(source));
                        Step::Done(Err(error))
                    }
                    Outcome::Retryable => match context.on_retryable_failure() {
                        Decision::Retry(wait) => {
                            self.schedule_retry(context, wait, Some(source));
                            Step::Wait(wait)
                        }
                        Decision::Exhausted => {
                            self.finish_failure(context, Some(source));
                            Step::Done(Err(error))
                        }
                    },
                }
            }
        }
    }

    fn finish_success(
        &self,
        context: &RetryContext,
        kind: RetryEventType,
        error: Option<&(dyn StdError + 'static)>,
    ) {
        let attempt = context.attempt();
        if let Some(err) = error {
            debug!(attempt, error = %err, "ignored error, not retrying");
        } else if attempt > 1 {
            debug!("Operation succeeded after {} retries", attempt - 1);
        }
        self.inner.metrics.record_success(attempt);
        self.publish(self.event(kind, context, error));
    }

    fn finish_failure(&self, context: &RetryContext, error: Option<&(dyn StdError + 'static)>) {
        let attempt = context.attempt();
        match error {
            Some(err) => warn!(
                attempt,
                total_wait_ms = duration_ms(context.total_wait()),
                error = %err,
                "retry '{}' giving up after {} attempt(s)",
                self.inner.name,
                attempt
            ),
            None => warn!(
                attempt,
                "retry '{}' giving up after {} attempt(s): result still rejected",
                self.inner.name,
                attempt
            ),
        }
        self.inner.metrics.record_failure(attempt);
        self.publish(self.event(RetryEventType::Error, context, error));
    }

    fn schedule_retry(
        &self,
        context: &RetryContext,
        wait: Duration,
        error: Option<&(dyn StdError + 'static)>,
    ) {
        warn!(
            attempt = context.attempt(),
            wait_ms = duration_ms(wait),
            error = error.map(tracing::field::display),
            "Operation failed (attempt {}), retrying after {:?}",
            context.attempt(),
            wait
        );
        self.inner.metrics.record_retry();
        self.publish(self.event(RetryEventType::Retry, context, error).with_wait(wait));
    }

    fn event(
        &self,
        kind: RetryEventType,
        context: &RetryContext,
        error: Option<&(dyn StdError + 'static)>,
    ) -> RetryEvent {
        let created_at = DateTime::<Utc>::from(self.inner.config.clock().system_time());
        RetryEvent::new(kind, &self.inner.name, context.attempt(), created_at)
            .with_error(error.map(|e| e.to_string()))
    }

    fn publish(&self, event: RetryEvent) {
        self.inner.publisher.publish(event);
    }
}

impl fmt::Debug for Retry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retry")
            .field("name", &self.inner.name)
            .field("config", &self.inner.config)
            .field("publisher", &self.inner.publisher)
            .finish()
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
