//! Call timers
//!
//! A [`Timer`] measures single calls and records their duration and outcome
//! into a [`MetricRegistry`]. There is no retry loop: each call is timed
//! once, and its result passes through untouched.
//!
//! ```
//! use std::io;
//!
//! use rebound_metrics::Timer;
//!
//! let timer = Timer::of("inventory.lookup");
//! let found: Result<u32, io::Error> = timer.execute_computation(|| Ok(7));
//! assert_eq!(found.unwrap(), 7);
//!
//! let context = timer.time();
//! // ... work that cannot be wrapped in a closure ...
//! timer.on_error(context);
//!
//! let metrics = timer.metrics();
//! assert_eq!(metrics.total_calls, 2);
//! assert_eq!(metrics.failed_calls, 1);
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use rebound_common::error::BoxError;
use tracing::trace;

use crate::registry::{CallOutcome, LocalRegistry, MetricRegistry, TimerSnapshot};

struct TimerInner {
    name: String,
    registry: Arc<dyn MetricRegistry>,
}

/// Named call timer bound to a registry
#[derive(Clone)]
pub struct Timer {
    inner: Arc<TimerInner>,
}

impl Timer {
    /// Timer recording into its own [`LocalRegistry`]
    pub fn of(name: impl Into<String>) -> Self {
        Self::of_registry(name, Arc::new(LocalRegistry::new()))
    }

    /// Timer recording into a shared registry
    pub fn of_registry(name: impl Into<String>, registry: Arc<dyn MetricRegistry>) -> Self {
        Self { inner: Arc::new(TimerInner { name: name.into(), registry }) }
    }

    /// Timer name, used as the registry key
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Registry this timer records into
    #[must_use]
    pub fn registry(&self) -> &Arc<dyn MetricRegistry> {
        &self.inner.registry
    }

    /// Current figures; all zero before the first recorded call
    #[must_use]
    pub fn metrics(&self) -> TimerSnapshot {
        self.inner.registry.snapshot(&self.inner.name).unwrap_or_default()
    }

    /// Start timing a call
    #[must_use = "dropping a TimerContext records a failure"]
    pub fn time(&self) -> TimerContext {
        TimerContext {
            timer: self.clone(),
            started_at: self.inner.registry.clock().now(),
            stopped: false,
        }
    }

    /// Stop `context` and record a success
    pub fn on_success(&self, context: TimerContext) {
        context.on_success();
    }

    /// Stop `context` and record a failure
    pub fn on_error(&self, context: TimerContext) {
        context.on_error();
    }

    /// Time `action`
    pub fn execute_action<F, E>(&self, action: F) -> Result<(), E>
    where
        F: FnOnce() -> Result<(), E>,
    {
        self.record(action)
    }

    /// Time `computation`
    pub fn execute_computation<F, T, E>(&self, computation: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        self.record(computation)
    }

    /// Time a computation failing with boxed errors
    pub fn execute_checked_computation<F, T>(&self, computation: F) -> Result<T, BoxError>
    where
        F: FnOnce() -> Result<T, BoxError>,
    {
        self.record(computation)
    }

    /// Time the future produced by `supplier`.
    ///
    /// Timing starts now and stops when the future completes. Dropping the
    /// future before then records a failure.
    pub fn execute_async_supplier<F, Fut, T, E>(
        &self,
        supplier: F,
    ) -> impl Future<Output = Result<T, E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let context = self.time();
        timed(context, supplier())
    }

    pub(crate) fn record<F, T, E>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let context = self.time();
        let result = work();
        context.finish(&result);
        result
    }
}

/// Stop `context` once `future` completes
pub(crate) fn timed<Fut, T, E>(
    context: TimerContext,
    future: Fut,
) -> impl Future<Output = Result<T, E>>
where
    Fut: Future<Output = Result<T, E>>,
{
    async move {
        let result = future.await;
        context.finish(&result);
        result
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer").field("name", &self.inner.name).finish_non_exhaustive()
    }
}

/// Handle for one timed call.
///
/// Stopped exactly once: by [`on_success`](Self::on_success),
/// [`on_error`](Self::on_error), or, failing both, when dropped (recorded as
/// a failure, which covers panics and cancelled futures).
pub struct TimerContext {
    timer: Timer,
    started_at: Instant,
    stopped: bool,
}

impl TimerContext {
    /// Record the call as successful
    pub fn on_success(mut self) {
        self.stop(CallOutcome::Success);
    }

    /// Record the call as failed
    pub fn on_error(mut self) {
        self.stop(CallOutcome::Failure);
    }

    /// Time since the call started
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.timer.inner.registry.clock().now().saturating_duration_since(self.started_at)
    }

    fn finish<T, E>(mut self, result: &Result<T, E>) {
        let outcome = if result.is_ok() { CallOutcome::Success } else { CallOutcome::Failure };
        self.stop(outcome);
    }

    fn stop(&mut self, outcome: CallOutcome) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        let elapsed = self.elapsed();
        trace!(timer = %self.timer.inner.name, %outcome, elapsed_us = elapsed.as_micros() as u64, "call timed");
        self.timer.inner.registry.record_call(&self.timer.inner.name, elapsed, outcome);
    }
}

impl Drop for TimerContext {
    fn drop(&mut self) {
        if !self.stopped {
            trace!(timer = %self.timer.inner.name, "timer context dropped before stop");
            self.stop(CallOutcome::Failure);
        }
    }
}

impl fmt::Debug for TimerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerContext")
            .field("timer", &self.timer.inner.name)
            .field("stopped", &self.stopped)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the timer.
    use std::io;
    use std::time::Duration;

    use rebound_common::time::MockClock;

    use super::*;

    fn timer_on(clock: &MockClock) -> Timer {
        Timer::of_registry("test", Arc::new(LocalRegistry::with_clock(clock.clone())))
    }

    /// Validates manual start and stop.
    ///
    /// Assertions:
    /// - Elapsed time comes from the registry clock.
    #[test]
    fn test_manual_context() {
        let clock = MockClock::new();
        let timer = timer_on(&clock);

        let context = timer.time();
        clock.advance(Duration::from_millis(250));
        timer.on_success(context);

        let metrics = timer.metrics();
        assert_eq!(metrics.successful_calls, 1);
        assert_eq!(metrics.durations.max, Duration::from_millis(250));
    }

    /// Validates the result passes through and is classified.
    ///
    /// Assertions:
    /// - `Ok` counts as success, `Err` as failure, values unchanged.
    #[test]
    fn test_execute_passes_results_through() {
        let clock = MockClock::new();
        let timer = timer_on(&clock);

        assert_eq!(timer.execute_computation(|| Ok::<_, io::Error>(5)).expect("ok"), 5);
        let err = timer
            .execute_action(|| Err(io::Error::from(io::ErrorKind::TimedOut)))
            .expect_err("err");
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);

        let metrics = timer.metrics();
        assert_eq!((metrics.successful_calls, metrics.failed_calls), (1, 1));
    }

    /// Validates the drop guard.
    ///
    /// Assertions:
    /// - A context dropped without stopping records one failure.
    #[test]
    fn test_dropped_context_records_failure() {
        let clock = MockClock::new();
        let timer = timer_on(&clock);

        drop(timer.time());

        assert_eq!(timer.metrics().failed_calls, 1);
        assert_eq!(timer.metrics().total_calls, 1);
    }

    /// Validates metrics before any call.
    ///
    /// Assertions:
    /// - All figures are zero.
    #[test]
    fn test_metrics_before_first_call() {
        let timer = Timer::of("idle");
        assert_eq!(timer.metrics(), TimerSnapshot::default());
        assert_eq!(timer.name(), "idle");
    }
}
