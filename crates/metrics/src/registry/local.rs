//! In-process registry

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use rebound_common::time::{Clock, SystemClock};
use tracing::debug;

use super::histogram::DurationHistogram;
use super::meter::Meter;
use super::{CallOutcome, MetricRegistry, TimerSnapshot};

#[derive(Debug)]
struct TimerMetrics {
    successful: AtomicU64,
    failed: AtomicU64,
    meter: Meter,
    durations: DurationHistogram,
}

impl TimerMetrics {
    fn new(meter: Meter) -> Self {
        Self {
            successful: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            meter,
            durations: DurationHistogram::new(),
        }
    }
}

/// Keeps counters, rates and duration histograms for every timer in memory
///
/// ```
/// use std::time::Duration;
///
/// use rebound_metrics::{CallOutcome, LocalRegistry, MetricRegistry};
///
/// let registry = LocalRegistry::new();
/// registry.record_call("db.query", Duration::from_millis(12), CallOutcome::Success);
/// registry.record_call("db.query", Duration::from_millis(30), CallOutcome::Failure);
///
/// let snapshot = registry.snapshot("db.query").unwrap();
/// assert_eq!(snapshot.total_calls, 2);
/// assert_eq!(snapshot.failed_calls, 1);
/// assert_eq!(snapshot.durations.max, Duration::from_millis(30));
/// ```
pub struct LocalRegistry {
    clock: Arc<dyn Clock>,
    timers: DashMap<String, Arc<TimerMetrics>>,
}

impl LocalRegistry {
    /// Registry on the system clock
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Registry on a custom clock
    pub fn with_clock<C>(clock: C) -> Self
    where
        C: Clock + 'static,
    {
        Self { clock: Arc::new(clock), timers: DashMap::new() }
    }

    /// Names of all timers that recorded at least one call, sorted
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.timers.iter().map(|e| e.key().clone()).collect();
        names.sort_unstable();
        names
    }

    /// Forget everything recorded for `name`
    pub fn remove(&self, name: &str) -> bool {
        self.timers.remove(name).is_some()
    }

    fn metrics_for(&self, name: &str) -> Arc<TimerMetrics> {
        if let Some(existing) = self.timers.get(name) {
            return Arc::clone(existing.value());
        }
        let entry = self.timers.entry(name.to_owned()).or_insert_with(|| {
            debug!(timer = name, "registering timer");
            Arc::new(TimerMetrics::new(Meter::new(self.clock.now())))
        });
        Arc::clone(entry.value())
    }
}

impl MetricRegistry for LocalRegistry {
    fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    fn record_call(&self, name: &str, elapsed: Duration, outcome: CallOutcome) {
        let metrics = self.metrics_for(name);
        let counter = match outcome {
            CallOutcome::Success => &metrics.successful,
            CallOutcome::Failure => &metrics.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        metrics.meter.mark(self.clock.now());
        metrics.durations.record(elapsed);
    }

    fn snapshot(&self, name: &str) -> Option<TimerSnapshot> {
        let metrics = self.timers.get(name).map(|e| Arc::clone(e.value()))?;
        let successful_calls = metrics.successful.load(Ordering::Relaxed);
        let failed_calls = metrics.failed.load(Ordering::Relaxed);
        let rates = metrics.meter.rates(self.clock.now());
        Some(TimerSnapshot {
            total_calls: successful_calls + failed_calls,
            successful_calls,
            failed_calls,
            one_minute_rate: rates.one_minute,
            five_minute_rate: rates.five_minute,
            fifteen_minute_rate: rates.fifteen_minute,
            mean_rate: rates.mean,
            durations: metrics.durations.snapshot(),
        })
    }
}

impl Default for LocalRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LocalRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalRegistry").field("timers", &self.names()).finish_non_exhaustive()
    }
}
