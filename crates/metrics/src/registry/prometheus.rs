//! Prometheus-backed registry
//!
//! Mirrors every timed call into a caller-supplied `prometheus::Registry`
//! and answers snapshots from an embedded [`LocalRegistry`], since the
//! exported counters and histograms carry no decaying rates.

use std::fmt;
use std::time::Duration;

use ::prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use rebound_common::time::Clock;

use super::local::LocalRegistry;
use super::{CallOutcome, MetricRegistry, TimerSnapshot};
use crate::error::MetricsResult;

const DURATION_BUCKETS: &[f64] =
    &[0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Registry exporting timer records to Prometheus
pub struct PrometheusRegistry {
    local: LocalRegistry,
    calls: IntCounterVec,
    durations: HistogramVec,
}

impl PrometheusRegistry {
    /// Register the timer collectors with `registry`, on the system clock
    pub fn new(registry: &Registry) -> MetricsResult<Self> {
        Self::with_local(registry, LocalRegistry::new())
    }

    /// Register the timer collectors with `registry`, keeping snapshots in
    /// `local`
    pub fn with_local(registry: &Registry, local: LocalRegistry) -> MetricsResult<Self> {
        let calls = IntCounterVec::new(
            Opts::new("rebound_timer_calls_total", "Total number of timed calls"),
            &["timer", "outcome"],
        )?;
        registry.register(Box::new(calls.clone()))?;

        let durations = HistogramVec::new(
            HistogramOpts::new("rebound_timer_duration_seconds", "Duration of timed calls")
                .buckets(DURATION_BUCKETS.to_vec()),
            &["timer"],
        )?;
        registry.register(Box::new(durations.clone()))?;

        Ok(Self { local, calls, durations })
    }
}

impl MetricRegistry for PrometheusRegistry {
    fn clock(&self) -> &dyn Clock {
        self.local.clock()
    }

    fn record_call(&self, name: &str, elapsed: Duration, outcome: CallOutcome) {
        let label = outcome.to_string();
        self.calls.with_label_values(&[name, label.as_str()]).inc();
        self.durations.with_label_values(&[name]).observe(elapsed.as_secs_f64());
        self.local.record_call(name, elapsed, outcome);
    }

    fn snapshot(&self, name: &str) -> Option<TimerSnapshot> {
        self.local.snapshot(name)
    }
}

impl fmt::Debug for PrometheusRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrometheusRegistry").field("local", &self.local).finish_non_exhaustive()
    }
}
