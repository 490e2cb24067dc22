//! Metric registries
//!
//! A [`MetricRegistry`] is where timers send finished calls. The timer only
//! asks it for the time and hands it `(name, elapsed, outcome)` records;
//! aggregation lives entirely behind the trait.

use std::time::Duration;

use rebound_common::impl_status_conversions;
use rebound_common::time::Clock;
use serde::Serialize;

mod histogram;
mod local;
mod meter;
#[cfg(feature = "prometheus")]
mod prometheus;

pub use histogram::DurationSnapshot;
pub use local::LocalRegistry;
#[cfg(feature = "prometheus")]
pub use self::prometheus::PrometheusRegistry;

/// How a timed call finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CallOutcome {
    Success,
    Failure,
}

impl_status_conversions!(CallOutcome {
    Success => "success",
    Failure => "failure",
});

/// Sink for timed calls
pub trait MetricRegistry: Send + Sync {
    /// Clock used to measure call durations
    fn clock(&self) -> &dyn Clock;

    /// Record one finished call of the timer `name`
    fn record_call(&self, name: &str, elapsed: Duration, outcome: CallOutcome);

    /// Current figures for `name`, or `None` if it never recorded a call
    fn snapshot(&self, name: &str) -> Option<TimerSnapshot>;
}

/// Read-only view of a timer's figures
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TimerSnapshot {
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    /// Calls per second, exponentially weighted over one minute
    pub one_minute_rate: f64,
    pub five_minute_rate: f64,
    pub fifteen_minute_rate: f64,
    /// Calls per second since the timer's first call
    pub mean_rate: f64,
    pub durations: DurationSnapshot,
}

impl TimerSnapshot {
    /// Fraction of calls that failed, or `None` before any call
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn failure_rate(&self) -> Option<f64> {
        (self.total_calls > 0).then(|| self.failed_calls as f64 / self.total_calls as f64)
    }
}
