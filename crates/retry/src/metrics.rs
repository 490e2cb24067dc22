// Call counters for a retry instance
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Point-in-time view of a retry instance's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RetryMetrics {
    /// Calls that succeeded on the first attempt (ignored errors included)
    pub successful_calls_without_retry: u64,
    /// Calls that succeeded after at least one retry
    pub successful_calls_with_retry: u64,
    /// Calls that failed on the first attempt without retrying
    pub failed_calls_without_retry: u64,
    /// Calls that failed after at least one retry
    pub failed_calls_with_retry: u64,
    /// RETRY transitions across all calls
    pub retry_attempts: u64,
}

impl RetryMetrics {
    /// Total finished calls
    #[must_use]
    pub const fn total_calls(&self) -> u64 {
        self.successful_calls_without_retry
            + self.successful_calls_with_retry
            + self.failed_calls_without_retry
            + self.failed_calls_with_retry
    }

    /// Fraction of finished calls that succeeded, or `None` before any call
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> Option<f64> {
        let total = self.total_calls();
        (total > 0).then(|| {
            (self.successful_calls_without_retry + self.successful_calls_with_retry) as f64
                / total as f64
        })
    }
}

impl fmt::Display for RetryMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RetryMetrics {{ ok: {}, ok_after_retry: {}, failed: {}, failed_after_retry: {}, \
             retries: {} }}",
            self.successful_calls_without_retry,
            self.successful_calls_with_retry,
            self.failed_calls_without_retry,
            self.failed_calls_with_retry,
            self.retry_attempts
        )
    }
}

#[derive(Debug, Default)]
pub(crate) struct MetricsRecorder {
    successful_without_retry: AtomicU64,
    successful_with_retry: AtomicU64,
    failed_without_retry: AtomicU64,
    failed_with_retry: AtomicU64,
    retry_attempts: AtomicU64,
}

impl MetricsRecorder {
    pub(crate) fn record_success(&self, attempts: u32) {
        let counter = if attempts > 1 {
            &self.successful_with_retry
        } else {
            &self.successful_without_retry
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self, attempts: u32) {
        let counter =
            if attempts > 1 { &self.failed_with_retry } else { &self.failed_without_retry };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retry(&self) {
        self.retry_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> RetryMetrics {
        RetryMetrics {
            successful_calls_without_retry: self.successful_without_retry.load(Ordering::Relaxed),
            successful_calls_with_retry: self.successful_with_retry.load(Ordering::Relaxed),
            failed_calls_without_retry: self.failed_without_retry.load(Ordering::Relaxed),
            failed_calls_with_retry: self.failed_with_retry.load(Ordering::Relaxed),
            retry_attempts: self.retry_attempts.load(Ordering::Relaxed),
        }
    }
}
