//! Call duration distribution
//!
//! Durations land in logarithmic buckets between 1µs and one hour. Recording
//! is lock-free; percentiles are read from a snapshot of the buckets and are
//! accurate to one bucket width (about 12%), clamped to the exact recorded
//! minimum and maximum.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Duration;

use serde::Serialize;

const NUM_BUCKETS: usize = 200;
const MIN_MICROS: u64 = 1;
const MAX_MICROS: u64 = 3_600_000_000;

/// Statistical view of recorded call durations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DurationSnapshot {
    /// Number of recorded durations
    pub count: u64,
    pub min: Duration,
    pub max: Duration,
    pub mean: Duration,
    /// Sample standard deviation, zero below two samples
    pub stddev: Duration,
    pub median: Duration,
    pub p75: Duration,
    pub p95: Duration,
    pub p98: Duration,
    pub p99: Duration,
    pub p999: Duration,
}

#[derive(Debug)]
pub(crate) struct DurationHistogram {
    buckets: [AtomicU64; NUM_BUCKETS],
    sum_micros: AtomicU64,
    min_micros: AtomicU64,
    max_micros: AtomicU64,
}

impl DurationHistogram {
    pub(crate) fn new() -> Self {
        Self {
            buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            sum_micros: AtomicU64::new(0),
            min_micros: AtomicU64::new(u64::MAX),
            max_micros: AtomicU64::new(0),
        }
    }

    pub(crate) fn record(&self, duration: Duration) {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX).min(MAX_MICROS);

        saturating_fetch_add(&self.sum_micros, micros);
        self.min_micros.fetch_min(micros, Ordering::AcqRel);
        self.max_micros.fetch_max(micros, Ordering::AcqRel);
        // Counted last: a snapshot that sees this sample also sees its extremes.
        self.buckets[bucket_of(micros)].fetch_add(1, Ordering::Release);
    }

    pub(crate) fn snapshot(&self) -> DurationSnapshot {
        let buckets: [u64; NUM_BUCKETS] =
            std::array::from_fn(|i| self.buckets[i].load(Ordering::Acquire));
        let count: u64 = buckets.iter().sum();
        if count == 0 {
            return DurationSnapshot::default();
        }

        let min = self.min_micros.load(Ordering::Acquire).min(MAX_MICROS);
        let max = self.max_micros.load(Ordering::Acquire).max(min);
        let mean = (self.sum_micros.load(Ordering::Acquire) / count).clamp(min, max);

        let view = BucketView { buckets: &buckets, count, min, max };
        DurationSnapshot {
            count,
            min: Duration::from_micros(min),
            max: Duration::from_micros(max),
            mean: Duration::from_micros(mean),
            stddev: Duration::from_micros(view.stddev(mean)),
            median: view.percentile(0.5),
            p75: view.percentile(0.75),
            p95: view.percentile(0.95),
            p98: view.percentile(0.98),
            p99: view.percentile(0.99),
            p999: view.percentile(0.999),
        }
    }
}

impl Default for DurationHistogram {
    fn default() -> Self {
        Self::new()
    }
}

struct BucketView<'a> {
    buckets: &'a [u64; NUM_BUCKETS],
    count: u64,
    min: u64,
    max: u64,
}

impl BucketView<'_> {
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn percentile(&self, quantile: f64) -> Duration {
        let rank = ((self.count - 1) as f64 * quantile).ceil() as u64;
        let mut seen = 0_u64;
        for (index, &in_bucket) in self.buckets.iter().enumerate() {
            seen += in_bucket;
            if seen > rank {
                return Duration::from_micros(midpoint_of(index).clamp(self.min, self.max));
            }
        }
        Duration::from_micros(self.max)
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn stddev(&self, mean: u64) -> u64 {
        if self.count < 2 {
            return 0;
        }
        let mean = mean as f64;
        let squares: f64 = self
            .buckets
            .iter()
            .enumerate()
            .filter(|(_, n)| **n > 0)
            .map(|(index, &n)| {
                let value = midpoint_of(index).clamp(self.min, self.max) as f64;
                (value - mean).powi(2) * n as f64
            })
            .sum();
        (squares / (self.count - 1) as f64).sqrt() as u64
    }
}

/// (ratio between bucket bounds, its natural log)
#[allow(clippy::cast_precision_loss)]
fn scalars() -> (f64, f64) {
    static SCALARS: OnceLock<(f64, f64)> = OnceLock::new();
    *SCALARS.get_or_init(|| {
        let ratio = (MAX_MICROS as f64 / MIN_MICROS as f64).powf(1.0 / (NUM_BUCKETS as f64 - 1.0));
        (ratio, ratio.ln())
    })
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn bucket_of(micros: u64) -> usize {
    if micros <= MIN_MICROS {
        return 0;
    }
    let (_, ratio_ln) = scalars();
    let index = ((micros as f64 / MIN_MICROS as f64).ln() / ratio_ln).floor() as usize;
    index.min(NUM_BUCKETS - 1)
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn midpoint_of(index: usize) -> u64 {
    if index == 0 {
        return MIN_MICROS;
    }
    let (ratio, _) = scalars();
    (MIN_MICROS as f64 * ratio.powf(index as f64 + 0.5)).round() as u64
}

fn saturating_fetch_add(target: &AtomicU64, value: u64) {
    let mut current = target.load(Ordering::Relaxed);
    loop {
        let next = current.saturating_add(value);
        match target.compare_exchange_weak(current, next, Ordering::Release, Ordering::Relaxed) {
            Ok(_) => break,
            Err(actual) => current = actual,
        }
    }
}
