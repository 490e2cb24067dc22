//! Decaying call rates
//!
//! A [`Meter`] counts marks and folds them into 1, 5 and 15 minute
//! exponentially weighted moving averages every five seconds. Time is passed
//! in by the caller, so a mock clock drives the decay deterministically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

const TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Per-second rates at one point in time
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct MeterRates {
    pub(crate) one_minute: f64,
    pub(crate) five_minute: f64,
    pub(crate) fifteen_minute: f64,
    pub(crate) mean: f64,
}

#[derive(Debug, Clone, Copy)]
struct Ewma {
    alpha: f64,
    rate: f64,
    has_inputs: bool,
}

impl Ewma {
    fn over_minutes(minutes: f64) -> Self {
        let alpha = 1.0 - (-TICK_INTERVAL.as_secs_f64() / 60.0 / minutes).exp();
        Self { alpha, rate: 0.0, has_inputs: false }
    }

    #[allow(clippy::cast_precision_loss)]
    fn update(&mut self, count: u64) {
        let instant_rate = count as f64 / TICK_INTERVAL.as_secs_f64();
        if self.has_inputs {
            self.rate += self.alpha * (instant_rate - self.rate);
        } else {
            self.rate = instant_rate;
            self.has_inputs = true;
        }
    }

    /// Apply `ticks` intervals without marks
    fn decay(&mut self, ticks: u32) {
        if self.has_inputs {
            self.rate *= (1.0 - self.alpha).powi(i32::try_from(ticks).unwrap_or(i32::MAX));
        }
    }
}

#[derive(Debug)]
struct MeterState {
    uncounted: u64,
    last_tick: Instant,
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
}

impl MeterState {
    fn tick_until(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_tick);
        let ticks = elapsed.as_nanos() / TICK_INTERVAL.as_nanos();
        if ticks == 0 {
            return;
        }
        let uncounted = std::mem::take(&mut self.uncounted);
        let idle = u32::try_from(ticks - 1).unwrap_or(u32::MAX);
        for ewma in [&mut self.m1, &mut self.m5, &mut self.m15] {
            ewma.update(uncounted);
            ewma.decay(idle);
        }
        let advance = TICK_INTERVAL.saturating_mul(u32::try_from(ticks).unwrap_or(u32::MAX));
        self.last_tick = self.last_tick.checked_add(advance).unwrap_or(now);
    }
}

/// Event counter with decaying rates
#[derive(Debug)]
pub(crate) struct Meter {
    count: AtomicU64,
    started_at: Instant,
    state: Mutex<MeterState>,
}

impl Meter {
    pub(crate) fn new(now: Instant) -> Self {
        Self {
            count: AtomicU64::new(0),
            started_at: now,
            state: Mutex::new(MeterState {
                uncounted: 0,
                last_tick: now,
                m1: Ewma::over_minutes(1.0),
                m5: Ewma::over_minutes(5.0),
                m15: Ewma::over_minutes(15.0),
            }),
        }
    }

    pub(crate) fn mark(&self, now: Instant) {
        let mut state = self.state.lock();
        state.tick_until(now);
        state.uncounted += 1;
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn rates(&self, now: Instant) -> MeterRates {
        let mut state = self.state.lock();
        state.tick_until(now);
        let elapsed = now.saturating_duration_since(self.started_at).as_secs_f64();
        let mean = if elapsed > 0.0 { self.count() as f64 / elapsed } else { 0.0 };
        MeterRates {
            one_minute: state.m1.rate,
            five_minute: state.m5.rate,
            fifteen_minute: state.m15.rate,
            mean,
        }
    }
}
