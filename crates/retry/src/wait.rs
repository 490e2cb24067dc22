//! Wait strategies
//!
//! A [`WaitStrategy`] maps the 1-based number of the attempt that just failed
//! to the pause before the next one. Strategies hold no per-call state, so a
//! single strategy is shared by every call made through a retry instance.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::constants::{DEFAULT_MULTIPLIER, DEFAULT_RANDOMIZATION_FACTOR, DEFAULT_WAIT_DURATION};
use crate::error::{RetryError, RetryResult};

/// Function form of a custom wait strategy
pub type WaitFn = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// Pause to take after a failed attempt
#[derive(Clone)]
pub enum WaitStrategy {
    /// Same pause after every attempt
    Fixed(Duration),
    /// `initial + increment * (attempt - 1)`
    Linear { initial: Duration, increment: Duration },
    /// `initial * multiplier^(attempt - 1)`, capped at `max` when set
    Exponential { initial: Duration, multiplier: f64, max: Option<Duration> },
    /// Uniformly drawn from `interval * (1 ± randomization_factor)`
    Randomized { interval: Duration, randomization_factor: f64 },
    /// Exponential growth with the randomization applied to each step
    ExponentialRandomized {
        initial: Duration,
        multiplier: f64,
        randomization_factor: f64,
        max: Option<Duration>,
    },
    /// Caller-supplied function of the attempt number
    Custom(WaitFn),
}

impl WaitStrategy {
    /// Fixed pause
    #[must_use]
    pub const fn fixed(wait: Duration) -> Self {
        Self::Fixed(wait)
    }

    /// Exponential growth with the default multiplier and no cap
    #[must_use]
    pub const fn exponential(initial: Duration) -> Self {
        Self::Exponential { initial, multiplier: DEFAULT_MULTIPLIER, max: None }
    }

    /// Fixed interval jittered by the default randomization factor
    #[must_use]
    pub const fn randomized(interval: Duration) -> Self {
        Self::Randomized { interval, randomization_factor: DEFAULT_RANDOMIZATION_FACTOR }
    }

    /// Wrap a function of the attempt number
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Pause after the failed `attempt` (1-based).
    ///
    /// Attempt `0` is treated as `1`.
    #[must_use]
    pub fn wait_for(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match self {
            Self::Fixed(wait) => *wait,
            Self::Linear { initial, increment } => {
                initial.saturating_add(increment.saturating_mul(attempt - 1))
            }
            Self::Exponential { initial, multiplier, max } => {
                let millis = exponential_millis(*initial, *multiplier, attempt);
                to_duration(millis, *max)
            }
            Self::Randomized { interval, randomization_factor } => {
                let millis = randomize(as_millis_f64(*interval), *randomization_factor);
                to_duration(millis, None)
            }
            Self::ExponentialRandomized { initial, multiplier, randomization_factor, max } => {
                let base = exponential_millis(*initial, *multiplier, attempt);
                let base = max.map_or(base, |cap| base.min(as_millis_f64(cap)));
                to_duration(randomize(base, *randomization_factor), *max)
            }
            Self::Custom(f) => f(attempt),
        }
    }

    /// Reject parameters that cannot produce a sane schedule
    pub fn validate(&self) -> RetryResult<()> {
        match self {
            Self::Fixed(_) | Self::Linear { .. } | Self::Custom(_) => Ok(()),
            Self::Exponential { multiplier, .. } => check_multiplier(*multiplier),
            Self::Randomized { randomization_factor, .. } => {
                check_randomization_factor(*randomization_factor)
            }
            Self::ExponentialRandomized { multiplier, randomization_factor, .. } => {
                check_multiplier(*multiplier)?;
                check_randomization_factor(*randomization_factor)
            }
        }
    }
}

impl Default for WaitStrategy {
    fn default() -> Self {
        Self::Fixed(DEFAULT_WAIT_DURATION)
    }
}

impl fmt::Debug for WaitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(wait) => f.debug_tuple("Fixed").field(wait).finish(),
            Self::Linear { initial, increment } => f
                .debug_struct("Linear")
                .field("initial", initial)
                .field("increment", increment)
                .finish(),
            Self::Exponential { initial, multiplier, max } => f
                .debug_struct("Exponential")
                .field("initial", initial)
                .field("multiplier", multiplier)
                .field("max", max)
                .finish(),
            Self::Randomized { interval, randomization_factor } => f
                .debug_struct("Randomized")
                .field("interval", interval)
                .field("randomization_factor", randomization_factor)
                .finish(),
            Self::ExponentialRandomized { initial, multiplier, randomization_factor, max } => f
                .debug_struct("ExponentialRandomized")
                .field("initial", initial)
                .field("multiplier", multiplier)
                .field("randomization_factor", randomization_factor)
                .field("max", max)
                .finish(),
            Self::Custom(_) => f.write_str("Custom(<fn>)"),
        }
    }
}

fn check_multiplier(multiplier: f64) -> RetryResult<()> {
    if multiplier.is_finite() && multiplier >= 1.0 {
        Ok(())
    } else {
        Err(RetryError::invalid(format!("multiplier must be a finite value >= 1.0, got {multiplier}")))
    }
}

fn check_randomization_factor(factor: f64) -> RetryResult<()> {
    if (0.0..=1.0).contains(&factor) {
        Ok(())
    } else {
        Err(RetryError::invalid(format!("randomization_factor must be in [0, 1], got {factor}")))
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_millis_f64(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1_000.0
}

fn exponential_millis(initial: Duration, multiplier: f64, attempt: u32) -> f64 {
    let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
    as_millis_f64(initial) * multiplier.powi(exponent)
}

fn randomize(millis: f64, factor: f64) -> f64 {
    if factor <= 0.0 || millis <= 0.0 {
        return millis;
    }
    let delta = millis * factor;
    rand::thread_rng().gen_range((millis - delta)..=(millis + delta))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_duration(millis: f64, cap: Option<Duration>) -> Duration {
    let wait = if millis.is_finite() && millis < u64::MAX as f64 {
        Duration::from_micros((millis.max(0.0) * 1_000.0) as u64)
    } else {
        Duration::MAX
    };
    cap.map_or(wait, |cap| wait.min(cap))
}

#[cfg(test)]
mod tests {
    //! Unit tests for wait strategies.
    use super::*;

    /// Validates the default strategy.
    ///
    /// Assertions:
    /// - Default is a fixed 500ms wait for every attempt.
    #[test]
    fn test_default_is_fixed() {
        let strategy = WaitStrategy::default();
        assert_eq!(strategy.wait_for(1), Duration::from_millis(500));
        assert_eq!(strategy.wait_for(7), Duration::from_millis(500));
    }

    /// Validates linear growth.
    ///
    /// Assertions:
    /// - Attempt 1 waits `initial`; each later attempt adds `increment`.
    #[test]
    fn test_linear() {
        let strategy = WaitStrategy::Linear {
            initial: Duration::from_millis(100),
            increment: Duration::from_millis(50),
        };
        assert_eq!(strategy.wait_for(1), Duration::from_millis(100));
        assert_eq!(strategy.wait_for(3), Duration::from_millis(200));
    }

    /// Validates exponential growth and capping.
    ///
    /// Assertions:
    /// - Waits double per attempt with multiplier 2.
    /// - The cap bounds later attempts.
    #[test]
    fn test_exponential_with_cap() {
        let strategy = WaitStrategy::Exponential {
            initial: Duration::from_millis(100),
            multiplier: 2.0,
            max: Some(Duration::from_millis(500)),
        };
        assert_eq!(strategy.wait_for(1), Duration::from_millis(100));
        assert_eq!(strategy.wait_for(2), Duration::from_millis(200));
        assert_eq!(strategy.wait_for(3), Duration::from_millis(400));
        assert_eq!(strategy.wait_for(4), Duration::from_millis(500));
        assert_eq!(strategy.wait_for(60), Duration::from_millis(500));
    }

    /// Validates that huge exponents saturate instead of overflowing.
    ///
    /// Assertions:
    /// - Uncapped waits at extreme attempts clamp to `Duration::MAX`.
    #[test]
    fn test_exponential_saturates() {
        let strategy = WaitStrategy::exponential(Duration::from_secs(1));
        assert_eq!(strategy.wait_for(u32::MAX), Duration::MAX);
    }

    /// Validates randomized waits stay inside their band.
    ///
    /// Assertions:
    /// - Every draw lies within `interval * (1 ± factor)`.
    #[test]
    fn test_randomized_bounds() {
        let strategy = WaitStrategy::Randomized {
            interval: Duration::from_millis(1_000),
            randomization_factor: 0.25,
        };
        for attempt in 1..200 {
            let wait = strategy.wait_for(attempt);
            assert!(wait >= Duration::from_millis(750), "{wait:?}");
            assert!(wait <= Duration::from_millis(1_250), "{wait:?}");
        }
    }

    /// Validates exponential randomized waits respect the cap.
    ///
    /// Assertions:
    /// - Draws never exceed `max`.
    #[test]
    fn test_exponential_randomized_cap() {
        let strategy = WaitStrategy::ExponentialRandomized {
            initial: Duration::from_millis(100),
            multiplier: 3.0,
            randomization_factor: 0.5,
            max: Some(Duration::from_secs(1)),
        };
        for attempt in 1..20 {
            assert!(strategy.wait_for(attempt) <= Duration::from_secs(1));
        }
    }

    /// Validates custom functions receive the 1-based attempt.
    ///
    /// Assertions:
    /// - The closure result is returned verbatim.
    /// - Attempt 0 is clamped to 1.
    #[test]
    fn test_custom() {
        let strategy = WaitStrategy::custom(|attempt| Duration::from_millis(u64::from(attempt) * 7));
        assert_eq!(strategy.wait_for(3), Duration::from_millis(21));
        assert_eq!(strategy.wait_for(0), Duration::from_millis(7));
        assert_eq!(format!("{strategy:?}"), "Custom(<fn>)");
    }

    /// Validates parameter checks.
    ///
    /// Assertions:
    /// - Multipliers below 1 or NaN are rejected.
    /// - Randomization factors outside [0, 1] are rejected.
    #[test]
    fn test_validate() {
        let shrinking = WaitStrategy::Exponential {
            initial: Duration::from_millis(10),
            multiplier: 0.5,
            max: None,
        };
        assert!(shrinking.validate().is_err());

        let nan = WaitStrategy::Exponential {
            initial: Duration::from_millis(10),
            multiplier: f64::NAN,
            max: None,
        };
        assert!(nan.validate().is_err());

        let wide = WaitStrategy::Randomized {
            interval: Duration::from_millis(10),
            randomization_factor: 1.5,
        };
        assert!(wide.validate().is_err());

        assert!(WaitStrategy::randomized(Duration::from_millis(10)).validate().is_ok());
        assert!(WaitStrategy::default().validate().is_ok());
    }
}
