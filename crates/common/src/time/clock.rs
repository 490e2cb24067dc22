//! Time source abstraction
//!
//! Event timestamps and timer durations are read through [`Clock`] so tests
//! can drive time with [`MockClock`] instead of waiting.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use rebound_common::time::{Clock, MockClock};
//!
//! let mock = MockClock::new();
//! let start = mock.now();
//! mock.advance(Duration::from_secs(5));
//! assert_eq!(mock.now().duration_since(start), Duration::from_secs(5));
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Trait for time operations to enable testing
pub trait Clock: Send + Sync {
    /// Get current instant (monotonic time)
    fn now(&self) -> Instant;

    /// Get current system time (wall clock)
    fn system_time(&self) -> SystemTime;

    /// Get milliseconds since UNIX epoch
    fn millis_since_epoch(&self) -> u64 {
        let since = self.system_time().duration_since(UNIX_EPOCH).unwrap_or_default();
        u64::try_from(since.as_millis()).unwrap_or(u64::MAX)
    }
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn system_time(&self) -> SystemTime {
        (**self).system_time()
    }
}

/// Real system clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Mock clock for deterministic testing
///
/// Clones share the same elapsed time, so a clone handed to a sleeper or a
/// registry moves together with the one the test holds.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    elapsed: Arc<Mutex<Duration>>,
    base_system_time: SystemTime,
}

impl MockClock {
    /// Create a new mock clock anchored at the current real time
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
            base_system_time: SystemTime::now(),
        }
    }

    /// Create a mock clock whose wall time starts at `base`
    #[must_use]
    pub fn starting_at(base: SystemTime) -> Self {
        Self { base_system_time: base, ..Self::new() }
    }

    /// Advance the mock clock by a duration
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use rebound_common::time::MockClock;
    ///
    /// let clock = MockClock::new();
    /// clock.advance(Duration::from_secs(10));
    /// assert_eq!(clock.elapsed(), Duration::from_secs(10));
    /// ```
    pub fn advance(&self, duration: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(PoisonError::into_inner);
        *elapsed += duration;
    }

    /// Set the mock clock to a specific elapsed time
    pub fn set_elapsed(&self, duration: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(PoisonError::into_inner);
        *elapsed = duration;
    }

    /// Time simulated since the clock was created
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn system_time(&self) -> SystemTime {
        self.base_system_time + self.elapsed()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for time::clock.
    use super::*;

    /// Validates the system clock millis scenario.
    ///
    /// Assertions:
    /// - Ensures `millis > 0` evaluates to true.
    #[test]
    fn test_system_clock_millis() {
        let clock = SystemClock;
        assert!(clock.millis_since_epoch() > 0);
        assert!(clock.now() <= clock.now());
    }

    /// Validates that clones of a `MockClock` share elapsed time.
    ///
    /// Assertions:
    /// - Advancing the clone is visible through the original.
    #[test]
    fn test_mock_clock_clones_share_time() {
        let clock = MockClock::new();
        let start = clock.now();
        let handle = clock.clone();

        handle.advance(Duration::from_millis(750));

        assert_eq!(clock.now().duration_since(start), Duration::from_millis(750));
        assert_eq!(clock.elapsed(), Duration::from_millis(750));
    }

    /// Validates `MockClock::starting_at` and `set_elapsed`.
    ///
    /// Assertions:
    /// - Wall time starts at the given base and follows `set_elapsed`.
    #[test]
    fn test_mock_clock_starting_at() {
        let base = UNIX_EPOCH + Duration::from_secs(1_000);
        let clock = MockClock::starting_at(base);
        assert_eq!(clock.millis_since_epoch(), 1_000_000);

        clock.set_elapsed(Duration::from_secs(5));
        assert_eq!(clock.system_time(), base + Duration::from_secs(5));
    }

    /// Validates `Clock` through an `Arc<dyn Clock>`.
    ///
    /// Assertions:
    /// - The shared handle reports the mock's time.
    #[test]
    fn test_arc_dyn_clock() {
        let mock = MockClock::new();
        let shared: Arc<dyn Clock> = Arc::new(mock.clone());
        let before = shared.now();
        mock.advance(Duration::from_secs(1));
        assert_eq!(shared.now().duration_since(before), Duration::from_secs(1));
    }
}
