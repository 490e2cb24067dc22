// Constants for the retry crate
use std::time::Duration;

/// Default maximum number of attempts, the first call included
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default fixed wait between attempts
pub const DEFAULT_WAIT_DURATION: Duration = Duration::from_millis(500);

/// Default multiplier for exponential wait strategies
pub const DEFAULT_MULTIPLIER: f64 = 1.5;

/// Default randomization factor for randomized wait strategies
pub const DEFAULT_RANDOMIZATION_FACTOR: f64 = 0.5;

/// Minimum allowed max_attempts value
pub const MIN_MAX_ATTEMPTS: u32 = 1;
