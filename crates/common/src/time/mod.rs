//! Time abstractions
//!
//! - **[`clock`]**: real and mock time sources
//! - **[`sleep`]**: blocking and async wait primitives (`runtime` tier)

pub mod clock;
#[cfg(feature = "runtime")]
pub mod sleep;

pub use clock::{Clock, MockClock, SystemClock};
#[cfg(feature = "runtime")]
pub use sleep::{FnSleeper, RecordingSleeper, Sleeper, ThreadSleeper};
