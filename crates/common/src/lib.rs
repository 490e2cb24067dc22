//! Shared building blocks for the Rebound crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: error taxonomy, clock abstraction, serde helpers, macros
//! - `observability`: tracing support (pulled in by `runtime`)
//! - `runtime`: sleepers and the event publisher (tokio, futures, parking_lot)
//!
//! `runtime` is enabled by default.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;
#[cfg(feature = "foundation")]
pub mod time;
#[cfg(feature = "foundation")]
#[macro_use]
pub mod utils;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod event;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use error::{BoxError, CommonError, CommonResult, ErrorClassification, ErrorSeverity};
#[cfg(feature = "runtime")]
pub use event::{EventPublisher, EventStream};
#[cfg(feature = "foundation")]
pub use time::{Clock, MockClock, SystemClock};
#[cfg(feature = "runtime")]
pub use time::{FnSleeper, RecordingSleeper, Sleeper, ThreadSleeper};
#[cfg(feature = "foundation")]
pub use utils::serde::{duration_millis, option_duration_millis};
