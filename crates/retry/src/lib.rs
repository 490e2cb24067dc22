//! # Rebound Retry
//!
//! Retry decorators with pluggable wait strategies and lifecycle events.
//!
//! A [`Retry`] instance wraps units of work (actions, computations, checked
//! computations, one-argument functions and async suppliers) and re-invokes
//! them on qualifying failures, up to a bounded number of attempts. Every
//! outcome is published as a [`RetryEvent`] on the instance's event stream.
//!
//! ## Quick Start
//!
//! ```
//! use std::io;
//! use std::time::Duration;
//!
//! use rebound_common::time::RecordingSleeper;
//! use rebound_retry::{Retry, RetryConfig, RetryEventType};
//!
//! let sleeper = RecordingSleeper::new();
//! let config = RetryConfig::builder()
//!     .max_attempts(3)
//!     .wait_duration(Duration::from_millis(500))
//!     .retry_on_type::<io::Error>()
//!     .sleeper(sleeper.clone())
//!     .build()?;
//! let retry = Retry::create("backend", config);
//! let mut events = retry.event_stream();
//!
//! let result: Result<(), io::Error> =
//!     retry.execute_action(|| Err(io::Error::other("connection refused")));
//!
//! assert!(result.is_err());
//! assert_eq!(sleeper.total(), Duration::from_secs(1));
//! let kinds: Vec<_> = events.drain().iter().map(|e| e.event_type()).collect();
//! assert_eq!(kinds, [RetryEventType::Retry, RetryEventType::Retry, RetryEventType::Error]);
//! # Ok::<(), rebound_retry::RetryError>(())
//! ```
//!
//! ## Outcomes
//!
//! - Accepted value: SUCCESS, value returned.
//! - Ignored error: IGNORED_ERROR, error returned unchanged, no retry.
//! - Retryable error with attempts left: RETRY, wait, try again.
//! - Terminal error or last attempt: ERROR, the original error returned.
//!
//! A result predicate can also reject produced values; a rejected value is
//! retried like a retryable error and returned as is once attempts run out.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod classifier;
pub mod config;
pub mod constants;
pub mod context;
pub mod decorators;
pub mod error;
pub mod event;
pub mod metrics;
pub mod properties;
pub mod registry;
pub mod retry;
pub mod wait;

pub use classifier::{ErrorPredicate, Outcome, OutcomeClassifier, ResultPredicate};
pub use config::{RetryConfig, RetryConfigBuilder};
pub use context::{Decision, RetryContext, RetryState};
pub use decorators::{
    decorate_action, decorate_async_supplier, decorate_checked_computation,
    decorate_computation, decorate_function,
};
pub use error::{RetryError, RetryResult};
pub use event::{RetryEvent, RetryEventType};
pub use metrics::RetryMetrics;
pub use properties::{ExponentialBackoffProperties, RegistryProperties, RetryProperties};
pub use registry::RetryRegistry;
pub use retry::Retry;
pub use wait::{WaitFn, WaitStrategy};
