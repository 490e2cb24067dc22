//! # Rebound Metrics
//!
//! Call timers that record durations, outcomes and decaying call rates.
//!
//! A [`Timer`] wraps the same work shapes as the retry decorators but runs
//! each call exactly once. Records go to a [`MetricRegistry`]: the in-process
//! [`LocalRegistry`] by default, or a Prometheus exporter with the
//! `prometheus` feature.
//!
//! ```
//! use std::sync::Arc;
//!
//! use rebound_metrics::{decorate_computation, LocalRegistry, MetricRegistry, Timer};
//!
//! let registry = Arc::new(LocalRegistry::new());
//! let timer = Timer::of_registry("pricing", registry.clone());
//!
//! let quote = decorate_computation(&timer, || "19.99".parse::<f64>());
//! assert!(quote().is_ok());
//! assert!(quote().is_ok());
//!
//! let snapshot = registry.snapshot("pricing").unwrap();
//! assert_eq!(snapshot.successful_calls, 2);
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod decorators;
pub mod error;
pub mod registry;
pub mod timer;

pub use decorators::{
    decorate_action, decorate_async_supplier, decorate_checked_computation,
    decorate_computation, decorate_function,
};
pub use error::{MetricsError, MetricsResult};
#[cfg(feature = "prometheus")]
pub use registry::PrometheusRegistry;
pub use registry::{
    CallOutcome, DurationSnapshot, LocalRegistry, MetricRegistry, TimerSnapshot,
};
pub use timer::{Timer, TimerContext};
