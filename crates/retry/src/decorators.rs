//! Decorators wrapping work units with a retry instance
//!
//! Each decorator returns a new callable with the same shape as its input.
//! Calling it runs the retry loop with a fresh per-call context; the
//! decorated callable can be invoked any number of times, from any thread
//! when the inner one allows it.
//!
//! ```
//! use std::io;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::sync::Arc;
//!
//! use rebound_common::time::RecordingSleeper;
//! use rebound_retry::{decorate_computation, Retry, RetryConfig};
//!
//! let config = RetryConfig::builder().sleeper(RecordingSleeper::new()).build().unwrap();
//! let retry = Retry::create("backend", config);
//!
//! let calls = Arc::new(AtomicU32::new(0));
//! let counter = Arc::clone(&calls);
//! let fetch = decorate_computation(&retry, move || {
//!     if counter.fetch_add(1, Ordering::SeqCst) == 0 {
//!         Err(io::Error::other("flaky"))
//!     } else {
//!         Ok("Hello world")
//!     }
//! });
//!
//! assert_eq!(fetch().unwrap(), "Hello world");
//! assert_eq!(calls.load(Ordering::SeqCst), 2);
//! ```

use std::error::Error as StdError;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use rebound_common::error::BoxError;

use crate::retry::{as_dyn_box, as_dyn_error, Retry};

/// Decorate an action that produces no value
pub fn decorate_action<F, E>(retry: &Retry, action: F) -> impl Fn() -> Result<(), E>
where
    F: Fn() -> Result<(), E>,
    E: StdError + 'static,
{
    let retry = retry.clone();
    move || retry.run(&action, as_dyn_error::<E>)
}

/// Decorate a computation producing a value
pub fn decorate_computation<F, T, E>(retry: &Retry, computation: F) -> impl Fn() -> Result<T, E>
where
    F: Fn() -> Result<T, E>,
    T: 'static,
    E: StdError + 'static,
{
    let retry = retry.clone();
    move || retry.run(&computation, as_dyn_error::<E>)
}

/// Decorate a computation that fails with boxed errors.
///
/// Classification sees the boxed error itself, so type predicates match the
/// concrete error inside the box.
pub fn decorate_checked_computation<F, T>(
    retry: &Retry,
    computation: F,
) -> impl Fn() -> Result<T, BoxError>
where
    F: Fn() -> Result<T, BoxError>,
    T: 'static,
{
    let retry = retry.clone();
    move || retry.run(&computation, as_dyn_box)
}

/// Decorate a one-argument function. Every attempt gets a clone of the
/// argument.
pub fn decorate_function<F, A, R, E>(retry: &Retry, function: F) -> impl Fn(A) -> Result<R, E>
where
    F: Fn(A) -> Result<R, E>,
    A: Clone,
    R: 'static,
    E: StdError + 'static,
{
    let retry = retry.clone();
    move |arg: A| retry.run(|| function(arg.clone()), as_dyn_error::<E>)
}

/// Decorate an async supplier.
///
/// The decorated supplier returns immediately with a future that drives the
/// retry loop when polled. Waits use the sleeper's async path, and dropping
/// the future cancels the remaining attempts.
pub fn decorate_async_supplier<F, Fut, T, E>(
    retry: &Retry,
    supplier: F,
) -> impl Fn() -> BoxFuture<'static, Result<T, E>>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: StdError + Send + 'static,
{
    let retry = retry.clone();
    let supplier = Arc::new(supplier);
    move || {
        let retry = retry.clone();
        let supplier = Arc::clone(&supplier);
        async move { retry.run_async(|| supplier(), as_dyn_error::<E>).await }.boxed()
    }
}
