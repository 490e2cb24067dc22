//! Decorators timing work units with a [`Timer`]
//!
//! Same shapes as the retry decorators, without the loop: each call of the
//! decorated callable is timed once and recorded as a success or failure
//! according to its result.

use std::future::Future;

use futures::future::{BoxFuture, FutureExt};
use rebound_common::error::BoxError;

use crate::timer::{timed, Timer};

/// Decorate an action that produces no value
pub fn decorate_action<F, E>(timer: &Timer, action: F) -> impl Fn() -> Result<(), E>
where
    F: Fn() -> Result<(), E>,
{
    let timer = timer.clone();
    move || timer.record(&action)
}

/// Decorate a computation producing a value
pub fn decorate_computation<F, T, E>(timer: &Timer, computation: F) -> impl Fn() -> Result<T, E>
where
    F: Fn() -> Result<T, E>,
{
    let timer = timer.clone();
    move || timer.record(&computation)
}

/// Decorate a computation that fails with boxed errors
pub fn decorate_checked_computation<F, T>(
    timer: &Timer,
    computation: F,
) -> impl Fn() -> Result<T, BoxError>
where
    F: Fn() -> Result<T, BoxError>,
{
    let timer = timer.clone();
    move || timer.record(&computation)
}

/// Decorate a one-argument function
pub fn decorate_function<F, A, R, E>(timer: &Timer, function: F) -> impl Fn(A) -> Result<R, E>
where
    F: Fn(A) -> Result<R, E>,
{
    let timer = timer.clone();
    move |arg: A| timer.record(|| function(arg))
}

/// Decorate an async supplier.
///
/// Timing starts when the decorated supplier is called and stops when the
/// returned future completes, not when the supplier returns.
pub fn decorate_async_supplier<F, Fut, T, E>(
    timer: &Timer,
    supplier: F,
) -> impl Fn() -> BoxFuture<'static, Result<T, E>>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let timer = timer.clone();
    move || timed(timer.time(), supplier()).boxed()
}
