//! Wait primitives
//!
//! Anything that pauses between attempts does so through a [`Sleeper`]
//! carried in its configuration. Production code uses [`ThreadSleeper`];
//! tests swap in [`RecordingSleeper`] or an [`FnSleeper`] and never wait on
//! the wall clock.

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use futures::channel::oneshot;
use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::Mutex;
use tracing::warn;

use super::clock::MockClock;

/// Pauses the current call for a given duration.
pub trait Sleeper: Send + Sync {
    /// Block the calling thread for `duration`.
    fn sleep(&self, duration: Duration);

    /// Resolve after `duration` without blocking a thread.
    ///
    /// Dropping the returned future cancels the wait.
    fn sleep_async(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

impl<T: Sleeper + ?Sized> Sleeper for Arc<T> {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }

    fn sleep_async(&self, duration: Duration) -> BoxFuture<'static, ()> {
        (**self).sleep_async(duration)
    }
}

/// Real waits: `std::thread::sleep` and `tokio::time::sleep`.
///
/// Async waits use the tokio timer when called inside a tokio runtime. On
/// any other executor a short-lived timer thread completes the wait, so no
/// executor thread is blocked.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }

    fn sleep_async(&self, duration: Duration) -> BoxFuture<'static, ()> {
        if duration.is_zero() {
            return future::ready(()).boxed();
        }
        match tokio::runtime::Handle::try_current() {
            Ok(_) => tokio::time::sleep(duration).boxed(),
            Err(_) => sleep_on_timer_thread(duration),
        }
    }
}

/// Complete after `duration` from a dedicated thread. Dropping the future
/// only detaches the thread.
fn sleep_on_timer_thread(duration: Duration) -> BoxFuture<'static, ()> {
    let (done, waited) = oneshot::channel::<()>();
    let spawned = thread::Builder::new().name("rebound-sleep".to_owned()).spawn(move || {
        thread::sleep(duration);
        let _ = done.send(());
    });
    match spawned {
        Ok(_) => waited.map(|_| ()).boxed(),
        Err(err) => {
            warn!(error = %err, "timer thread unavailable, blocking for the wait");
            thread::sleep(duration);
            future::ready(()).boxed()
        }
    }
}

/// Delegates every wait to a caller-supplied function.
///
/// The async variant runs the function when the returned future is first
/// polled and then completes immediately.
#[derive(Clone)]
pub struct FnSleeper {
    f: Arc<dyn Fn(Duration) + Send + Sync>,
}

impl FnSleeper {
    /// Wrap `f` as a sleeper.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }
}

impl fmt::Debug for FnSleeper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSleeper").finish_non_exhaustive()
    }
}

impl Sleeper for FnSleeper {
    fn sleep(&self, duration: Duration) {
        (self.f)(duration);
    }

    fn sleep_async(&self, duration: Duration) -> BoxFuture<'static, ()> {
        let f = Arc::clone(&self.f);
        async move { f(duration) }.boxed()
    }
}

/// Records requested waits and returns at once.
///
/// Optionally advances a [`MockClock`] by each requested wait, so timestamps
/// and timer durations observed after a "sleep" line up with it.
///
/// ```
/// use std::time::Duration;
///
/// use rebound_common::time::{RecordingSleeper, Sleeper};
///
/// let sleeper = RecordingSleeper::new();
/// sleeper.sleep(Duration::from_millis(500));
/// sleeper.sleep(Duration::from_millis(500));
/// assert_eq!(sleeper.total(), Duration::from_secs(1));
/// assert_eq!(sleeper.count(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    waits: Arc<Mutex<Vec<Duration>>>,
    clock: Option<MockClock>,
}

impl RecordingSleeper {
    /// Create a sleeper with no clock attached
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sleeper that advances `clock` by every recorded wait
    #[must_use]
    pub fn with_clock(clock: MockClock) -> Self {
        Self { waits: Arc::default(), clock: Some(clock) }
    }

    /// Every wait requested so far, in order
    #[must_use]
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().clone()
    }

    /// Sum of all requested waits
    #[must_use]
    pub fn total(&self) -> Duration {
        self.waits.lock().iter().sum()
    }

    /// Number of waits requested
    #[must_use]
    pub fn count(&self) -> usize {
        self.waits.lock().len()
    }

    /// Forget recorded waits
    pub fn reset(&self) {
        self.waits.lock().clear();
    }

    fn record(&self, duration: Duration) {
        self.waits.lock().push(duration);
        if let Some(clock) = &self.clock {
            clock.advance(duration);
        }
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.record(duration);
    }

    fn sleep_async(&self, duration: Duration) -> BoxFuture<'static, ()> {
        self.record(duration);
        future::ready(()).boxed()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for time::sleep.
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;
    use crate::time::Clock;

    /// Validates that `RecordingSleeper` advances an attached mock clock.
    ///
    /// Assertions:
    /// - Clock elapsed equals the sum of recorded waits.
    #[test]
    fn test_recording_sleeper_advances_clock() {
        let clock = MockClock::new();
        let sleeper = RecordingSleeper::with_clock(clock.clone());
        let start = clock.now();

        sleeper.sleep(Duration::from_millis(100));
        sleeper.sleep(Duration::from_millis(250));

        assert_eq!(sleeper.waits(), vec![Duration::from_millis(100), Duration::from_millis(250)]);
        assert_eq!(clock.now().duration_since(start), Duration::from_millis(350));

        sleeper.reset();
        assert_eq!(sleeper.count(), 0);
    }

    /// Validates that `FnSleeper` forwards blocking and async waits.
    ///
    /// Assertions:
    /// - The function sees every requested duration.
    #[tokio::test]
    async fn test_fn_sleeper_forwards_waits() {
        let slept = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&slept);
        let sleeper = FnSleeper::new(move |d| {
            counter.fetch_add(u64::try_from(d.as_millis()).unwrap(), Ordering::SeqCst);
        });

        sleeper.sleep(Duration::from_millis(40));
        sleeper.sleep_async(Duration::from_millis(2)).await;

        assert_eq!(slept.load(Ordering::SeqCst), 42);
    }

    /// Validates that the async `FnSleeper` waits lazily.
    ///
    /// Assertions:
    /// - Nothing is recorded until the future is polled.
    #[test]
    fn test_fn_sleeper_async_is_lazy() {
        let slept = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&slept);
        let sleeper = FnSleeper::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let pending = sleeper.sleep_async(Duration::from_millis(5));
        assert_eq!(slept.load(Ordering::SeqCst), 0);
        tokio_test::block_on(pending);
        assert_eq!(slept.load(Ordering::SeqCst), 1);
    }

    /// Validates `ThreadSleeper` async waits under a tokio runtime.
    ///
    /// Assertions:
    /// - At least the requested duration elapses.
    #[tokio::test]
    async fn test_thread_sleeper_async() {
        let start = std::time::Instant::now();
        ThreadSleeper.sleep_async(Duration::from_millis(10)).await;
        ThreadSleeper.sleep_async(Duration::ZERO).await;
        assert!(start.elapsed() >= Duration::from_millis(10));
    }

    /// Validates `ThreadSleeper` async waits outside any tokio runtime.
    ///
    /// Assertions:
    /// - The wait completes on a plain `futures` executor.
    /// - Creating the future does not block the caller.
    #[test]
    fn test_thread_sleeper_async_without_tokio() {
        let start = std::time::Instant::now();
        let pending = ThreadSleeper.sleep_async(Duration::from_millis(20));
        assert!(start.elapsed() < Duration::from_millis(20));

        futures::executor::block_on(pending);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    /// Validates that dropping a pending thread-backed wait is harmless.
    ///
    /// Assertions:
    /// - Dropping before completion neither blocks nor panics.
    #[test]
    fn test_thread_sleeper_async_drop_without_tokio() {
        let start = std::time::Instant::now();
        drop(ThreadSleeper.sleep_async(Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
