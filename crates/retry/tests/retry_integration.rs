//! Integration tests for synchronous retry decorators
//!
//! Covers attempt counts, event sequences and accumulated waits across the
//! decorated shapes, error classification and concurrent callers sharing one
//! instance.

use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use rebound_common::error::{BoxError, CommonError};
use rebound_common::time::{FnSleeper, MockClock, RecordingSleeper};
use rebound_retry::{
    decorate_action, decorate_checked_computation, decorate_computation, decorate_function,
    Retry, RetryConfig, RetryEvent, RetryEventType, WaitStrategy,
};
use tracing_subscriber::EnvFilter;

const WAIT: Duration = Duration::from_millis(500);

/// Route retry logs to the test harness; set `RUST_LOG=rebound_retry=debug`
/// to see every attempt.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fixed_retry(name: &str, max_attempts: u32, sleeper: &RecordingSleeper) -> Retry {
    init_tracing();
    let config = RetryConfig::builder()
        .max_attempts(max_attempts)
        .wait_duration(WAIT)
        .sleeper(sleeper.clone())
        .build()
        .expect("valid config");
    Retry::create(name, config)
}

fn kinds(events: &[RetryEvent]) -> Vec<RetryEventType> {
    events.iter().map(RetryEvent::event_type).collect()
}

/// Work that fails `failures` times with a numbered error, then succeeds.
fn flaky(failures: u32, calls: &AtomicU32) -> Result<&'static str, io::Error> {
    let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
    if attempt <= failures {
        Err(io::Error::other(format!("failure {attempt}")))
    } else {
        Ok("Hello world")
    }
}

/// Validates an always-failing action.
///
/// # Test Steps
/// 1. Decorate an action that always fails with a known error
/// 2. Call it once with max attempts 3 and a fixed wait
/// 3. Verify 3 invocations, `[RETRY, RETRY, ERROR]` and a total wait of 2W
/// 4. Verify the returned error is the one raised by the work
#[test]
fn test_always_failing_action() {
    let sleeper = RecordingSleeper::new();
    let retry = fixed_retry("always-fails", 3, &sleeper);
    let mut events = retry.event_stream();
    let calls = AtomicU32::new(0);

    let action = decorate_action(&retry, || {
        calls.fetch_add(1, Ordering::SeqCst);
        Err(io::Error::new(io::ErrorKind::ConnectionRefused, "backend down"))
    });
    let err = action().expect_err("should exhaust");

    assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);
    assert_eq!(err.to_string(), "backend down");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(sleeper.total(), WAIT * 2);
    assert_eq!(
        kinds(&events.drain()),
        vec![RetryEventType::Retry, RetryEventType::Retry, RetryEventType::Error]
    );
}

/// Validates recovery after a single failure.
///
/// # Test Steps
/// 1. Decorate a computation failing once, then returning "Hello world"
/// 2. Verify the value, 2 invocations, `[RETRY, SUCCESS]` and a wait of W
#[test]
fn test_recovers_after_single_failure() {
    let sleeper = RecordingSleeper::new();
    let retry = fixed_retry("recovers", 3, &sleeper);
    let mut events = retry.event_stream();
    let calls = AtomicU32::new(0);

    let computation = decorate_computation(&retry, || flaky(1, &calls));

    assert_eq!(computation().expect("second attempt succeeds"), "Hello world");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(sleeper.total(), WAIT);
    assert_eq!(kinds(&events.drain()), vec![RetryEventType::Retry, RetryEventType::Success]);
}

/// Validates attempt and event counts for every `max_attempts` up to 6.
///
/// # Test Steps
/// 1. For each n, run always-failing work and verify n invocations, n - 1
///    RETRY events, one ERROR and the last attempt's error
/// 2. For each k < n, run work failing k times and verify k RETRY events,
///    one SUCCESS and a wait of k * W
#[test]
fn test_attempt_counts_match_events() {
    for n in 1..=6_u32 {
        let sleeper = RecordingSleeper::new();
        let retry = fixed_retry("counts", n, &sleeper);
        let mut events = retry.event_stream();
        let calls = AtomicU32::new(0);

        let err = retry.execute_computation(|| flaky(u32::MAX, &calls)).expect_err("exhausts");
        assert_eq!(err.to_string(), format!("failure {n}"));
        assert_eq!(calls.load(Ordering::SeqCst), n);

        let events = events.drain();
        let retries = events.iter().filter(|e| e.event_type() == RetryEventType::Retry).count();
        assert_eq!(retries, (n - 1) as usize);
        assert_eq!(events.last().map(RetryEvent::event_type), Some(RetryEventType::Error));
        assert_eq!(events.last().map(RetryEvent::attempt), Some(n));

        for k in 0..n {
            sleeper.reset();
            let mut stream = retry.event_stream();
            let calls = AtomicU32::new(0);
            retry.execute_computation(|| flaky(k, &calls)).expect("recovers");

            assert_eq!(calls.load(Ordering::SeqCst), k + 1);
            assert_eq!(sleeper.total(), WAIT * k);
            let events = stream.drain();
            assert_eq!(events.len(), (k + 1) as usize);
            assert_eq!(events.last().map(RetryEvent::event_type), Some(RetryEventType::Success));
        }
    }
}

/// Validates that accumulated waits follow a non-constant strategy.
///
/// # Test Steps
/// 1. Configure linear waits 100ms + 50ms per attempt
/// 2. Fail three times, then succeed
/// 3. Verify the recorded waits are 100, 150 and 200ms and RETRY events carry them
#[test]
fn test_waits_follow_strategy() {
    let sleeper = RecordingSleeper::new();
    let config = RetryConfig::builder()
        .max_attempts(5)
        .wait_strategy(WaitStrategy::Linear {
            initial: Duration::from_millis(100),
            increment: Duration::from_millis(50),
        })
        .sleeper(sleeper.clone())
        .build()
        .expect("valid config");
    let retry = Retry::create("linear", config);
    let mut events = retry.event_stream();
    let calls = AtomicU32::new(0);

    retry.execute_computation(|| flaky(3, &calls)).expect("fourth attempt succeeds");

    let expected = vec![
        Duration::from_millis(100),
        Duration::from_millis(150),
        Duration::from_millis(200),
    ];
    assert_eq!(sleeper.waits(), expected);
    let scheduled: Vec<_> = events.drain().iter().filter_map(RetryEvent::wait).collect();
    assert_eq!(scheduled, expected);
}

/// Validates non-retryable errors.
///
/// # Test Steps
/// 1. Retry only on `CommonError` values that report themselves retryable
/// 2. Fail with a non-retryable config error under max attempts 5
/// 3. Verify exactly one invocation, one ERROR event and no wait
/// 4. Fail with a timeout and verify it is retried to exhaustion
#[test]
fn test_classified_errors() {
    let sleeper = RecordingSleeper::new();
    let config = RetryConfig::builder()
        .max_attempts(5)
        .retry_on_classified::<CommonError>()
        .sleeper(sleeper.clone())
        .build()
        .expect("valid config");
    let retry = Retry::create("classified", config);
    let mut events = retry.event_stream();
    let calls = AtomicU32::new(0);

    let err = retry
        .execute_action(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(CommonError::config("missing endpoint"))
        })
        .expect_err("config errors are terminal");
    assert_eq!(err, CommonError::config("missing endpoint"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(sleeper.count(), 0);
    assert_eq!(kinds(&events.drain()), vec![RetryEventType::Error]);

    calls.store(0, Ordering::SeqCst);
    let _ = retry.execute_action(|| {
        calls.fetch_add(1, Ordering::SeqCst);
        Err(CommonError::timeout("fetch", Duration::from_secs(1)))
    });
    assert_eq!(calls.load(Ordering::SeqCst), 5);
    assert_eq!(sleeper.count(), 4);
}

/// Validates that ignore predicates take precedence over retry-on.
///
/// # Test Steps
/// 1. Retry on any `io::Error` but ignore `NotFound`
/// 2. Fail with `NotFound` and verify one invocation, IGNORED_ERROR and the
///    error returned unchanged
/// 3. Verify the call is counted as successful
#[test]
fn test_ignore_takes_precedence() {
    let sleeper = RecordingSleeper::new();
    let config = RetryConfig::builder()
        .retry_on_type::<io::Error>()
        .ignore_error(|e: &io::Error| e.kind() == io::ErrorKind::NotFound)
        .sleeper(sleeper.clone())
        .build()
        .expect("valid config");
    let retry = Retry::create("ignore", config);
    let mut events = retry.event_stream();
    let calls = AtomicU32::new(0);

    let result = retry.execute_computation(|| -> Result<u8, io::Error> {
        calls.fetch_add(1, Ordering::SeqCst);
        Err(io::ErrorKind::NotFound.into())
    });

    assert_eq!(result.expect_err("returned unchanged").kind(), io::ErrorKind::NotFound);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(kinds(&events.drain()), vec![RetryEventType::IgnoredError]);
    assert_eq!(retry.metrics().successful_calls_without_retry, 1);
    assert_eq!(retry.metrics().failed_calls_without_retry, 0);
}

/// Validates checked computations.
///
/// # Test Steps
/// 1. Retry only on `io::Error`
/// 2. Decorate work returning a boxed `io::Error` twice, then a value
/// 3. Verify the boxed error was classified through the box
#[test]
fn test_checked_computation() {
    let sleeper = RecordingSleeper::new();
    let config = RetryConfig::builder()
        .retry_on_type::<io::Error>()
        .sleeper(sleeper.clone())
        .build()
        .expect("valid config");
    let retry = Retry::create("checked", config);
    let calls = AtomicU32::new(0);

    let checked = decorate_checked_computation(&retry, || -> Result<u32, BoxError> {
        match calls.fetch_add(1, Ordering::SeqCst) {
            0 | 1 => Err(Box::new(io::Error::other("io"))),
            n => Ok(n),
        }
    });

    assert_eq!(checked().expect("third attempt succeeds"), 2);
    assert_eq!(sleeper.count(), 2);
}

/// Validates decorated functions receive the same argument on every attempt.
///
/// # Test Steps
/// 1. Decorate a function recording its argument and failing twice
/// 2. Verify every attempt saw the original argument
#[test]
fn test_function_argument_replayed() {
    let sleeper = RecordingSleeper::new();
    let retry = fixed_retry("function", 3, &sleeper);
    let seen = Mutex::new(Vec::new());

    let lookup = decorate_function(&retry, |id: String| {
        let mut seen = seen.lock().expect("lock");
        seen.push(id.clone());
        if seen.len() < 3 {
            Err(io::Error::other("busy"))
        } else {
            Ok(id.len())
        }
    });

    assert_eq!(lookup("order-42".to_owned()).expect("third attempt"), 8);
    assert_eq!(*seen.lock().expect("lock"), vec!["order-42"; 3]);
}

/// Validates that late subscribers miss earlier events.
///
/// # Test Steps
/// 1. Subscribe one stream, run a failing call
/// 2. Subscribe a second stream, run a successful call
/// 3. Verify the first stream saw both calls and the second only the last
#[test]
fn test_late_subscriber() {
    let sleeper = RecordingSleeper::new();
    let retry = fixed_retry("late", 2, &sleeper);
    let mut early = retry.event_stream();

    let _ = retry.execute_action(|| Err(io::Error::other("down")));
    let mut late = retry.event_stream();
    retry.execute_action(|| Ok::<(), io::Error>(())).expect("succeeds");

    assert_eq!(
        kinds(&early.drain()),
        vec![RetryEventType::Retry, RetryEventType::Error, RetryEventType::Success]
    );
    assert_eq!(kinds(&late.drain()), vec![RetryEventType::Success]);
}

/// Validates that concurrent callers never share attempt counts.
///
/// # Test Steps
/// 1. Share one instance across 8 threads
/// 2. Thread i runs 20 calls that fail `i % 3` times before succeeding
/// 3. Verify each call's invocation count and the aggregate counters
#[test]
fn test_concurrent_calls_are_independent() {
    const THREADS: u32 = 8;
    const CALLS: u32 = 20;

    let sleeper = RecordingSleeper::new();
    let retry = fixed_retry("shared", 3, &sleeper);

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let retry = retry.clone();
            thread::spawn(move || {
                let failures = i % 3;
                for _ in 0..CALLS {
                    let calls = AtomicU32::new(0);
                    retry.execute_computation(|| flaky(failures, &calls)).expect("recovers");
                    assert_eq!(calls.load(Ordering::SeqCst), failures + 1);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("caller thread");
    }

    let metrics = retry.metrics();
    let without_retry = (0..THREADS).filter(|i| i % 3 == 0).count() as u64 * u64::from(CALLS);
    assert_eq!(metrics.total_calls(), u64::from(THREADS * CALLS));
    assert_eq!(metrics.successful_calls_without_retry, without_retry);
    assert_eq!(metrics.failed_calls_with_retry + metrics.failed_calls_without_retry, 0);
    let expected_retries: u32 = (0..THREADS).map(|i| (i % 3) * CALLS).sum();
    assert_eq!(metrics.retry_attempts, u64::from(expected_retries));
}

/// Validates the function sleeper seam and clock-stamped events.
///
/// # Test Steps
/// 1. Route waits through an `FnSleeper` that advances a mock clock
/// 2. Fail once, then succeed
/// 3. Verify the SUCCESS event is stamped one wait after the RETRY event
#[test]
fn test_fn_sleeper_and_clock() {
    let clock = MockClock::new();
    let ticking = clock.clone();
    let config = RetryConfig::builder()
        .wait_duration(Duration::from_secs(2))
        .sleeper(FnSleeper::new(move |wait| ticking.advance(wait)))
        .clock(clock.clone())
        .build()
        .expect("valid config");
    let retry = Retry::create("clocked", config);
    let mut events = retry.event_stream();
    let calls = AtomicU32::new(0);

    retry.execute_computation(|| flaky(1, &calls)).expect("recovers");

    assert_eq!(clock.elapsed(), Duration::from_secs(2));
    let events = events.drain();
    let gap = events[1].created_at() - events[0].created_at();
    assert_eq!(gap, chrono::Duration::seconds(2));
}

/// Validates that a cloned instance shares events and counters.
#[test]
fn test_clones_share_state() {
    let sleeper = RecordingSleeper::new();
    let retry = fixed_retry("cloned", 1, &sleeper);
    let clone = retry.clone();
    let mut events = retry.event_stream();

    clone.execute_action(|| Ok::<(), io::Error>(())).expect("succeeds");

    assert_eq!(events.drain().len(), 1);
    assert_eq!(retry.metrics().successful_calls_without_retry, 1);
}
