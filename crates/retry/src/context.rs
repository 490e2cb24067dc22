//! Per-call retry state
//!
//! Every decorated call owns one [`RetryContext`]. It is never shared between
//! calls, so concurrent callers of the same retry instance cannot disturb
//! each other's attempt counts.
//!
//! ```text
//! Initial ──start──▶ Attempting ──accepted──▶ Succeeded
//!                      │  ▲
//!          retryable,  │  │ wait elapsed,
//!          attempts    ▼  │ attempt += 1
//!          remain     Waiting
//!
//! Attempting ──terminal or last attempt──▶ Exhausted
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use rebound_common::impl_status_conversions;
use tracing::error;

use crate::config::RetryConfig;

/// Position of a call in the retry state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetryState {
    /// Created, no attempt started
    Initial,
    /// An attempt is running
    Attempting,
    /// Pausing before the next attempt
    Waiting,
    /// Finished with an accepted value or an ignored error
    Succeeded,
    /// Finished with a failure
    Exhausted,
}

impl_status_conversions!(RetryState {
    Initial => "initial",
    Attempting => "attempting",
    Waiting => "waiting",
    Succeeded => "succeeded",
    Exhausted => "exhausted",
});

impl RetryState {
    /// Whether the call has finished
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Exhausted)
    }

    /// Whether moving from `self` to `next` is a legal transition
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Initial, Self::Attempting)
                | (Self::Attempting, Self::Succeeded | Self::Waiting | Self::Exhausted)
                | (Self::Waiting, Self::Attempting)
        )
    }
}

/// What to do after a retryable failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Wait this long, then run the next attempt
    Retry(Duration),
    /// No attempts remain
    Exhausted,
}

/// Mutable state of one logical call
#[derive(Debug, Clone)]
pub struct RetryContext {
    config: Arc<RetryConfig>,
    attempt: u32,
    state: RetryState,
    total_wait: Duration,
    last_wait: Option<Duration>,
    started_at: Instant,
}

impl RetryContext {
    /// Create a context for a new call
    #[must_use]
    pub fn new(config: Arc<RetryConfig>) -> Self {
        let started_at = config.clock().now();
        Self {
            config,
            attempt: 1,
            state: RetryState::Initial,
            total_wait: Duration::ZERO,
            last_wait: None,
            started_at,
        }
    }

    /// Current attempt number, starting at 1
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> RetryState {
        self.state
    }

    /// Sum of all completed waits
    #[must_use]
    pub const fn total_wait(&self) -> Duration {
        self.total_wait
    }

    /// Most recently scheduled wait
    #[must_use]
    pub const fn last_wait(&self) -> Option<Duration> {
        self.last_wait
    }

    /// Time since the call began, per the configured clock
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.config.clock().now().saturating_duration_since(self.started_at)
    }

    /// Configuration driving this call
    #[must_use]
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Begin the first attempt
    pub fn start(&mut self) {
        self.transition(RetryState::Attempting);
    }

    /// The current attempt produced an accepted value or an ignored error
    pub fn on_success(&mut self) {
        self.transition(RetryState::Succeeded);
    }

    /// The current attempt failed with a non-retryable error
    pub fn on_terminal_failure(&mut self) {
        self.transition(RetryState::Exhausted);
    }

    /// The current attempt failed in a retryable way.
    ///
    /// Moves to `Waiting` and returns the wait while attempts remain,
    /// otherwise moves to `Exhausted`.
    pub fn on_retryable_failure(&mut self) -> Decision {
        if self.attempt >= self.config.max_attempts() {
            self.transition(RetryState::Exhausted);
            return Decision::Exhausted;
        }
        let wait = self.config.wait_strategy().wait_for(self.attempt);
        self.last_wait = Some(wait);
        self.transition(RetryState::Waiting);
        Decision::Retry(wait)
    }

    /// The wait finished; move on to the next attempt
    pub fn resume(&mut self, waited: Duration) {
        self.total_wait = self.total_wait.saturating_add(waited);
        self.attempt = self.attempt.saturating_add(1);
        self.transition(RetryState::Attempting);
    }

    fn transition(&mut self, next: RetryState) {
        if !self.state.can_transition_to(next) {
            error!(
                from = %self.state,
                to = %next,
                attempt = self.attempt,
                "illegal retry state transition"
            );
        }
        self.state = next;
    }
}
