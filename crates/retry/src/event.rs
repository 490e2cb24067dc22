//! Lifecycle events published by retry instances.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rebound_common::{impl_status_conversions, option_duration_millis};
use serde::{Deserialize, Serialize};

/// Kind of transition an event records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetryEventType {
    /// The call produced an accepted value
    Success,
    /// The call failed: non-retryable error or attempts exhausted
    Error,
    /// An attempt failed and another one is scheduled
    Retry,
    /// The call ended with an error configured to be ignored
    IgnoredError,
}

impl_status_conversions!(RetryEventType {
    Success => "success",
    Error => "error",
    Retry => "retry",
    IgnoredError => "ignored_error",
});

/// Immutable record of one retry transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryEvent {
    event_type: RetryEventType,
    name: String,
    attempt: u32,
    created_at: DateTime<Utc>,
    last_error: Option<String>,
    #[serde(default, with = "option_duration_millis")]
    wait: Option<Duration>,
}

impl RetryEvent {
    pub(crate) fn new(
        event_type: RetryEventType,
        name: &str,
        attempt: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_type,
            name: name.to_owned(),
            attempt,
            created_at,
            last_error: None,
            wait: None,
        }
    }

    pub(crate) fn with_error(mut self, error: Option<String>) -> Self {
        self.last_error = error;
        self
    }

    pub(crate) fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = Some(wait);
        self
    }

    /// Kind of transition
    #[must_use]
    pub const fn event_type(&self) -> RetryEventType {
        self.event_type
    }

    /// Name of the retry instance that published the event
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attempt number the event refers to, starting at 1
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// When the event was created, per the instance's clock
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Display form of the error behind the event, if any
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Scheduled wait before the next attempt (RETRY events only)
    #[must_use]
    pub const fn wait(&self) -> Option<Duration> {
        self.wait
    }
}

impl fmt::Display for RetryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: retry '{}' ", self.created_at.to_rfc3339(), self.name)?;
        match self.event_type {
            RetryEventType::Success => {
                write!(f, "succeeded after {} attempt(s)", self.attempt)?;
            }
            RetryEventType::Error => {
                write!(f, "failed after {} attempt(s)", self.attempt)?;
            }
            RetryEventType::Retry => {
                write!(f, "scheduled attempt {}", self.attempt + 1)?;
                if let Some(wait) = self.wait {
                    write!(f, " in {wait:?}")?;
                }
            }
            RetryEventType::IgnoredError => {
                write!(f, "ignored an error on attempt {}", self.attempt)?;
            }
        }
        if let Some(err) = &self.last_error {
            write!(f, ". Last error: {err}")?;
        }
        Ok(())
    }
}
