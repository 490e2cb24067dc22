// Error types for the retry crate
//
// These cover building and looking up retry instances. Errors produced by the
// decorated work are never wrapped: decorators hand them back unchanged.
use std::time::Duration;

use rebound_common::error::{CommonError, ErrorClassification, ErrorSeverity};
use thiserror::Error;

/// Errors raised while configuring retry instances
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetryError {
    // Config, serialization and I/O failures from loading properties
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error("Invalid retry configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("No retry instance named '{name}'")]
    UnknownInstance { name: String },
}

impl RetryError {
    pub(crate) fn invalid<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfiguration { message: message.into() }
    }
}

impl From<toml::de::Error> for RetryError {
    fn from(err: toml::de::Error) -> Self {
        Self::Common(err.into())
    }
}

impl From<serde_json::Error> for RetryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Common(err.into())
    }
}

impl From<std::io::Error> for RetryError {
    fn from(err: std::io::Error) -> Self {
        Self::Common(err.into())
    }
}

impl ErrorClassification for RetryError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Common(e) => e.is_retryable(),
            Self::InvalidConfiguration { .. } | Self::UnknownInstance { .. } => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Common(e) => e.severity(),
            Self::InvalidConfiguration { .. } => ErrorSeverity::Error,
            Self::UnknownInstance { .. } => ErrorSeverity::Info,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Common(e) if e.is_critical())
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Result type for retry configuration
pub type RetryResult<T> = Result<T, RetryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_configuration_display() {
        let err = RetryError::invalid("max_attempts must be at least 1, got 0");
        assert_eq!(
            err.to_string(),
            "Invalid retry configuration: max_attempts must be at least 1, got 0"
        );
        assert!(!err.is_retryable());
        assert_eq!(err.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn test_common_is_transparent() {
        let err: RetryError = CommonError::config_field("wait_duration", "negative").into();
        assert_eq!(err.to_string(), "Configuration error in field 'wait_duration': negative");
    }
}
