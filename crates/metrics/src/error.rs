// Error types for the metrics crate
use rebound_common::error::CommonError;
use thiserror::Error;

/// Errors raised while setting up metric registries
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricsError {
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error("Metric exporter error: {message}")]
    Exporter { message: String },
}

#[cfg(feature = "prometheus")]
impl From<prometheus::Error> for MetricsError {
    fn from(err: prometheus::Error) -> Self {
        Self::Exporter { message: err.to_string() }
    }
}

/// Result type for metrics setup
pub type MetricsResult<T> = Result<T, MetricsError>;
