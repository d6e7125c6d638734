//! Telemetry error types.

/// Errors from setting up logging.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// A global subscriber was already installed.
    #[error("global tracing subscriber already set")]
    AlreadyInitialized,

    /// The `EnvFilter` directive string was malformed.
    #[error("invalid log filter directive: {0}")]
    InvalidFilter(String),
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
