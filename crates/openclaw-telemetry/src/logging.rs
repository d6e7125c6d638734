//! Logging configuration and subscriber setup.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use crate::error::{TelemetryError, TelemetryResult};

/// Output shape for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable single-line output, for interactive use.
    Compact,
    /// Newline-delimited JSON, for production log shipping.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    level: String,
    format: LogFormat,
    extra_directives: Vec<String>,
}

impl LogConfig {
    /// Start from a base level (`"trace"`, `"debug"`, `"info"`, `"warn"`, `"error"`).
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            format: LogFormat::Compact,
            extra_directives: Vec::new(),
        }
    }

    /// Set the output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Add an extra `EnvFilter` directive, e.g. `"openclaw_cli_runner=trace"`.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.extra_directives.push(directive.into());
        self
    }

    fn filter_string(&self) -> String {
        if self.extra_directives.is_empty() {
            self.level.clone()
        } else {
            format!("{},{}", self.level, self.extra_directives.join(","))
        }
    }
}

/// Install the global tracing subscriber.
///
/// Respects `RUST_LOG` if set (it takes precedence over `config.level`,
/// matching `EnvFilter::try_from_default_env`'s usual behavior).
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] if the directive string is
/// malformed, or [`TelemetryError::AlreadyInitialized`] if a global
/// subscriber is already installed.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.filter_string()))
        .map_err(|e| TelemetryError::InvalidFilter(e.to_string()))?;

    let result = match config.format {
        LogFormat::Compact => fmt().with_env_filter(filter).compact().try_init(),
        LogFormat::Json => fmt().with_env_filter(filter).json().try_init(),
    };

    result.map_err(|_| TelemetryError::AlreadyInitialized)
}

/// Install logging with sensible defaults (`info`, compact format).
///
/// # Errors
///
/// See [`setup_logging`].
pub fn setup_default_logging() -> TelemetryResult<()> {
    setup_logging(&LogConfig::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_string_without_extra_directives() {
        let config = LogConfig::new("debug");
        assert_eq!(config.filter_string(), "debug");
    }

    #[test]
    fn filter_string_with_extra_directives() {
        let config = LogConfig::new("info").with_directive("openclaw_runtime=debug");
        assert_eq!(config.filter_string(), "info,openclaw_runtime=debug");
    }
}
