//! CLI runner error types.

use crate::types::FailoverReason;

/// Errors raised while executing or parsing a CLI backend invocation.
#[derive(Debug, thiserror::Error)]
pub enum CliRunnerError {
    /// Spawning the child process failed outright (binary not found, etc).
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        /// The command that failed to spawn.
        command: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The process exited non-zero (or was killed) and the error text was
    /// classified into a [`FailoverReason`] (spec §4.3, §7).
    #[error("backend {provider} failed ({reason:?}): {status}")]
    Failover {
        /// Classified reason.
        reason: FailoverReason,
        /// The backend id.
        provider: String,
        /// The model id requested.
        model: String,
        /// A short human-readable status/error string.
        status: String,
    },

    /// The output parser could not make sense of the output at all (spec
    /// §7 `ParseError`); the caller should fall back to raw stdout.
    #[error("failed to parse backend output: {0}")]
    Parse(String),
}

/// Result type for CLI runner operations.
pub type CliRunnerResult<T> = Result<T, CliRunnerError>;
