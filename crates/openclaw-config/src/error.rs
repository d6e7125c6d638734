//! Config error types.

/// Errors from loading or resolving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The user config file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The user config file, or the embedded defaults, failed to parse.
    #[error("failed to parse {path} as JSON: {source}")]
    Parse {
        /// Path that failed to parse (`"<embedded defaults>"` for the
        /// built-in document).
        path: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The config file is larger than [`crate::loader::MAX_CONFIG_FILE_SIZE`].
    #[error("config file {path} is {size} bytes, exceeding the {limit} byte limit")]
    TooLarge {
        /// Path of the oversized file.
        path: String,
        /// Observed size in bytes.
        size: u64,
        /// The configured limit.
        limit: u64,
    },

    /// The user's home directory could not be determined.
    #[error("could not determine home directory")]
    NoHomeDir,

    /// `resolve_backend` was asked for a provider not present in config.
    #[error("unknown backend: {0}")]
    UnknownBackend(String),
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
