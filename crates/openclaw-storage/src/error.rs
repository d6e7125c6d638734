//! Storage error types.

/// Errors from a [`crate::JsonFileStore`] operation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The store file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The store file's contents could not be parsed as JSON.
    #[error("failed to parse {path} as JSON: {source}")]
    Parse {
        /// Path that failed to parse.
        path: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A record failed to serialize to JSON.
    #[error("failed to serialize record: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The atomic write (temp file + rename) failed.
    #[error("failed to write {path}: {source}")]
    Write {
        /// Path that failed to write.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
