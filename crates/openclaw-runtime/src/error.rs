//! Runtime error types.

/// Errors raised by the subagent manager's removal operation and by the
/// durable registry / transcript writer's I/O paths.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// `removeSubagent` targeted a run that is still running.
    #[error("cannot remove subagent {0}: still running")]
    StillRunning(openclaw_core::RunId),

    /// `removeSubagent` targeted a run owned by a different session.
    #[error("permission denied: run {run_id} belongs to a different session")]
    PermissionDenied {
        /// The run id that was targeted.
        run_id: openclaw_core::RunId,
    },

    /// `removeSubagent`/completion lookup on an unknown run id.
    #[error("no record for run {0}")]
    NotFound(openclaw_core::RunId),

    /// `register` was called with a `reserveId` that no longer holds a
    /// reservation (already consumed, GC'd, or never minted).
    #[error("no reservation held for {0}")]
    ReservationNotFound(String),

    /// The durable registry file could not be read or written.
    #[error("subagent registry storage error: {0}")]
    Storage(#[from] openclaw_storage::StorageError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
