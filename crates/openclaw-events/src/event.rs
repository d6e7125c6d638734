//! Event payloads published on the bus.

use chrono::{DateTime, Utc};
use openclaw_core::{RunId, SessionKey};
use serde::{Deserialize, Serialize};

/// An event published on the in-process bus.
///
/// Tagged by `event_type` rather than `serde`'s externally-tagged default so
/// the shape is stable if this is ever mirrored into the session transcript
/// or a debug dump.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OpenclawEvent {
    /// A subagent was admitted and registered as running (spec §4.7
    /// `register`).
    #[serde(rename = "spawned")]
    Spawned {
        /// The new run's id.
        run_id: RunId,
        /// The session that requested the spawn.
        requester_session_key: SessionKey,
        /// The child session the subagent runs in.
        child_session_key: SessionKey,
        /// The task description given at spawn time.
        task: String,
        /// When the run started.
        started_at: DateTime<Utc>,
    },

    /// A subagent's run finished (spec §4.7 `markCompleted`).
    #[serde(rename = "completed")]
    Completed {
        /// The finished run's id.
        run_id: RunId,
        /// The session that requested the spawn.
        requester_session_key: SessionKey,
        /// `ok` / `error` / `timeout` / `unknown`.
        outcome_status: String,
        /// When the run ended.
        ended_at: DateTime<Utc>,
    },

    /// A session transcript file was appended to (spec §4.5).
    #[serde(rename = "sessionTranscriptUpdate")]
    SessionTranscriptUpdate {
        /// The session whose transcript changed.
        session_key: SessionKey,
        /// Number of records appended by this write.
        records_appended: usize,
    },
}

impl OpenclawEvent {
    /// Stable machine-readable discriminant, for metrics and log fields.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Spawned { .. } => "spawned",
            Self::Completed { .. } => "completed",
            Self::SessionTranscriptUpdate { .. } => "sessionTranscriptUpdate",
        }
    }
}
