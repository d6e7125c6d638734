//! Timestamp helper.

use chrono::{DateTime, Utc};

/// Current wall-clock time, as used throughout the registry and transcript
/// writer for `startedAt`/`endedAt`/`createdAt` fields.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now()
}
