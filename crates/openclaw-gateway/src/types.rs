//! DTOs for the gateway RPC methods consumed by the core (spec §6).

use serde::{Deserialize, Serialize};

/// Params for the `agent` method: start or continue a run.
#[derive(Debug, Clone, Serialize)]
pub struct AgentParams {
    /// Target session.
    pub session_key: String,
    /// Message text to inject/continue with.
    pub message: String,
    /// Originating channel, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Originating account id, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    /// Originating recipient address, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Originating thread id, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    /// Whether the message should actually be delivered to the channel
    /// (vs. injected silently).
    pub deliver: bool,
    /// Idempotency key; the gateway deduplicates on this (spec §5 "Announce
    /// delivery... is at-least-once but deduplicated by `idempotencyKey`").
    pub idempotency_key: String,
}

/// Terminal status of a run, as reported by `agent.wait`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// The run finished normally.
    Ok,
    /// The run finished with an error.
    Error,
    /// The wait itself timed out before the run finished.
    Timeout,
}

/// Params for the `agent.wait` method.
#[derive(Debug, Clone, Serialize)]
pub struct AgentWaitParams {
    /// The run to wait on.
    pub run_id: String,
    /// How long to wait before giving up.
    pub timeout_ms: u64,
}

/// Result of `agent.wait`.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentWaitResult {
    /// Terminal status of the run, or `Timeout` if the wait itself expired.
    pub status: RunStatus,
    /// When the run started, if known.
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    /// When the run ended, if known.
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Error text, if `status == Error`.
    pub error: Option<String>,
}

/// Params for `sessions.patch`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionsPatchParams {
    /// Session to patch.
    pub key: String,
    /// New label.
    pub label: String,
}

/// Params for `sessions.delete`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionsDeleteParams {
    /// Session to delete.
    pub key: String,
    /// Whether to also delete its transcript file.
    pub delete_transcript: bool,
}
