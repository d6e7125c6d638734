//! Child-run launch trait for dependency inversion.
//!
//! `openclaw-tools` defines this trait; the daemon's run dispatcher (which
//! owns the per-backend queue, process executor, and CLI output parser —
//! `openclaw-cli-runner` — plus the actual session/transcript wiring)
//! implements it. This avoids a circular dependency between the tool
//! surface and the run-dispatch machinery it's invoked from, the same
//! seam the teacher draws between `astrid-tools::SubAgentSpawner` and
//! `astrid-runtime`'s executor.

use chrono::{DateTime, Utc};
use openclaw_core::{RunId, SessionKey};

/// Everything `sessions_spawn` (spec §6) needs to start a new child run,
/// once admission control has already reserved a slot for it.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    /// The parent session spawning the child.
    pub requester_session_key: SessionKey,
    /// The task description handed to the child.
    pub task: String,
    /// An optional short label for status displays.
    pub label: Option<String>,
    /// Whether the child should run in plan-approval mode.
    pub plan_mode: bool,
    /// Whether the child session should be deleted once announced
    /// (`cleanup == "delete"`).
    pub cleanup_delete: bool,
}

/// The identifying triple of a freshly started child run.
#[derive(Debug, Clone)]
pub struct LaunchedChild {
    /// The new run's globally unique id.
    pub run_id: RunId,
    /// The new child session's key.
    pub child_session_key: SessionKey,
    /// When the child run started.
    pub started_at: DateTime<Utc>,
}

/// Starts a child run for a reserved subagent slot. Implemented by the
/// daemon's run dispatcher; injected into [`crate::context::ToolContext`]
/// as `Arc<dyn ChildRunLauncher>`.
#[async_trait::async_trait]
pub trait ChildRunLauncher: Send + Sync {
    /// Start the child run described by `request`. Must not perform
    /// admission control itself — the caller has already reserved a slot
    /// via [`openclaw_runtime::SubagentManager::reserve_slot`] and expects
    /// this call to either succeed or fail outright, not to be denied for
    /// capacity reasons.
    async fn launch(&self, request: LaunchRequest) -> Result<LaunchedChild, String>;
}
