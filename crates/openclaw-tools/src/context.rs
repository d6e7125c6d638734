//! Shared context available to every tool call (spec §6 "tool surface
//! exposed to LLM runs").

use std::path::PathBuf;
use std::sync::Arc;

use openclaw_core::SessionKey;
use openclaw_gateway::GatewayClient;
use openclaw_runtime::SubagentManager;

use crate::launcher::ChildRunLauncher;

/// Per-call context handed to [`crate::SubagentTool::execute`]. One instance
/// is built per LLM run, scoped to the session that's invoking the tool —
/// unlike the long-lived [`SubagentManager`]/[`GatewayClient`] it wraps.
pub struct ToolContext {
    /// The session the calling LLM run belongs to (the parent session for
    /// every tool here — a subagent cannot itself call `sessions_spawn`
    /// recursively beyond what admission control already bounds).
    pub requester_session_key: SessionKey,
    /// Admission control, lifecycle tracking, and the durable registry
    /// (spec §4.7).
    pub subagents: Arc<SubagentManager>,
    /// Outbound `callGateway` client, used by `sessions_send` to inject a
    /// message into a child session's run.
    pub gateway: Arc<dyn GatewayClient>,
    /// Directory session transcripts are stored under (spec §4.5), read by
    /// `sessions_history`.
    pub transcripts_dir: PathBuf,
    /// Starts a new child run once a slot has been reserved, used by
    /// `sessions_spawn`.
    pub launcher: Arc<dyn ChildRunLauncher>,
}
