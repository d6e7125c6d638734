//! `sessions_list` (spec §6): lists the sub-agents this session has
//! spawned, running and completed.

use serde_json::Value;

use crate::context::ToolContext;
use crate::error::{ToolError, ToolResult};
use crate::SubagentTool;

/// Lists every sub-agent spawned from this session, running and completed.
pub struct SessionsListTool;

#[async_trait::async_trait]
impl SubagentTool for SessionsListTool {
    fn name(&self) -> &'static str {
        "sessions_list"
    }

    fn description(&self) -> &'static str {
        "Lists every sub-agent spawned from this conversation, running and completed, \
         with their run ids, tasks, and status."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _args: Value, ctx: &ToolContext) -> ToolResult {
        let summaries = ctx.subagents.list_for(&ctx.requester_session_key);
        serde_json::to_string(&summaries).map_err(|e| ToolError::ExecutionFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launcher::{ChildRunLauncher, LaunchRequest, LaunchedChild};
    use chrono::Utc;
    use openclaw_core::{RunId, SessionKey};
    use openclaw_gateway::test_support::MockGatewayClient;
    use openclaw_runtime::{Limits, ReserveOutcome, SubagentContext, SubagentManager};
    use std::sync::Arc;

    struct NullLauncher;
    #[async_trait::async_trait]
    impl ChildRunLauncher for NullLauncher {
        async fn launch(&self, _request: LaunchRequest) -> Result<LaunchedChild, String> {
            unreachable!()
        }
    }

    fn ctx() -> (tempfile::TempDir, ToolContext) {
        let dir = tempfile::tempdir().unwrap();
        let registry_path = dir.path().join("registry.json");
        let subagents = Arc::new(SubagentManager::load(registry_path, Limits::default(), openclaw_events::EventBus::new()).unwrap());
        let tool_ctx = ToolContext {
            requester_session_key: SessionKey::new("s1"),
            subagents,
            gateway: Arc::new(MockGatewayClient::new()),
            transcripts_dir: dir.path().to_path_buf(),
            launcher: Arc::new(NullLauncher),
        };
        (dir, tool_ctx)
    }

    #[tokio::test]
    async fn empty_for_a_session_with_no_subagents() {
        let (_dir, ctx) = ctx();
        let tool = SessionsListTool;
        let out = tool.execute(serde_json::json!({}), &ctx).await.unwrap();
        assert_eq!(out, "[]");
    }

    #[tokio::test]
    async fn lists_a_running_subagent() {
        let (_dir, ctx) = ctx();
        let session = ctx.requester_session_key.clone();
        let ReserveOutcome::Allowed { reserve_id } = ctx.subagents.reserve_slot(&session) else { panic!("allowed") };
        let run_id = RunId::new();
        ctx.subagents
            .register(
                SubagentContext {
                    run_id: run_id.clone(),
                    child_session_key: SessionKey::new("s1/child"),
                    requester_session_key: session,
                    task: "summarize the repo".to_owned(),
                    label: None,
                    started_at: Utc::now(),
                    model: None,
                    plan_mode: false,
                    origin: None,
                    cleanup_delete: false,
                },
                &reserve_id,
            )
            .unwrap();

        let tool = SessionsListTool;
        let out = tool.execute(serde_json::json!({}), &ctx).await.unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 1);
        assert_eq!(parsed[0]["status"], "running");
        assert_eq!(parsed[0]["runId"], run_id.as_str());
    }
}
