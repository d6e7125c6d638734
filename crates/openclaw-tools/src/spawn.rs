//! `sessions_spawn` (spec §6): spawns a child run, reserving a concurrency/
//! capacity slot first (spec §4.7 `reserveSlot`/`register`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use openclaw_runtime::{AdmissionDenied, ReserveOutcome, SubagentContext};

use crate::context::ToolContext;
use crate::error::{ToolError, ToolResult};
use crate::launcher::LaunchRequest;
use crate::SubagentTool;

/// Spawns a sub-agent to handle a scoped task independently, returning
/// immediately with its identity rather than waiting for it to finish.
pub struct SessionsSpawnTool;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpawnArgs {
    task: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    plan_mode: bool,
    #[serde(default)]
    cleanup: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpawnOk {
    run_id: String,
    child_session_key: String,
}

#[derive(Debug, Serialize)]
struct SpawnErr {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestions: Option<Vec<String>>,
}

#[async_trait::async_trait]
impl SubagentTool for SessionsSpawnTool {
    fn name(&self) -> &'static str {
        "sessions_spawn"
    }

    fn description(&self) -> &'static str {
        "Spawns a sub-agent to handle a complex, multi-step task in the background. \
         Returns a run id and child session key immediately; the sub-agent's result is \
         announced back into this conversation once it finishes."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "task": {
                    "type": "string",
                    "description": "Detailed instructions for the sub-agent"
                },
                "label": {
                    "type": "string",
                    "description": "Optional short label shown in status listings instead of the task text"
                },
                "planMode": {
                    "type": "boolean",
                    "description": "If true, the sub-agent plans but waits for approval before executing"
                },
                "cleanup": {
                    "type": "string",
                    "description": "\"delete\" to remove the child session once announced, \"keep\" (default) to retain it"
                }
            },
            "required": ["task"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult {
        let parsed: SpawnArgs = serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        if parsed.task.trim().is_empty() {
            return Err(ToolError::InvalidArguments("task must not be empty".to_owned()));
        }
        let cleanup_delete = parsed.cleanup.as_deref() == Some("delete");

        let reserve_id = match ctx.subagents.reserve_slot(&ctx.requester_session_key) {
            ReserveOutcome::Denied(denied) => {
                let suggestions = match &denied {
                    AdmissionDenied::Capacity { suggestions } => {
                        Some(suggestions.iter().map(|r| r.as_str().to_owned()).collect())
                    },
                    AdmissionDenied::Concurrency => None,
                };
                let body = SpawnErr { error: denied.reason().to_owned(), suggestions };
                return encode(&body);
            },
            ReserveOutcome::Allowed { reserve_id } => reserve_id,
        };

        let request = LaunchRequest {
            requester_session_key: ctx.requester_session_key.clone(),
            task: parsed.task.clone(),
            label: parsed.label.clone(),
            plan_mode: parsed.plan_mode,
            cleanup_delete,
        };

        let launched = match ctx.launcher.launch(request).await {
            Ok(launched) => launched,
            Err(e) => return encode(&SpawnErr { error: e, suggestions: None }),
        };

        let context = SubagentContext {
            run_id: launched.run_id.clone(),
            child_session_key: launched.child_session_key.clone(),
            requester_session_key: ctx.requester_session_key.clone(),
            task: parsed.task,
            label: parsed.label,
            started_at: launched.started_at,
            model: None,
            plan_mode: parsed.plan_mode,
            origin: None,
            cleanup_delete,
        };

        ctx.subagents.register(context, &reserve_id).map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;

        encode(&SpawnOk { run_id: launched.run_id.as_str().to_owned(), child_session_key: launched.child_session_key.as_str().to_owned() })
    }
}

fn encode<T: Serialize>(body: &T) -> ToolResult {
    serde_json::to_string(body).map_err(|e| ToolError::ExecutionFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launcher::{ChildRunLauncher, LaunchedChild};
    use chrono::Utc;
    use openclaw_core::{RunId, SessionKey};
    use openclaw_events::EventBus;
    use openclaw_gateway::test_support::MockGatewayClient;
    use openclaw_runtime::{Limits, SubagentManager};
    use std::sync::Arc;

    struct StubLauncher {
        fail: bool,
    }

    #[async_trait::async_trait]
    impl ChildRunLauncher for StubLauncher {
        async fn launch(&self, request: LaunchRequest) -> Result<LaunchedChild, String> {
            if self.fail {
                return Err("backend unavailable".to_owned());
            }
            Ok(LaunchedChild {
                run_id: RunId::new(),
                child_session_key: SessionKey::new(format!("{}/child", request.requester_session_key.as_str())),
                started_at: Utc::now(),
            })
        }
    }

    fn ctx(fail_launch: bool) -> (tempfile::TempDir, ToolContext) {
        let dir = tempfile::tempdir().unwrap();
        let registry_path = dir.path().join("registry.json");
        let subagents = Arc::new(SubagentManager::load(registry_path, Limits::default(), EventBus::new()).unwrap());
        let gateway = Arc::new(MockGatewayClient::new());
        let launcher = Arc::new(StubLauncher { fail: fail_launch });
        let tool_ctx = ToolContext {
            requester_session_key: SessionKey::new("s1"),
            subagents,
            gateway,
            transcripts_dir: dir.path().to_path_buf(),
            launcher,
        };
        (dir, tool_ctx)
    }

    #[tokio::test]
    async fn spawn_succeeds_and_registers_a_running_subagent() {
        let (_dir, ctx) = ctx(false);
        let tool = SessionsSpawnTool;
        let out = tool.execute(serde_json::json!({"task": "summarize the repo"}), &ctx).await.unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert!(parsed.get("runId").is_some());
        assert!(parsed.get("childSessionKey").is_some());
        assert_eq!(ctx.subagents.stats().running, 1);
    }

    #[tokio::test]
    async fn empty_task_is_invalid_arguments() {
        let (_dir, ctx) = ctx(false);
        let tool = SessionsSpawnTool;
        let err = tool.execute(serde_json::json!({"task": "   "}), &ctx).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn denied_at_concurrency_limit_returns_structured_error() {
        let (_dir, ctx) = ctx(false);
        let tool = SessionsSpawnTool;
        for _ in 0..5 {
            tool.execute(serde_json::json!({"task": "busy work"}), &ctx).await.unwrap();
        }
        let out = tool.execute(serde_json::json!({"task": "one too many"}), &ctx).await.unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["error"], "concurrency");
    }

    #[tokio::test]
    async fn launcher_failure_surfaces_as_structured_error_not_hard_error() {
        let (_dir, ctx) = ctx(true);
        let tool = SessionsSpawnTool;
        let out = tool.execute(serde_json::json!({"task": "summarize the repo"}), &ctx).await.unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["error"], "backend unavailable");
        assert_eq!(ctx.subagents.stats().running, 0);
    }
}
