//! `sessions_subagent_remove` (spec §6): evicts a completed subagent
//! record. Cannot remove a still-running subagent (spec §4.7
//! `removeSubagent`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use openclaw_core::RunId;
use openclaw_runtime::RuntimeError;

use crate::context::ToolContext;
use crate::error::{ToolError, ToolResult};
use crate::SubagentTool;

/// Removes a completed subagent record so its slot no longer counts
/// against `MAX_RETAINED`.
pub struct SessionsSubagentRemoveTool;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoveArgs {
    run_id: String,
}

#[derive(Debug, Serialize)]
struct RemoveResult {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[async_trait::async_trait]
impl SubagentTool for SessionsSubagentRemoveTool {
    fn name(&self) -> &'static str {
        "sessions_subagent_remove"
    }

    fn description(&self) -> &'static str {
        "Removes a completed sub-agent record from this conversation's history. \
         Fails if the sub-agent is still running."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "runId": {
                    "type": "string",
                    "description": "The run id returned by sessions_spawn, or shown by sessions_list"
                }
            },
            "required": ["runId"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult {
        let parsed: RemoveArgs = serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        let run_id = RunId::from_string(parsed.run_id);

        let body = match ctx.subagents.remove_subagent(&run_id, &ctx.requester_session_key) {
            Ok(()) => RemoveResult { status: "ok", message: Some(format!("removed subagent {}", run_id.short())), error: None },
            Err(e @ RuntimeError::StillRunning(_)) => RemoveResult { status: "error", message: None, error: Some(e.to_string()) },
            Err(e @ RuntimeError::PermissionDenied { .. }) => {
                RemoveResult { status: "error", message: None, error: Some(e.to_string()) }
            },
            Err(e @ RuntimeError::NotFound(_)) => RemoveResult { status: "error", message: None, error: Some(e.to_string()) },
            Err(e) => return Err(ToolError::ExecutionFailed(e.to_string())),
        };

        serde_json::to_string(&body).map_err(|e| ToolError::ExecutionFailed(e.to_string()))
    }
}
