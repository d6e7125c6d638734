//! `sessions_send` (spec §6): lets the parent address a child session
//! directly, via the same outbound `agent` RPC the announce flow uses
//! (spec §6 "Gateway RPC").

use serde::{Deserialize, Serialize};
use serde_json::Value;

use openclaw_gateway::AgentParams;

use crate::context::ToolContext;
use crate::error::{ToolError, ToolResult};
use crate::SubagentTool;

/// Sends a message into another session's conversation (typically a
/// sub-agent's child session), without waiting for its reply.
pub struct SessionsSendTool;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendArgs {
    session_key: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct SendResult {
    status: &'static str,
}

#[async_trait::async_trait]
impl SubagentTool for SessionsSendTool {
    fn name(&self) -> &'static str {
        "sessions_send"
    }

    fn description(&self) -> &'static str {
        "Sends a message into another session's conversation (e.g. a sub-agent's child session). \
         Does not wait for a reply; use sessions_history to read it back later."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "sessionKey": {
                    "type": "string",
                    "description": "The target session, e.g. a childSessionKey returned by sessions_spawn"
                },
                "message": {
                    "type": "string",
                    "description": "The message text to send"
                }
            },
            "required": ["sessionKey", "message"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult {
        let parsed: SendArgs = serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        if parsed.message.trim().is_empty() {
            return Err(ToolError::InvalidArguments("message must not be empty".to_owned()));
        }

        let params = AgentParams {
            session_key: parsed.session_key,
            message: parsed.message,
            channel: None,
            account_id: None,
            to: None,
            thread_id: None,
            deliver: false,
            idempotency_key: uuid::Uuid::new_v4().to_string(),
        };

        ctx.gateway.agent(params).await.map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;

        serde_json::to_string(&SendResult { status: "ok" }).map_err(|e| ToolError::ExecutionFailed(e.to_string()))
    }
}
