//! `sessions_history` (spec §6): lets the parent read a child session's
//! transcript (spec §4.5's append-only contract).

use serde::Deserialize;
use serde_json::Value;

use openclaw_core::SessionKey;
use openclaw_runtime::{read_transcript, TranscriptRecord};

use crate::context::ToolContext;
use crate::error::{ToolError, ToolResult};
use crate::SubagentTool;

/// Reads a session's transcript (its own, or a spawned child's) as plain
/// text, oldest first.
pub struct SessionsHistoryTool;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryArgs {
    session_key: String,
}

#[async_trait::async_trait]
impl SubagentTool for SessionsHistoryTool {
    fn name(&self) -> &'static str {
        "sessions_history"
    }

    fn description(&self) -> &'static str {
        "Reads the message history of a session (this one, or a sub-agent's child session) \
         as plain text, oldest first."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "sessionKey": {
                    "type": "string",
                    "description": "The session to read, e.g. a childSessionKey returned by sessions_spawn"
                }
            },
            "required": ["sessionKey"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult {
        let parsed: HistoryArgs = serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        let session_key = SessionKey::new(parsed.session_key);

        let records = read_transcript(&ctx.transcripts_dir, &session_key).map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;
        if records.is_empty() {
            return Ok("(no transcript yet)".to_owned());
        }

        let mut lines = Vec::with_capacity(records.len());
        for record in records {
            match record {
                TranscriptRecord::Header { started_at, .. } => lines.push(format!("[{started_at}] session started")),
                TranscriptRecord::Assistant { at, tool_calls, text, .. } => {
                    for call in &tool_calls {
                        lines.push(format!("[{at}] tool_use({}): {}", call.name, call.id));
                    }
                    if !text.is_empty() {
                        lines.push(format!("[{at}] assistant: {text}"));
                    }
                },
                TranscriptRecord::ToolResult { at, tool_use_id, content, is_error } => {
                    let marker = if is_error { "error" } else { "ok" };
                    lines.push(format!("[{at}] tool_result({tool_use_id}, {marker}): {content}"));
                },
            }
        }
        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launcher::{ChildRunLauncher, LaunchRequest, LaunchedChild};
    use chrono::Utc;
    use openclaw_gateway::test_support::MockGatewayClient;
    use openclaw_runtime::{Limits, SubagentManager, TranscriptWriter};
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
        let events = openclaw_events::EventBus::new();
        let subagents = Arc::new(SubagentManager::load(registry_path, Limits::default(), events.clone()).unwrap());
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
    async fn missing_transcript_reads_as_placeholder() {
        let (_dir, ctx) = ctx();
        let tool = SessionsHistoryTool;
        let out = tool.execute(serde_json::json!({"sessionKey": "nope"}), &ctx).await.unwrap();
        assert_eq!(out, "(no transcript yet)");
    }

    #[tokio::test]
    async fn reads_back_appended_records_in_order() {
        let (dir, ctx) = ctx();
        let writer = TranscriptWriter::new(dir.path(), openclaw_events::EventBus::new());
        let key = SessionKey::new("s1/child");
        let now = Utc::now();
        writer.ensure_header(&key, now);
        writer.append_run(
            &key,
            "hello there",
            &[openclaw_cli_runner::CliToolUseEvent { id: "t1".to_owned(), name: "Bash".to_owned(), input: Default::default() }],
            &[openclaw_cli_runner::CliToolResultEvent { tool_use_id: "t1".to_owned(), content: "done".to_owned(), is_error: false }],
            Default::default(),
            now,
        );

        let tool = SessionsHistoryTool;
        let out = tool.execute(serde_json::json!({"sessionKey": "s1/child"}), &ctx).await.unwrap();
        assert!(out.contains("hello there"));
        assert!(out.contains("tool_result(t1, ok): done"));
    }
}
