//! Data model shared across the process executor, output parser, and
//! queue (spec §3).

use std::collections::HashMap;

use openclaw_core::RunId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single run request handed to the CLI runner.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Target backend session id (the gateway's own, not the CLI's).
    pub session_id: String,
    /// Stable session key.
    pub session_key: String,
    /// Path to the session's transcript file.
    pub session_file: std::path::PathBuf,
    /// Working directory for the child process.
    pub workspace_dir: std::path::PathBuf,
    /// User-facing prompt text.
    pub prompt: String,
    /// Backend id to invoke.
    pub provider: String,
    /// Model id (pre-alias-resolution).
    pub model: String,
    /// Hard timeout for the whole invocation.
    pub timeout_ms: u64,
    /// This run's globally unique id.
    pub run_id: RunId,
    /// Attached image paths/urls, if any.
    pub images: Vec<String>,
    /// The backend's own session id, when resuming.
    pub cli_session_id: Option<String>,
    /// A tool result being fed back in to resume a paused interaction.
    pub tool_result: Option<ToolResultInput>,
    /// Sandbox execution context, if this run should be containerized.
    pub sandbox_context: Option<SandboxContext>,
}

/// A tool result supplied to resume a paused CLI interaction.
#[derive(Debug, Clone)]
pub struct ToolResultInput {
    /// The tool-use id being answered.
    pub tool_use_id: String,
    /// The result content.
    pub content: String,
}

/// Context describing a sandboxed (containerized) execution target.
#[derive(Debug, Clone)]
pub struct SandboxContext {
    /// Whether sandboxing is actually requested for this run.
    pub enabled: bool,
    /// The running container to `docker exec` into.
    pub container: String,
    /// Working directory inside the container, if different from the
    /// container's default.
    pub workdir: Option<String>,
    /// Extra environment variables passed into the container via `-e`.
    pub env: HashMap<String, String>,
}

/// A `tool_use` block extracted from assistant output (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliToolUseEvent {
    /// The tool call's id.
    pub id: String,
    /// The tool name.
    pub name: String,
    /// Argument name -> value.
    pub input: HashMap<String, Value>,
}

/// A `tool_result` block extracted from user-turn output (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliToolResultEvent {
    /// The `id` of the [`CliToolUseEvent`] this answers.
    pub tool_use_id: String,
    /// Flattened text content.
    pub content: String,
    /// Whether the tool call failed.
    pub is_error: bool,
}

/// Token usage, merged across however many lines/objects report it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    /// Input tokens.
    pub input_tokens: u64,
    /// Output tokens.
    pub output_tokens: u64,
    /// Input tokens served from cache.
    pub cache_read_input_tokens: u64,
    /// Input tokens written to cache.
    pub cache_write_input_tokens: u64,
    /// Total tokens, when the backend reports it directly rather than as
    /// input + output.
    pub total_tokens: u64,
}

impl Usage {
    /// Merge another usage snapshot in, field by field. Later non-zero
    /// values replace earlier ones per field (jsonl/stream-jsonl usage is
    /// typically a monotonically growing running total, not additive).
    pub fn merge(&mut self, other: &Usage) {
        if other.input_tokens != 0 {
            self.input_tokens = other.input_tokens;
        }
        if other.output_tokens != 0 {
            self.output_tokens = other.output_tokens;
        }
        if other.cache_read_input_tokens != 0 {
            self.cache_read_input_tokens = other.cache_read_input_tokens;
        }
        if other.cache_write_input_tokens != 0 {
            self.cache_write_input_tokens = other.cache_write_input_tokens;
        }
        if other.total_tokens != 0 {
            self.total_tokens = other.total_tokens;
        }
    }
}

/// One of the two pending-interaction kinds the CLI's output stream can
/// request (spec §3, §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    /// The CLI called `AskUserQuestion`.
    AskUserQuestion,
    /// The CLI called `ExitPlanMode`.
    PlanApproval,
}

/// One selectable answer to an `ask_user_question` interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionOption {
    /// The option's label.
    pub label: String,
    /// Optional longer description.
    #[serde(default)]
    pub description: Option<String>,
}

/// A pending interaction detected in a run's output (spec §4.4).
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedInteraction {
    /// Which kind of interaction this is.
    pub kind: InteractionKind,
    /// The tool-use id this interaction is answering.
    pub tool_call_id: String,
    /// The question text shown to the user.
    pub question: String,
    /// Selectable options, if any.
    pub options: Vec<InteractionOption>,
    /// Whether more than one option may be selected.
    pub multi_select: bool,
}

/// The parsed result of one CLI invocation (spec §4.4).
#[derive(Debug, Clone, Default)]
pub struct ParsedOutput {
    /// Concatenated assistant text.
    pub text: String,
    /// Tool-use events, in emission order.
    pub tool_uses: Vec<CliToolUseEvent>,
    /// Tool-result events, in emission order.
    pub tool_results: Vec<CliToolResultEvent>,
    /// Merged token usage.
    pub usage: Usage,
    /// The backend's own session id, if found.
    pub session_id: Option<String>,
    /// The single pending interaction detected, if any (spec invariant:
    /// at most one per parse).
    pub pending_interaction: Option<DetectedInteraction>,
}

/// The outcome of a process executor invocation (spec §4.3).
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
    /// Process exit code, if it exited normally.
    pub exit_code: Option<i32>,
    /// Signal that terminated the process, if any (Unix only).
    pub signal: Option<i32>,
    /// Whether the executor killed the process (timeout).
    pub killed: bool,
}

/// Classification of a non-zero exit / failed run (spec §4.3, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailoverReason {
    /// The executor's timeout fired.
    Timeout,
    /// The backend reported a rate limit.
    RateLimit,
    /// The backend reported an authentication failure.
    Auth,
    /// The backend reported a quota/billing failure.
    Quota,
    /// A network-level failure talking to the backend.
    Network,
    /// The requested model is unavailable.
    ModelUnavailable,
    /// No more specific classification applied.
    Unknown,
}
