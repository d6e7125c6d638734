//! Declarative configuration types.
//!
//! These mirror the JSON document described in spec §6 ("Per-user config: a
//! single JSON document describing backends, models, channels, limits").

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// How the backend expects session continuity to be signaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Always pass the session flag, even on the first call.
    Always,
    /// Only pass the session flag when resuming an existing session.
    Existing,
    /// Never pass a session flag; the backend tracks continuity itself.
    None,
}

/// When the system prompt argument is included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemPromptWhen {
    /// Only on the first call of a session.
    First,
    /// On every call.
    Always,
    /// Never.
    Never,
}

/// How multiple images are passed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageMode {
    /// Repeat the image flag once per image.
    Repeat,
    /// Pass a single flag with a comma/list-formatted value.
    List,
}

/// How the prompt is delivered to the child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptInput {
    /// As a command-line argument.
    Arg,
    /// Over the child's stdin.
    Stdin,
}

/// How the child process's output is structured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    /// Plain text; stdout trimmed verbatim.
    Text,
    /// A single JSON object.
    Json,
    /// One JSON object per line.
    Jsonl,
    /// One JSON object per line, each tagged with a `type` (Claude-style
    /// streaming transcript).
    StreamJsonl,
}

/// When sandboxed (containerized) execution applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxMode {
    /// Never sandbox this backend.
    Off,
    /// Sandbox only when the run's `sandboxContext.enabled` is true.
    Inherit,
    /// Always sandbox, regardless of the run's sandbox context.
    Always,
}

/// Immutable per-process description of how to invoke one CLI backend
/// (spec §3 `BackendSpec`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSpec {
    /// Executable name or path.
    pub command: String,
    /// Base argument template (before model/session/prompt args are
    /// appended).
    #[serde(default)]
    pub args: Vec<String>,
    /// Argument template used instead of `args` when resuming a session,
    /// e.g. `["--resume", "{sessionId}"]`.
    #[serde(default)]
    pub resume_args: Vec<String>,
    /// Flag name used to pass a single session id argument, e.g. `"--session"`.
    #[serde(default)]
    pub session_arg: Option<String>,
    /// Flag names used across multiple arguments for session continuity,
    /// for backends that split the id across more than one flag.
    #[serde(default)]
    pub session_args: Vec<String>,
    /// When the session flag(s) are passed at all.
    #[serde(default = "default_session_mode")]
    pub session_mode: SessionMode,
    /// Flag name used to pass the system prompt.
    #[serde(default)]
    pub system_prompt_arg: Option<String>,
    /// When the system prompt argument is included.
    #[serde(default = "default_system_prompt_when")]
    pub system_prompt_when: SystemPromptWhen,
    /// Flag name used to pass the model id.
    #[serde(default)]
    pub model_arg: Option<String>,
    /// Case-insensitive alias map from a user-facing model name to the
    /// backend's own model id.
    #[serde(default)]
    pub model_aliases: HashMap<String, String>,
    /// Flag name used to pass image attachments.
    #[serde(default)]
    pub image_arg: Option<String>,
    /// How multiple images are passed.
    #[serde(default = "default_image_mode")]
    pub image_mode: ImageMode,
    /// How the prompt text is delivered.
    #[serde(default = "default_prompt_input")]
    pub input: PromptInput,
    /// Maximum prompt length passed as an argument before the backend
    /// should fall back to stdin (0 = no limit).
    #[serde(default)]
    pub max_prompt_arg_chars: usize,
    /// Output structure for a fresh (non-resume) call.
    #[serde(default = "default_output_mode")]
    pub output: OutputMode,
    /// Output structure for a resume call, if different from `output`.
    #[serde(default)]
    pub resume_output: Option<OutputMode>,
    /// Extra environment variables always set for this backend.
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// If true, the child's environment starts empty (plus `env` and the
    /// default `PATH`) instead of inheriting the gateway process's
    /// environment.
    #[serde(default)]
    pub clear_env: bool,
    /// When sandboxed execution applies.
    #[serde(default)]
    pub sandbox_mode: SandboxMode,
    /// Environment overrides applied only inside the sandboxed container.
    #[serde(default)]
    pub sandbox_overrides: HashMap<String, String>,
    /// If true, runs for this backend are serialized through one queue key
    /// (spec §4.2); otherwise each run gets its own queue key.
    #[serde(default)]
    pub serialize: bool,
    /// Whether the backend's own built-in tools (distinct from the gateway
    /// tool surface) are enabled for this run.
    #[serde(default = "default_true")]
    pub enable_tools: bool,
    /// JSON field names checked, in order, when extracting a session id
    /// from backend output.
    #[serde(default = "default_session_id_fields")]
    pub session_id_fields: Vec<String>,
}

fn default_session_mode() -> SessionMode {
    SessionMode::Existing
}
fn default_system_prompt_when() -> SystemPromptWhen {
    SystemPromptWhen::First
}
fn default_image_mode() -> ImageMode {
    ImageMode::Repeat
}
fn default_prompt_input() -> PromptInput {
    PromptInput::Arg
}
fn default_output_mode() -> OutputMode {
    OutputMode::Text
}
fn default_true() -> bool {
    true
}
fn default_session_id_fields() -> Vec<String> {
    vec![
        "session_id".to_owned(),
        "sessionId".to_owned(),
        "conversation_id".to_owned(),
        "conversationId".to_owned(),
    ]
}

impl BackendSpec {
    /// Resolve a user-facing model name through `model_aliases`,
    /// case-insensitively, falling back to the name itself when no alias
    /// matches (spec §4.1 "`modelId` is normalized through `modelAliases`
    /// (case-insensitive fallback)").
    #[must_use]
    pub fn normalize_model(&self, model_id: &str) -> String {
        self.model_aliases
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(model_id))
            .map_or_else(|| model_id.to_owned(), |(_, v)| v.clone())
    }

    /// The output mode to use for a given call, honoring `resume_output`
    /// when this is a resume.
    #[must_use]
    pub fn output_mode_for(&self, is_resume: bool) -> OutputMode {
        if is_resume {
            self.resume_output.unwrap_or(self.output)
        } else {
            self.output
        }
    }
}

/// Per-model cost, used by the announce flow to estimate a stats line
/// (spec §4.7 step 4 "estimated cost (from the model's `cost` config)").
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ModelCost {
    /// US dollars per 1,000 input tokens.
    #[serde(default)]
    pub input_cost_per_1k: f64,
    /// US dollars per 1,000 output tokens.
    #[serde(default)]
    pub output_cost_per_1k: f64,
}

/// Admission-control limits for the subagent manager (spec §3 invariants).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Max simultaneously running + reserved subagents per session.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Max running + completed + reserved subagents retained per session.
    #[serde(default = "default_max_retained")]
    pub max_retained: usize,
    /// Seconds a reservation may live unconsumed before GC (spec §3, §5).
    #[serde(default = "default_reservation_ttl_secs")]
    pub reservation_ttl_secs: u64,
}

fn default_max_concurrent() -> usize {
    5
}
fn default_max_retained() -> usize {
    15
}
fn default_reservation_ttl_secs() -> u64 {
    30
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            max_retained: default_max_retained(),
            reservation_ttl_secs: default_reservation_ttl_secs(),
        }
    }
}

/// How a completed subagent's announcement is delivered relative to a still
/// running parent LLM turn (spec §4.7 step 6, §9 "Polymorphism").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueueMode {
    /// Always deliver directly; never steer or queue.
    Off,
    /// Queue behind the current turn; deliver once it finishes.
    Followup,
    /// Collect multiple announcements and flush them together.
    Collect,
    /// Interrupt the current turn's output with the announcement.
    Interrupt,
    /// Attempt to steer the announcement into the running turn.
    Steer,
    /// Attempt to steer, falling back to the queue if steering fails.
    SteerBacklog,
}

impl Default for QueueMode {
    fn default() -> Self {
        Self::SteerBacklog
    }
}

/// Per-user gateway configuration (spec §6 "Persistence layout").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Backend id -> declarative spec.
    #[serde(default)]
    pub backends: HashMap<String, BackendSpec>,
    /// Model id -> cost config, used by the announce flow.
    #[serde(default)]
    pub models: HashMap<String, ModelCost>,
    /// Admission-control limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Default announce delivery mode, overridable per session at runtime.
    #[serde(default)]
    pub default_queue_mode: QueueMode,
}
