//! Subagent and interaction data model (spec §3).

use chrono::{DateTime, Utc};
use openclaw_core::{AgentId, RunId, SessionKey};
use serde::{Deserialize, Serialize};

/// Admission-control limits. Mirrors `openclaw_config::LimitsConfig` but
/// lives here too so the manager can be constructed without a hard
/// dependency on the config crate's own defaults-loading machinery.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Max simultaneously running + reserved subagents per session.
    pub max_concurrent: usize,
    /// Max running + completed + reserved subagents retained per session.
    pub max_retained: usize,
    /// Seconds a reservation may live unconsumed before GC.
    pub reservation_ttl_secs: u64,
}

impl From<openclaw_config::LimitsConfig> for Limits {
    fn from(c: openclaw_config::LimitsConfig) -> Self {
        Self { max_concurrent: c.max_concurrent, max_retained: c.max_retained, reservation_ttl_secs: c.reservation_ttl_secs }
    }
}

impl Default for Limits {
    fn default() -> Self {
        openclaw_config::LimitsConfig::default().into()
    }
}

/// A held admission slot not yet consumed by [`register`](crate::subagent::SubagentManager::register).
#[derive(Debug, Clone)]
pub struct SubagentReservation {
    /// The reservation's own id.
    pub reserve_id: String,
    /// The session that reserved the slot.
    pub requester_session_key: SessionKey,
    /// When the reservation was created.
    pub reserved_at: DateTime<Utc>,
}

/// Why `reserveSlot` denied admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionDenied {
    /// `running + reserved` already at `max_concurrent`.
    Concurrency,
    /// `running + completed + reserved` already at `max_retained`; carries
    /// up to three oldest completed run ids as removal suggestions.
    Capacity {
        /// Suggested candidates to remove, oldest first.
        suggestions: Vec<RunId>,
    },
}

impl AdmissionDenied {
    /// A short machine-checkable reason string (spec §4.7 `reason`).
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Concurrency => "concurrency",
            Self::Capacity { .. } => "capacity",
        }
    }
}

/// Result of `reserveSlot`.
#[derive(Debug, Clone)]
pub enum ReserveOutcome {
    /// Admission granted; holds a reservation id.
    Allowed {
        /// The minted reservation id.
        reserve_id: String,
    },
    /// Admission denied.
    Denied(AdmissionDenied),
}

/// A running subagent (spec §3 `SubagentContext`).
#[derive(Debug, Clone)]
pub struct SubagentContext {
    /// This run's globally unique id.
    pub run_id: RunId,
    /// The spawned child's session key.
    pub child_session_key: SessionKey,
    /// The parent session that spawned it.
    pub requester_session_key: SessionKey,
    /// The task description given at spawn time.
    pub task: String,
    /// An optional short label, used in status text instead of the task.
    pub label: Option<String>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Model id, if one was pinned at spawn time.
    pub model: Option<String>,
    /// Whether this run is a plan-approval run.
    pub plan_mode: bool,
    /// The origin channel info captured at spawn time, used to route the
    /// announce message back (spec §4.7 "origin resolution").
    pub origin: Option<AnnounceOrigin>,
    /// Whether the child session should be deleted once announced
    /// (`cleanup == "delete"`, spec §6 `sessions_spawn`).
    pub cleanup_delete: bool,
}

/// Chat-channel addressing info captured at spawn time or from a session's
/// last-known values (spec §4.7 "origin resolution").
#[derive(Debug, Clone, Default)]
pub struct AnnounceOrigin {
    /// The channel adapter name (`telegram`, `discord`, …).
    pub channel: Option<String>,
    /// The channel account id the message should be sent from.
    pub account_id: Option<String>,
    /// The channel-specific recipient address.
    pub to: Option<String>,
    /// The channel-specific thread id, if threaded.
    pub thread_id: Option<String>,
}

impl AnnounceOrigin {
    /// Merge `self` (requester-captured, fresher) over `fallback` (the
    /// session's stored last-known values), field by field.
    #[must_use]
    pub fn merged_over(self, fallback: Self) -> Self {
        Self {
            channel: self.channel.or(fallback.channel),
            account_id: self.account_id.or(fallback.account_id),
            to: self.to.or(fallback.to),
            thread_id: self.thread_id.or(fallback.thread_id),
        }
    }
}

/// Terminal state of a finished run (spec §3 `outcome.status`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// Completed normally.
    Ok,
    /// Completed with an error.
    Error,
    /// Timed out.
    Timeout,
    /// Status could not be determined.
    Unknown,
}

/// A completed run's outcome.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// The terminal status.
    pub status: OutcomeStatus,
    /// Error text, when `status == Error`.
    pub error: Option<String>,
}

/// A completed subagent (spec §3 `SubagentResult`).
#[derive(Debug, Clone)]
pub struct SubagentResult {
    /// The run's context as it was while running.
    pub context: SubagentContext,
    /// When the run ended.
    pub ended_at: DateTime<Utc>,
    /// The terminal outcome.
    pub outcome: Outcome,
    /// A short summary of the child's final reply, if extracted.
    pub summary: Option<String>,
    /// Whether the completion-announce flow has run for this record.
    pub notified: bool,
    /// When this record was marked completed (may differ from `ended_at`,
    /// which reflects the child run's own clock).
    pub completed_at: DateTime<Utc>,
    /// For plan-mode runs, whether the plan was approved.
    pub plan_approved: Option<bool>,
}

/// A durable, disk-persisted record of one subagent run (spec §3
/// `SubagentRunRecord`, §4.7 "durable registry").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubagentRunRecord {
    /// The run's id.
    pub run_id: RunId,
    /// The child session key.
    pub child_session_key: SessionKey,
    /// The parent session key.
    pub requester_session_key: SessionKey,
    /// The task description.
    pub task: String,
    /// Optional short label.
    pub label: Option<String>,
    /// Model id, if one was pinned at spawn time.
    #[serde(default)]
    pub model: Option<String>,
    /// When the run was created (admission/registration time).
    pub created_at: DateTime<Utc>,
    /// When the run started, if distinct from `created_at`.
    pub started_at: DateTime<Utc>,
    /// When the run ended, if it has.
    pub ended_at: Option<DateTime<Utc>>,
    /// Outcome status, if ended.
    pub outcome_status: Option<OutcomeStatus>,
    /// Outcome error text, if any.
    pub outcome_error: Option<String>,
    /// Summary text, if extracted.
    pub summary: Option<String>,
    /// Whether the announce flow has run.
    pub notified: bool,
    /// Whether this was a plan-mode run.
    pub plan_mode: bool,
    /// For plan-mode runs, whether the plan was approved.
    pub plan_approved: Option<bool>,
}

/// A structured, per-subagent read model for the `sessions_list` tool (spec
/// §6) — the same running/completed data [`status_text_for`](crate::subagent::SubagentManager::status_text_for)
/// renders as Markdown, shaped for a tool caller to consume as JSON instead
/// of prose.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubagentSummary {
    /// The run's id.
    pub run_id: RunId,
    /// The spawned child's session key.
    pub child_session_key: SessionKey,
    /// The task description given at spawn time.
    pub task: String,
    /// An optional short label.
    pub label: Option<String>,
    /// `"running"` or the debug-rendered terminal outcome status.
    pub status: String,
    /// Whether this is a plan-approval run.
    pub plan_mode: bool,
    /// For plan-mode runs, whether the plan was approved.
    pub plan_approved: Option<bool>,
}

/// One kind of pending interaction the CLI's output stream can request
/// (spec §3 `PendingInteraction.type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingInteractionKind {
    /// The CLI called `AskUserQuestion`.
    AskUserQuestion,
    /// The CLI called `ExitPlanMode`.
    PlanApproval,
}

/// One selectable answer to a pending interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingInteractionOption {
    /// The option's label.
    pub label: String,
    /// Optional longer description.
    pub description: Option<String>,
}

/// A paused CLI run waiting on a user answer (spec §3 `PendingInteraction`).
/// Keyed by `sessionKey`; at most one per session.
#[derive(Debug, Clone)]
pub struct PendingInteraction {
    /// This interaction's own id.
    pub id: String,
    /// The CLI backend's own session id.
    pub cli_session_id: Option<String>,
    /// The session the interaction is pending for.
    pub session_key: SessionKey,
    /// The tool-use id this interaction answers.
    pub tool_call_id: String,
    /// Which kind of interaction this is.
    pub kind: PendingInteractionKind,
    /// The question text shown to the user.
    pub question: String,
    /// Selectable options, if any.
    pub options: Vec<PendingInteractionOption>,
    /// Whether more than one option may be selected.
    pub multi_select: bool,
    /// When this interaction was recorded.
    pub created_at: DateTime<Utc>,
    /// When this interaction expires if unanswered.
    pub expires_at: DateTime<Utc>,
    /// The agent/session that raised the interaction.
    pub agent_id: Option<AgentId>,
    /// The backend that raised the interaction.
    pub provider: String,
}
