//! C7 — completion-announce flow (spec §4.7 `runSubagentAnnounceFlow`).
//!
//! Converts a finished child run into a bounded message injected back into
//! the parent session. Every outbound step is best-effort: failures are
//! logged and swallowed (spec §7 "the announce flow is best-effort").

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use openclaw_cli_runner::Usage;
use openclaw_config::{ModelCost, QueueMode};
use openclaw_core::SessionKey;
use openclaw_gateway::{AgentParams, AgentWaitParams, GatewayClient, RunStatus, SessionsDeleteParams, SessionsPatchParams};
use tracing::warn;

use crate::transcript::{read_transcript, TranscriptRecord};
use crate::types::{AnnounceOrigin, OutcomeStatus, SubagentResult};

/// Summaries are truncated to this many characters (spec §4.7 step 3).
const SUMMARY_MAX_CHARS: usize = 200;

/// The `agent.wait` call is capped at this many ms regardless of the run's
/// own `timeoutMs` (spec §4.7 step 1 "`min(timeoutMs, 60 000)`").
const MAX_WAIT_MS: u64 = 60_000;

/// The cooperative dispatcher's "is a turn still running, can I steer or
/// must I queue" surface (spec §4.7 step 6, §9 "cooperative dispatcher
/// queue"). Implemented by the daemon's run dispatcher; kept abstract here
/// so the announce flow has no hard dependency on `openclaw-cli-runner`'s
/// queue internals.
#[async_trait]
pub trait AnnounceDispatcher: Send + Sync {
    /// Attempt to inject `message` into a still-running LLM turn for
    /// `session_key` so it becomes visible mid-dialogue. Returns `true` on
    /// success.
    async fn try_steer(&self, session_key: &SessionKey, message: &str) -> bool;

    /// Enqueue `message` to be delivered once the current turn for
    /// `session_key` finishes.
    async fn enqueue(&self, session_key: &SessionKey, message: &str);

    /// Whether `session_key` currently has an LLM turn in flight.
    async fn is_run_active(&self, session_key: &SessionKey) -> bool;
}

/// Per-session delivery preferences and addressing info the announce flow
/// needs but does not own (spec §4.7 "Consult the parent session's queue
/// settings", "Origin resolution").
#[derive(Debug, Clone, Default)]
pub struct AnnounceSessionContext {
    /// The parent session's configured delivery mode.
    pub queue_mode: QueueMode,
    /// The parent session's last-known channel addressing, used as a
    /// fallback when the run's own captured origin is incomplete.
    pub last_origin: AnnounceOrigin,
    /// The child session's backend-reported id, if known.
    pub child_cli_session_id: Option<String>,
}

/// Everything the announce flow needs for one completed child run, beyond
/// what [`SubagentResult`] already carries.
pub struct AnnounceInput<'a> {
    /// The completed run.
    pub result: &'a SubagentResult,
    /// Directory session transcripts are stored under (spec §4.5).
    pub transcript_dir: &'a Path,
    /// The run's own timeout, used to bound the `agent.wait` call.
    pub timeout_ms: u64,
    /// Token usage for the child run, if the parent has already observed it
    /// (the CLI runner's `ParsedOutput.usage`, not part of `SubagentResult`
    /// itself — see DESIGN.md for why this is threaded in explicitly).
    pub usage: Option<Usage>,
    /// Cost-per-token config for the run's model, if known.
    pub model_cost: Option<ModelCost>,
    /// Session delivery/addressing context.
    pub session: &'a AnnounceSessionContext,
    /// Idempotency key for the eventual `agent` call (spec §5 "deduplicated
    /// by `idempotencyKey`").
    pub idempotency_key: String,
}

/// Extract a bounded summary from a child's final reply (spec §4.7 step 3).
#[must_use]
pub fn extract_summary(reply: &str) -> Option<String> {
    let trimmed = reply.trim();
    if trimmed.is_empty() {
        return None;
    }

    let body = trimmed.rfind("SUMMARY:").map_or(trimmed, |idx| {
        let after = idx.checked_add("SUMMARY:".len()).unwrap_or(trimmed.len());
        trimmed[after..].trim()
    });

    Some(truncate_tail(body, SUMMARY_MAX_CHARS))
}

fn truncate_tail(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        return s.to_owned();
    }
    let skip = char_count.saturating_sub(max_chars);
    s.chars().skip(skip).collect()
}

fn format_duration_compact(started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> String {
    let duration = ended_at.signed_duration_since(started_at);
    if duration.num_hours() > 0 {
        format!("{}h {}m", duration.num_hours(), duration.num_minutes() % 60)
    } else if duration.num_minutes() > 0 {
        format!("{}m {}s", duration.num_minutes(), duration.num_seconds() % 60)
    } else {
        format!("{}s", duration.num_seconds().max(0))
    }
}

#[allow(clippy::arithmetic_side_effects)] // cost is an estimate; tokens-per-1k scaling can't overflow a cost in dollars
fn estimate_cost(usage: &Usage, cost: &ModelCost) -> f64 {
    let input_cost = (usage.input_tokens as f64 / 1000.0) * cost.input_cost_per_1k;
    let output_cost = (usage.output_tokens as f64 / 1000.0) * cost.output_cost_per_1k;
    input_cost + output_cost
}

/// Build the stats line (spec §4.7 step 4). Missing values render as `n/a`.
#[must_use]
pub fn format_stats_line(input: &AnnounceInput<'_>, started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> String {
    let runtime = format_duration_compact(started_at, ended_at);

    let (input_tokens, output_tokens, total_tokens, cost) = match input.usage {
        Some(usage) => {
            let total = if usage.total_tokens != 0 {
                usage.total_tokens
            } else {
                usage.input_tokens.saturating_add(usage.output_tokens)
            };
            let cost = input.model_cost.map(|c| format!("${:.4}", estimate_cost(&usage, &c)));
            (Some(usage.input_tokens), Some(usage.output_tokens), Some(total), cost)
        },
        None => (None, None, None, None),
    };

    let child_session_id = input.session.child_cli_session_id.as_deref().unwrap_or("n/a");
    let transcript_path = input.transcript_dir.join(format!("{}.jsonl", input.result.context.child_session_key.as_str()));

    format!(
        "runtime: {runtime} | tokens: {}/{}/{} | cost: {} | child session: {} | child session id: {child_session_id} | transcript: {}",
        fmt_opt_u64(input_tokens),
        fmt_opt_u64(output_tokens),
        fmt_opt_u64(total_tokens),
        cost.unwrap_or_else(|| "n/a".to_owned()),
        input.result.context.child_session_key.as_str(),
        transcript_path.display(),
    )
}

fn fmt_opt_u64(v: Option<u64>) -> String {
    v.map_or_else(|| "n/a".to_owned(), |v| v.to_string())
}

/// Build the trigger message injected into the parent session (spec §4.7
/// step 5).
#[must_use]
pub fn build_trigger_message(input: &AnnounceInput<'_>, summary: Option<&str>, stats_line: &str) -> String {
    let result = input.result;
    if result.context.plan_mode {
        return match result.outcome.status {
            OutcomeStatus::Ok => format!(
                "Subagent `{}` finished planning and is ready for execution. Reply to approve or reject.\n\n{}",
                result.context.run_id.short(),
                summary.unwrap_or("(no summary)"),
            ),
            _ => format!(
                "Subagent `{}` failed during planning: {}",
                result.context.run_id.short(),
                result.outcome.error.as_deref().unwrap_or("unknown error"),
            ),
        };
    }

    format!(
        "Subagent `{}` finished.\nTask: {}\nStatus: {:?}\nSummary: {}\nStats: {stats_line}",
        result.context.run_id.short(),
        result.context.task,
        result.outcome.status,
        summary.unwrap_or("(no summary)"),
    )
}

fn resolve_origin(result: &SubagentResult, session: &AnnounceSessionContext) -> AnnounceOrigin {
    result.context.origin.clone().unwrap_or_default().merged_over(session.last_origin.clone())
}

/// Run the full announce flow for one completed child run against a real
/// (or mocked) [`GatewayClient`] and [`AnnounceDispatcher`].
pub async fn run_subagent_announce_flow<G, D>(gateway: &G, dispatcher: &D, input: AnnounceInput<'_>)
where
    G: GatewayClient,
    D: AnnounceDispatcher,
{
    let result = input.result;
    let wait_ms = input.timeout_ms.min(MAX_WAIT_MS);

    let mut started_at = result.context.started_at;
    let mut ended_at = result.ended_at;

    match gateway.agent_wait(AgentWaitParams { run_id: result.context.run_id.as_str().to_owned(), timeout_ms: wait_ms }).await {
        Ok(wait_result) => {
            if let Some(s) = wait_result.started_at {
                started_at = s;
            }
            if let Some(e) = wait_result.ended_at {
                ended_at = e;
            }
            if wait_result.status == RunStatus::Timeout {
                warn!(run_id = %result.context.run_id, "agent.wait timed out during announce flow");
            }
        },
        Err(e) => warn!(error = %e, run_id = %result.context.run_id, "agent.wait failed during announce flow"),
    }

    let reply = read_transcript(input.transcript_dir, &result.context.child_session_key)
        .unwrap_or_default()
        .into_iter()
        .rev()
        .find_map(|record| match record {
            TranscriptRecord::Assistant { text, .. } => Some(text),
            _ => None,
        })
        .or_else(|| result.summary.clone())
        .unwrap_or_default();

    let summary = extract_summary(&reply);
    let stats_line = format_stats_line(&input, started_at, ended_at);
    let trigger_message = build_trigger_message(&input, summary.as_deref(), &stats_line);

    let origin = resolve_origin(result, input.session);
    let parent_session_key = &result.context.requester_session_key;

    let mut delivered = false;
    if matches!(input.session.queue_mode, QueueMode::Steer | QueueMode::SteerBacklog) {
        delivered = dispatcher.try_steer(parent_session_key, &trigger_message).await;
    }

    if !delivered {
        let parent_active = dispatcher.is_run_active(parent_session_key).await;
        match input.session.queue_mode {
            QueueMode::Off => {
                deliver_direct(gateway, parent_session_key, &trigger_message, &origin, &input.idempotency_key).await;
                delivered = true;
            },
            QueueMode::Followup | QueueMode::Collect | QueueMode::Interrupt | QueueMode::Steer | QueueMode::SteerBacklog if parent_active => {
                dispatcher.enqueue(parent_session_key, &trigger_message).await;
                delivered = true;
            },
            _ => {},
        }
    }

    if !delivered {
        deliver_direct(gateway, parent_session_key, &trigger_message, &origin, &input.idempotency_key).await;
    }

    let label = summary.as_deref().unwrap_or("subagent").chars().take(60).collect::<String>();
    if let Err(e) = gateway.sessions_patch(SessionsPatchParams { key: result.context.child_session_key.as_str().to_owned(), label }).await {
        warn!(error = %e, "sessions.patch failed during announce flow");
    }

    if result.context.cleanup_delete && !result.context.plan_mode {
        if let Err(e) = gateway
            .sessions_delete(SessionsDeleteParams { key: result.context.child_session_key.as_str().to_owned(), delete_transcript: true })
            .await
        {
            warn!(error = %e, "sessions.delete failed during announce flow");
        }
    }
}

async fn deliver_direct<G: GatewayClient>(gateway: &G, session_key: &SessionKey, message: &str, origin: &AnnounceOrigin, idempotency_key: &str) {
    let params = AgentParams {
        session_key: session_key.as_str().to_owned(),
        message: message.to_owned(),
        channel: origin.channel.clone(),
        account_id: origin.account_id.clone(),
        to: origin.to.clone(),
        thread_id: origin.thread_id.clone(),
        deliver: true,
        idempotency_key: idempotency_key.to_owned(),
    };
    if let Err(e) = gateway.agent(params).await {
        warn!(error = %e, session_key = %session_key, "agent delivery failed during announce flow");
    }
}

/// Minimal [`AnnounceDispatcher`] that never steers and reports no active
/// runs, so every announcement falls through to direct delivery. Used by
/// the daemon when no real dispatcher wiring is configured yet, and in
/// tests that only care about the gateway side.
#[derive(Default)]
pub struct NullDispatcher;

#[async_trait]
impl AnnounceDispatcher for NullDispatcher {
    async fn try_steer(&self, _session_key: &SessionKey, _message: &str) -> bool {
        false
    }

    async fn enqueue(&self, _session_key: &SessionKey, _message: &str) {}

    async fn is_run_active(&self, _session_key: &SessionKey) -> bool {
        false
    }
}
