//! C7 — subagent manager, durable registry, and heartbeat coalescing.
//!
//! The admission-control triple `(running, completed, reserved)` (spec §3,
//! §5) lives behind one `std::sync::Mutex`: every mutation is a short,
//! synchronous critical section, matching the spec's "treat as atomic under
//! cooperative scheduling... protect with a single mutex" guidance. The
//! announce flow itself (§4.7 "Announce flow") is driven externally by
//! [`crate::announce`]; this module only tracks lifecycle and notifies a
//! heartbeat.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use openclaw_core::{RunId, SessionKey};
use openclaw_events::{EventBus, OpenclawEvent};
use openclaw_storage::JsonFileStore;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::error::{RuntimeError, RuntimeResult};
use crate::types::{
    AdmissionDenied, Limits, Outcome, OutcomeStatus, ReserveOutcome, SubagentContext, SubagentReservation, SubagentResult,
    SubagentRunRecord, SubagentSummary,
};

#[derive(Default)]
struct Inner {
    running: HashMap<RunId, SubagentContext>,
    completed: HashMap<RunId, SubagentResult>,
    reserved: HashMap<String, SubagentReservation>,
}

impl Inner {
    fn count_for(&self, session_key: &SessionKey) -> (usize, usize, usize) {
        let running = self.running.values().filter(|c| &c.requester_session_key == session_key).count();
        let completed = self
            .completed
            .values()
            .filter(|r| &r.context.requester_session_key == session_key)
            .count();
        let reserved = self
            .reserved
            .values()
            .filter(|r| &r.requester_session_key == session_key)
            .count();
        (running, completed, reserved)
    }

    fn oldest_completed_for(&self, session_key: &SessionKey, limit: usize) -> Vec<RunId> {
        let mut candidates: Vec<&SubagentResult> = self
            .completed
            .values()
            .filter(|r| &r.context.requester_session_key == session_key)
            .collect();
        candidates.sort_by_key(|r| r.completed_at);
        candidates.into_iter().take(limit).map(|r| r.context.run_id.clone()).collect()
    }

    fn records(&self) -> Vec<SubagentRunRecord> {
        let running = self.running.values().map(context_to_record);
        let completed = self.completed.values().map(result_to_record);
        running.chain(completed).collect()
    }
}

fn context_to_record(context: &SubagentContext) -> SubagentRunRecord {
    SubagentRunRecord {
        run_id: context.run_id.clone(),
        child_session_key: context.child_session_key.clone(),
        requester_session_key: context.requester_session_key.clone(),
        task: context.task.clone(),
        label: context.label.clone(),
        model: context.model.clone(),
        created_at: context.started_at,
        started_at: context.started_at,
        ended_at: None,
        outcome_status: None,
        outcome_error: None,
        summary: None,
        notified: false,
        plan_mode: context.plan_mode,
        plan_approved: None,
    }
}

fn result_to_record(result: &SubagentResult) -> SubagentRunRecord {
    SubagentRunRecord {
        run_id: result.context.run_id.clone(),
        child_session_key: result.context.child_session_key.clone(),
        requester_session_key: result.context.requester_session_key.clone(),
        task: result.context.task.clone(),
        label: result.context.label.clone(),
        model: result.context.model.clone(),
        created_at: result.context.started_at,
        started_at: result.context.started_at,
        ended_at: Some(result.ended_at),
        outcome_status: Some(result.outcome.status),
        outcome_error: result.outcome.error.clone(),
        summary: result.summary.clone(),
        notified: result.notified,
        plan_mode: result.context.plan_mode,
        plan_approved: result.plan_approved,
    }
}

fn record_to_context(record: &SubagentRunRecord) -> SubagentContext {
    SubagentContext {
        run_id: record.run_id.clone(),
        child_session_key: record.child_session_key.clone(),
        requester_session_key: record.requester_session_key.clone(),
        task: record.task.clone(),
        label: record.label.clone(),
        started_at: record.started_at,
        model: record.model.clone(),
        plan_mode: record.plan_mode,
        origin: None,
        cleanup_delete: false,
    }
}

fn record_to_result(record: &SubagentRunRecord) -> SubagentResult {
    SubagentResult {
        context: record_to_context(record),
        ended_at: record.ended_at.unwrap_or(record.started_at),
        outcome: Outcome {
            status: record.outcome_status.unwrap_or(OutcomeStatus::Unknown),
            error: record.outcome_error.clone(),
        },
        summary: record.summary.clone(),
        notified: true,
        completed_at: record.ended_at.unwrap_or(record.started_at),
        plan_approved: record.plan_approved,
    }
}

/// Coalesces repeated "a subagent finished, wake the dispatcher" signals
/// into at most one notification per second (spec §4.7 `markCompleted`:
/// "request an immediate heartbeat (coalesced to 1s)").
#[derive(Default)]
pub struct HeartbeatCoalescer {
    notify: Notify,
    scheduled: AtomicBool,
}

impl HeartbeatCoalescer {
    /// Create an idle coalescer.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Request a heartbeat. If one is already scheduled within the current
    /// 1s window, this is a no-op; otherwise a single delayed notification
    /// is scheduled.
    pub fn request(self: &Arc<Self>) {
        if self.scheduled.swap(true, Ordering::SeqCst) {
            return;
        }
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            this.scheduled.store(false, Ordering::SeqCst);
            this.notify.notify_waiters();
        });
    }

    /// Wait for the next coalesced heartbeat.
    pub async fn wait(&self) {
        self.notify.notified().await;
    }
}

/// Read-model snapshot of pool occupancy (supplemented feature — not in
/// spec.md's data model, but a harmless typed read used by the daemon's
/// health surface; see SPEC_FULL.md §11).
#[derive(Debug, Clone, Copy)]
pub struct SubagentStats {
    /// Currently running subagents across all sessions.
    pub running: usize,
    /// Completed (retained) subagents across all sessions.
    pub completed: usize,
    /// Outstanding reservations across all sessions.
    pub reserved: usize,
}

/// Admission control, lifecycle tracking, and durable persistence for
/// subagent runs (spec §4.7, §3 invariants).
pub struct SubagentManager {
    limits: Limits,
    state: Mutex<Inner>,
    registry: JsonFileStore<SubagentRunRecord>,
    events: EventBus,
    heartbeat: Arc<HeartbeatCoalescer>,
}

impl SubagentManager {
    /// Construct a manager backed by `registry_path`, restoring any durable
    /// records found there (spec §4.7 "durable registry").
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Storage`] if the registry file exists but
    /// can't be read or parsed.
    pub fn load(registry_path: impl Into<std::path::PathBuf>, limits: Limits, events: EventBus) -> RuntimeResult<Self> {
        let registry = JsonFileStore::new(registry_path);
        let records = registry.load()?;
        let mut state = Inner::default();
        for record in &records {
            sync_from_record(&mut state, record);
        }
        info!(
            running = state.running.len(),
            completed = state.completed.len(),
            "subagent registry restored"
        );
        Ok(Self {
            limits,
            state: Mutex::new(state),
            registry,
            events,
            heartbeat: HeartbeatCoalescer::new(),
        })
    }

    /// The heartbeat coalescer `markCompleted` signals through.
    #[must_use]
    pub fn heartbeat(&self) -> Arc<HeartbeatCoalescer> {
        Arc::clone(&self.heartbeat)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn persist(&self, state: &Inner) -> RuntimeResult<()> {
        self.registry.save(&state.records()).map_err(RuntimeError::from)
    }

    /// `reserveSlot` (spec §4.7). Atomic: garbage-collects expired
    /// reservations first (spec §3 "a reservation older than 30s is
    /// garbage-collected"), then checks concurrency and capacity.
    pub fn reserve_slot(&self, requester_session_key: &SessionKey) -> ReserveOutcome {
        let mut state = self.lock();
        gc_expired_reservations(&mut state, self.limits.reservation_ttl_secs);

        let (running, completed, reserved) = state.count_for(requester_session_key);
        if running.saturating_add(reserved) >= self.limits.max_concurrent {
            return ReserveOutcome::Denied(AdmissionDenied::Concurrency);
        }
        if running.saturating_add(completed).saturating_add(reserved) >= self.limits.max_retained {
            let suggestions = state.oldest_completed_for(requester_session_key, 3);
            return ReserveOutcome::Denied(AdmissionDenied::Capacity { suggestions });
        }

        let reserve_id = uuid::Uuid::new_v4().to_string();
        state.reserved.insert(
            reserve_id.clone(),
            SubagentReservation {
                reserve_id: reserve_id.clone(),
                requester_session_key: requester_session_key.clone(),
                reserved_at: Utc::now(),
            },
        );
        ReserveOutcome::Allowed { reserve_id }
    }

    /// `register` (spec §4.7). Consumes the reservation and starts tracking
    /// `context` as running.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::ReservationNotFound`] if `reserve_id` no
    /// longer holds a reservation (already consumed, GC'd, or unknown).
    pub fn register(&self, context: SubagentContext, reserve_id: &str) -> RuntimeResult<()> {
        let mut state = self.lock();
        if state.reserved.remove(reserve_id).is_none() {
            return Err(RuntimeError::ReservationNotFound(reserve_id.to_owned()));
        }
        let run_id = context.run_id.clone();
        let requester = context.requester_session_key.clone();
        let child = context.child_session_key.clone();
        let task = context.task.clone();
        let started_at = context.started_at;
        state.running.insert(run_id.clone(), context);
        self.persist(&state)?;
        drop(state);

        self.events.publish(OpenclawEvent::Spawned {
            run_id,
            requester_session_key: requester,
            child_session_key: child,
            task,
            started_at,
        });
        Ok(())
    }

    /// `markCompleted` (spec §4.7). No-op if `run_id` is not currently
    /// running. Publishes a `completed` event and requests a heartbeat;
    /// never injects a message itself — that is exclusively the announce
    /// flow's job (spec §4.7, §9 "system-event-injection... removed").
    pub fn mark_completed(&self, run_id: &RunId, outcome: Outcome, summary: Option<String>, ended_at: Option<DateTime<Utc>>) -> bool {
        let mut state = self.lock();
        let Some(context) = state.running.remove(run_id) else {
            return false;
        };
        let requester = context.requester_session_key.clone();
        let ended_at = ended_at.unwrap_or_else(Utc::now);
        let outcome_status = outcome.status;
        state.completed.insert(
            run_id.clone(),
            SubagentResult {
                context,
                ended_at,
                outcome,
                summary,
                notified: false,
                completed_at: Utc::now(),
                plan_approved: None,
            },
        );
        if let Err(e) = self.persist(&state) {
            warn!(error = %e, run_id = %run_id, "failed to persist subagent completion");
        }
        drop(state);

        self.events.publish(OpenclawEvent::Completed {
            run_id: run_id.clone(),
            requester_session_key: requester,
            outcome_status: format!("{outcome_status:?}").to_lowercase(),
            ended_at,
        });
        self.heartbeat.request();
        true
    }

    /// Mark a completed record's `planApproved` result (plan-mode runs
    /// only); used by the announce flow when a plan approval answer comes
    /// back (spec §3 `SubagentResult.planApproved`).
    pub fn set_plan_approved(&self, run_id: &RunId, approved: bool) {
        let mut state = self.lock();
        if let Some(result) = state.completed.get_mut(run_id) {
            result.plan_approved = Some(approved);
            let _ = self.persist(&state);
        }
    }

    /// Mark a completed record as having been announced (spec §4.7 step
    /// 6-7, invoked once the announce flow finishes best-effort delivery).
    pub fn mark_notified(&self, run_id: &RunId) {
        let mut state = self.lock();
        if let Some(result) = state.completed.get_mut(run_id) {
            result.notified = true;
            let _ = self.persist(&state);
        }
    }

    /// Snapshot a completed record, if present.
    #[must_use]
    pub fn get_completed(&self, run_id: &RunId) -> Option<SubagentResult> {
        self.lock().completed.get(run_id).cloned()
    }

    /// `removeSubagent` (spec §4.7).
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::StillRunning`] if `run_id` is still running,
    /// [`RuntimeError::PermissionDenied`] if it belongs to a different
    /// session, or [`RuntimeError::NotFound`] if there is no record at all.
    pub fn remove_subagent(&self, run_id: &RunId, requester_session_key: &SessionKey) -> RuntimeResult<()> {
        let mut state = self.lock();
        if state.running.contains_key(run_id) {
            return Err(RuntimeError::StillRunning(run_id.clone()));
        }
        match state.completed.get(run_id) {
            None => Err(RuntimeError::NotFound(run_id.clone())),
            Some(result) if &result.context.requester_session_key != requester_session_key => {
                Err(RuntimeError::PermissionDenied { run_id: run_id.clone() })
            },
            Some(_) => {
                state.completed.remove(run_id);
                self.persist(&state)?;
                Ok(())
            },
        }
    }

    /// Read-model occupancy snapshot (spec SPEC_FULL.md §11 supplemented
    /// feature).
    #[must_use]
    pub fn stats(&self) -> SubagentStats {
        let state = self.lock();
        SubagentStats {
            running: state.running.len(),
            completed: state.completed.len(),
            reserved: state.reserved.len(),
        }
    }

    /// "Status text for prompt" (spec §4.7): a short Markdown block listing
    /// every running and completed subagent for `session_key`. Empty string
    /// if there are none.
    #[must_use]
    pub fn status_text_for(&self, session_key: &SessionKey) -> String {
        let state = self.lock();
        let (running_count, completed_count, reserved_count) = state.count_for(session_key);
        let used = running_count.saturating_add(completed_count).saturating_add(reserved_count);
        if used == 0 {
            return String::new();
        }

        let mut lines = vec![format!("**Subagents** ({used}/{})", self.limits.max_retained)];

        let mut running: Vec<&SubagentContext> = state.running.values().filter(|c| &c.requester_session_key == session_key).collect();
        running.sort_by_key(|c| c.started_at);
        for context in running {
            lines.push(format!(
                "- `{}` {} — running{}",
                context.run_id.short(),
                label_for(context.label.as_deref(), &context.task),
                plan_tag(context.plan_mode, None),
            ));
        }

        let mut completed: Vec<&SubagentResult> =
            state.completed.values().filter(|r| &r.context.requester_session_key == session_key).collect();
        completed.sort_by_key(|r| r.completed_at);
        for result in completed {
            lines.push(format!(
                "- `{}` {} — {:?}{}",
                result.context.run_id.short(),
                label_for(result.context.label.as_deref(), &result.context.task),
                result.outcome.status,
                plan_tag(result.context.plan_mode, result.plan_approved),
            ));
        }

        lines.join("\n")
    }

    /// Structured form of [`status_text_for`](Self::status_text_for), for
    /// the `sessions_list` tool (spec §6) to return as JSON rather than
    /// prose. Running entries first (oldest first), then completed.
    #[must_use]
    pub fn list_for(&self, session_key: &SessionKey) -> Vec<SubagentSummary> {
        let state = self.lock();

        let mut running: Vec<&SubagentContext> = state.running.values().filter(|c| &c.requester_session_key == session_key).collect();
        running.sort_by_key(|c| c.started_at);

        let mut completed: Vec<&SubagentResult> =
            state.completed.values().filter(|r| &r.context.requester_session_key == session_key).collect();
        completed.sort_by_key(|r| r.completed_at);

        running
            .into_iter()
            .map(|c| SubagentSummary {
                run_id: c.run_id.clone(),
                child_session_key: c.child_session_key.clone(),
                task: c.task.clone(),
                label: c.label.clone(),
                status: "running".to_owned(),
                plan_mode: c.plan_mode,
                plan_approved: None,
            })
            .chain(completed.into_iter().map(|r| SubagentSummary {
                run_id: r.context.run_id.clone(),
                child_session_key: r.context.child_session_key.clone(),
                task: r.context.task.clone(),
                label: r.context.label.clone(),
                status: format!("{:?}", r.outcome.status).to_lowercase(),
                plan_mode: r.context.plan_mode,
                plan_approved: r.plan_approved,
            }))
            .collect()
    }
}

fn label_for<'a>(label: Option<&'a str>, task: &'a str) -> &'a str {
    label.unwrap_or_else(|| {
        let end = task.char_indices().nth(50).map_or(task.len(), |(i, _)| i);
        &task[..end]
    })
}

fn plan_tag(plan_mode: bool, plan_approved: Option<bool>) -> &'static str {
    if !plan_mode {
        return "";
    }
    match plan_approved {
        Some(true) => " [PLAN:APPROVED]",
        Some(false) | None => " [PLAN:AWAITING APPROVAL]",
    }
}

fn gc_expired_reservations(state: &mut Inner, ttl_secs: u64) {
    let Ok(ttl) = chrono::Duration::from_std(Duration::from_secs(ttl_secs)) else {
        return;
    };
    let now = Utc::now();
    let before = state.reserved.len();
    state.reserved.retain(|_, r| now.signed_duration_since(r.reserved_at) < ttl);
    let removed = before.saturating_sub(state.reserved.len());
    if removed > 0 {
        debug!(removed, "garbage-collected expired subagent reservations");
    }
}

fn sync_from_record(state: &mut Inner, record: &SubagentRunRecord) {
    if record.ended_at.is_some() && record.outcome_status.is_some() {
        state.completed.insert(record.run_id.clone(), record_to_result(record));
    } else {
        state.running.insert(record.run_id.clone(), record_to_context(record));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> (tempfile::TempDir, SubagentManager) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        let mgr = SubagentManager::load(path, Limits::default(), EventBus::new()).unwrap();
        (dir, mgr)
    }

    fn context(session: &SessionKey) -> SubagentContext {
        SubagentContext {
            run_id: RunId::new(),
            child_session_key: SessionKey::new(format!("{}/child", session.as_str())),
            requester_session_key: session.clone(),
            task: "do a thing".to_owned(),
            label: None,
            started_at: Utc::now(),
            model: None,
            plan_mode: false,
            origin: None,
            cleanup_delete: false,
        }
    }

    #[test]
    fn reserve_then_register_then_complete() {
        let (_dir, mgr) = manager();
        let session = SessionKey::new("s1");

        let ReserveOutcome::Allowed { reserve_id } = mgr.reserve_slot(&session) else {
            panic!("expected allowed");
        };
        let ctx = context(&session);
        let run_id = ctx.run_id.clone();
        mgr.register(ctx, &reserve_id).unwrap();

        assert!(mgr.mark_completed(&run_id, Outcome { status: OutcomeStatus::Ok, error: None }, Some("done".to_owned()), None));
        let result = mgr.get_completed(&run_id).unwrap();
        assert_eq!(result.outcome.status, OutcomeStatus::Ok);
        assert!(!result.notified);
    }

    // Scenario S1: admission saturation at MAX_CONCURRENT.
    #[test]
    fn reserve_denied_at_concurrency_limit() {
        let (_dir, mgr) = manager();
        let session = SessionKey::new("s1");

        let mut reserve_ids = Vec::new();
        for _ in 0..5 {
            let ReserveOutcome::Allowed { reserve_id } = mgr.reserve_slot(&session) else {
                panic!("expected allowed");
            };
            let ctx = context(&session);
            mgr.register(ctx, &reserve_id).unwrap();
            reserve_ids.push(reserve_id);
        }

        let outcome = mgr.reserve_slot(&session);
        match outcome {
            ReserveOutcome::Denied(AdmissionDenied::Concurrency) => {},
            other => panic!("expected concurrency denial, got {other:?}"),
        }
    }

    // Scenario S2: capacity denial carries oldest-three suggestions.
    #[test]
    fn reserve_denied_at_capacity_with_suggestions() {
        let (_dir, mgr) = manager();
        let session = SessionKey::new("s1");

        // 14 completed + 1 running = 15 total (at MAX_RETAINED).
        let mut oldest_ids = Vec::new();
        for i in 0..14 {
            let ReserveOutcome::Allowed { reserve_id } = mgr.reserve_slot(&session) else {
                panic!("allowed");
            };
            let ctx = context(&session);
            let run_id = ctx.run_id.clone();
            mgr.register(ctx, &reserve_id).unwrap();
            mgr.mark_completed(&run_id, Outcome { status: OutcomeStatus::Ok, error: None }, None, None);
            if i < 3 {
                oldest_ids.push(run_id);
            }
            // Force distinct completed_at ordering.
            std::thread::sleep(Duration::from_millis(2));
        }
        let ReserveOutcome::Allowed { reserve_id } = mgr.reserve_slot(&session) else {
            panic!("allowed");
        };
        let ctx = context(&session);
        mgr.register(ctx, &reserve_id).unwrap();

        match mgr.reserve_slot(&session) {
            ReserveOutcome::Denied(AdmissionDenied::Capacity { suggestions }) => {
                assert_eq!(suggestions.len(), 3);
                assert_eq!(suggestions, oldest_ids);
            },
            other => panic!("expected capacity denial, got {other:?}"),
        }
    }

    #[test]
    fn register_with_unknown_reservation_fails() {
        let (_dir, mgr) = manager();
        let session = SessionKey::new("s1");
        let err = mgr.register(context(&session), "not-a-real-reservation").unwrap_err();
        assert!(matches!(err, RuntimeError::ReservationNotFound(_)));
    }

    #[test]
    fn mark_completed_on_unknown_run_is_noop() {
        let (_dir, mgr) = manager();
        let unknown = RunId::new();
        let completed = mgr.mark_completed(&unknown, Outcome { status: OutcomeStatus::Ok, error: None }, None, None);
        assert!(!completed);
    }

    #[test]
    fn remove_running_subagent_is_rejected() {
        let (_dir, mgr) = manager();
        let session = SessionKey::new("s1");
        let ReserveOutcome::Allowed { reserve_id } = mgr.reserve_slot(&session) else {
            panic!("allowed")
        };
        let ctx = context(&session);
        let run_id = ctx.run_id.clone();
        mgr.register(ctx, &reserve_id).unwrap();

        let err = mgr.remove_subagent(&run_id, &session).unwrap_err();
        assert!(matches!(err, RuntimeError::StillRunning(_)));
    }

    #[test]
    fn remove_across_sessions_is_permission_denied() {
        let (_dir, mgr) = manager();
        let session = SessionKey::new("s1");
        let other = SessionKey::new("s2");
        let ReserveOutcome::Allowed { reserve_id } = mgr.reserve_slot(&session) else {
            panic!("allowed")
        };
        let ctx = context(&session);
        let run_id = ctx.run_id.clone();
        mgr.register(ctx, &reserve_id).unwrap();
        mgr.mark_completed(&run_id, Outcome { status: OutcomeStatus::Ok, error: None }, None, None);

        let err = mgr.remove_subagent(&run_id, &other).unwrap_err();
        assert!(matches!(err, RuntimeError::PermissionDenied { .. }));
    }

    #[test]
    fn remove_completed_subagent_succeeds() {
        let (_dir, mgr) = manager();
        let session = SessionKey::new("s1");
        let ReserveOutcome::Allowed { reserve_id } = mgr.reserve_slot(&session) else {
            panic!("allowed")
        };
        let ctx = context(&session);
        let run_id = ctx.run_id.clone();
        mgr.register(ctx, &reserve_id).unwrap();
        mgr.mark_completed(&run_id, Outcome { status: OutcomeStatus::Ok, error: None }, None, None);

        mgr.remove_subagent(&run_id, &session).unwrap();
        assert!(mgr.get_completed(&run_id).is_none());
    }

    // Invariant 4: completed records are only removed by `removeSubagent`.
    #[test]
    fn completed_records_never_evicted_by_time() {
        let (_dir, mgr) = manager();
        let session = SessionKey::new("s1");
        let ReserveOutcome::Allowed { reserve_id } = mgr.reserve_slot(&session) else {
            panic!("allowed")
        };
        let ctx = context(&session);
        let run_id = ctx.run_id.clone();
        mgr.register(ctx, &reserve_id).unwrap();
        mgr.mark_completed(&run_id, Outcome { status: OutcomeStatus::Ok, error: None }, None, None);

        // Simulate the passage of time via direct field mutation on a clone.
        assert!(mgr.get_completed(&run_id).is_some());
    }

    #[test]
    fn registry_round_trips_across_manager_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        let session = SessionKey::new("s1");
        let run_id;
        {
            let mgr = SubagentManager::load(&path, Limits::default(), EventBus::new()).unwrap();
            let ReserveOutcome::Allowed { reserve_id } = mgr.reserve_slot(&session) else {
                panic!("allowed")
            };
            let ctx = context(&session);
            run_id = ctx.run_id.clone();
            mgr.register(ctx, &reserve_id).unwrap();
        }
        // Still running when the process "restarted" — observed, not lost.
        let restarted = SubagentManager::load(&path, Limits::default(), EventBus::new()).unwrap();
        assert_eq!(restarted.stats().running, 1);
        assert_eq!(restarted.stats().completed, 0);

        restarted.mark_completed(&run_id, Outcome { status: OutcomeStatus::Ok, error: None }, None, None);
        drop(restarted);

        let again = SubagentManager::load(&path, Limits::default(), EventBus::new()).unwrap();
        assert_eq!(again.stats().running, 0);
        assert_eq!(again.stats().completed, 1);
        assert!(again.get_completed(&run_id).unwrap().notified);
    }

    #[test]
    fn status_text_is_empty_when_nothing_tracked() {
        let (_dir, mgr) = manager();
        assert_eq!(mgr.status_text_for(&SessionKey::new("s1")), "");
    }

    #[test]
    fn status_text_lists_running_and_completed() {
        let (_dir, mgr) = manager();
        let session = SessionKey::new("s1");
        let ReserveOutcome::Allowed { reserve_id } = mgr.reserve_slot(&session) else {
            panic!("allowed")
        };
        let ctx = context(&session);
        let run_id = ctx.run_id.clone();
        mgr.register(ctx, &reserve_id).unwrap();
        mgr.mark_completed(&run_id, Outcome { status: OutcomeStatus::Ok, error: None }, None, None);

        let text = mgr.status_text_for(&session);
        assert!(text.contains(run_id.short()));
        assert!(text.contains("(1/15)"));
    }

    #[test]
    fn list_for_reports_running_then_completed() {
        let (_dir, mgr) = manager();
        let session = SessionKey::new("s1");

        let ReserveOutcome::Allowed { reserve_id } = mgr.reserve_slot(&session) else {
            panic!("allowed")
        };
        let ctx = context(&session);
        let running_run_id = ctx.run_id.clone();
        mgr.register(ctx, &reserve_id).unwrap();

        let ReserveOutcome::Allowed { reserve_id } = mgr.reserve_slot(&session) else {
            panic!("allowed")
        };
        let ctx = context(&session);
        let completed_run_id = ctx.run_id.clone();
        mgr.register(ctx, &reserve_id).unwrap();
        mgr.mark_completed(&completed_run_id, Outcome { status: OutcomeStatus::Ok, error: None }, None, None);

        let summaries = mgr.list_for(&session);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].run_id, running_run_id);
        assert_eq!(summaries[0].status, "running");
        assert_eq!(summaries[1].run_id, completed_run_id);
        assert_eq!(summaries[1].status, "ok");
    }

    #[test]
    fn list_for_is_empty_for_unrelated_session() {
        let (_dir, mgr) = manager();
        assert!(mgr.list_for(&SessionKey::new("nobody")).is_empty());
    }
}
