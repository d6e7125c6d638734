//! C8 — typing controller (spec §4.8).
//!
//! Sustains a "typing…" indicator across long tool invocations by calling an
//! external `on_reply_start` callback on a periodic timer, and seals itself
//! once both the run and the dispatcher report idle so that a stale
//! tool-stream event arriving afterward cannot restart it (spec invariant 6,
//! scenario S6).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::debug;

/// Default interval between `on_reply_start` refreshes while typing is
/// active (spec §4.8 `typingIntervalSeconds`, default 6s).
pub const DEFAULT_TYPING_INTERVAL: Duration = Duration::from_secs(6);

/// Default TTL after which the periodic timer stops (spec §4.8
/// `refreshTypingTtl`, default 2 min).
pub const DEFAULT_TYPING_TTL: Duration = Duration::from_secs(2 * 60);

/// Default interval between timeout reminders (spec §4.8
/// `typingTimeoutReminderIntervalMs`, default 5 min).
pub const DEFAULT_REMINDER_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// A sentinel reply token that must never start typing (spec §4.8
/// `startTypingOnText`).
pub const DEFAULT_SILENT_REPLY_TOKEN: &str = "NO_REPLY";

/// Callbacks a [`TypingController`] drives. Implemented by the channel
/// adapter glue (outside this crate); kept as a trait so unit tests can
/// substitute a call-counting stub.
pub trait TypingCallbacks: Send + Sync + 'static {
    /// Invoked to (re)send the "typing…" signal to the channel.
    fn on_reply_start(&self);

    /// Invoked once the typing TTL expires with no completion, then
    /// repeatedly on the reminder interval. `elapsed` is time since typing
    /// first started.
    fn on_typing_timeout(&self, elapsed: Duration) {
        let _ = elapsed;
    }
}

#[derive(Default)]
struct Timers {
    typing: Option<JoinHandle<()>>,
    ttl: Option<JoinHandle<()>>,
    reminder: Option<JoinHandle<()>>,
}

impl Timers {
    fn abort_all(&mut self) {
        if let Some(h) = self.typing.take() {
            h.abort();
        }
        if let Some(h) = self.ttl.take() {
            h.abort();
        }
        if let Some(h) = self.reminder.take() {
            h.abort();
        }
    }
}

/// Configurable intervals, so tests can shrink them without touching the
/// defaults used in production.
#[derive(Debug, Clone, Copy)]
pub struct TypingIntervals {
    /// How often the periodic typing refresh fires.
    pub typing_interval: Duration,
    /// How long typing may run before the TTL stops the periodic timer.
    pub ttl: Duration,
    /// How often the timeout reminder re-fires once tripped.
    pub reminder_interval: Duration,
}

impl Default for TypingIntervals {
    fn default() -> Self {
        Self { typing_interval: DEFAULT_TYPING_INTERVAL, ttl: DEFAULT_TYPING_TTL, reminder_interval: DEFAULT_REMINDER_INTERVAL }
    }
}

/// Sustains a "typing…" indicator for one run, sealing itself once the run
/// and its dispatcher both report idle.
pub struct TypingController<C: TypingCallbacks> {
    callbacks: C,
    intervals: TypingIntervals,
    silent_reply_token: String,

    started: AtomicBool,
    active: AtomicBool,
    run_complete: AtomicBool,
    dispatch_idle: AtomicBool,
    sealed: AtomicBool,

    started_at: Mutex<Option<DateTime<Utc>>>,
    timers: Mutex<Timers>,
}

impl<C: TypingCallbacks> TypingController<C> {
    /// Build a controller around `callbacks` using the default intervals.
    #[must_use]
    pub fn new(callbacks: C) -> Arc<Self> {
        Self::with_intervals(callbacks, TypingIntervals::default())
    }

    /// Build a controller with explicit intervals (used by tests to avoid
    /// waiting on the real 6s/2min/5min defaults).
    #[must_use]
    pub fn with_intervals(callbacks: C, intervals: TypingIntervals) -> Arc<Self> {
        Arc::new(Self {
            callbacks,
            intervals,
            silent_reply_token: DEFAULT_SILENT_REPLY_TOKEN.to_owned(),
            started: AtomicBool::new(false),
            active: AtomicBool::new(false),
            run_complete: AtomicBool::new(false),
            dispatch_idle: AtomicBool::new(false),
            sealed: AtomicBool::new(false),
            started_at: Mutex::new(None),
            timers: Mutex::new(Timers::default()),
        })
    }

    /// Whether this cycle has sealed (spec invariant 6).
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::SeqCst)
    }

    /// `ensureStart` (spec §4.8): no-op if sealed or the run already
    /// completed; otherwise marks active and fires `on_reply_start` once,
    /// the first time this cycle starts.
    pub fn ensure_start(self: &Arc<Self>) {
        if self.sealed.load(Ordering::SeqCst) || self.run_complete.load(Ordering::SeqCst) {
            return;
        }
        self.active.store(true, Ordering::SeqCst);
        if !self.started.swap(true, Ordering::SeqCst) {
            *self.started_at.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(Utc::now());
            self.callbacks.on_reply_start();
        }
    }

    /// `startTypingLoop` (spec §4.8): idempotent; refreshes the TTL every
    /// call, and installs the periodic timer if it is not already running.
    pub fn start_typing_loop(self: &Arc<Self>) {
        if self.sealed.load(Ordering::SeqCst) || self.run_complete.load(Ordering::SeqCst) {
            return;
        }
        self.ensure_start();
        self.refresh_typing_ttl();

        let mut timers = self.timers.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if timers.typing.is_some() {
            return;
        }
        let this = Arc::clone(self);
        let interval = self.intervals.typing_interval;
        timers.typing = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if this.sealed.load(Ordering::SeqCst) || !this.active.load(Ordering::SeqCst) {
                    return;
                }
                this.callbacks.on_reply_start();
            }
        }));
    }

    /// `startTypingOnText` (spec §4.8): skip entirely for empty text or the
    /// configured silent-reply sentinel.
    pub fn start_typing_on_text(self: &Arc<Self>, text: &str) {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed == self.silent_reply_token {
            return;
        }
        self.start_typing_loop();
    }

    /// `refreshTypingTtl` (spec §4.8): reset the TTL deadline. On expiry the
    /// periodic timer stops (but the controller is not sealed); if a start
    /// time exists, `on_typing_timeout` fires once, then on the reminder
    /// interval until sealed or the run completes.
    pub fn refresh_typing_ttl(self: &Arc<Self>) {
        if self.sealed.load(Ordering::SeqCst) {
            return;
        }
        let mut timers = self.timers.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(h) = timers.ttl.take() {
            h.abort();
        }
        let this = Arc::clone(self);
        let ttl = self.intervals.ttl;
        timers.ttl = Some(tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            this.on_typing_ttl_expired();
        }));
    }

    fn on_typing_ttl_expired(self: &Arc<Self>) {
        if self.sealed.load(Ordering::SeqCst) {
            return;
        }
        let mut timers = self.timers.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(h) = timers.typing.take() {
            h.abort();
        }

        let Some(started_at) = *self.started_at.lock().unwrap_or_else(std::sync::PoisonError::into_inner) else {
            return;
        };
        let elapsed = (Utc::now() - started_at).to_std().unwrap_or(Duration::ZERO);
        self.callbacks.on_typing_timeout(elapsed);

        if timers.reminder.is_some() {
            return;
        }
        let this = Arc::clone(self);
        let reminder_interval = self.intervals.reminder_interval;
        timers.reminder = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(reminder_interval).await;
                if this.sealed.load(Ordering::SeqCst) || this.run_complete.load(Ordering::SeqCst) {
                    return;
                }
                let Some(started_at) = *this.started_at.lock().unwrap_or_else(std::sync::PoisonError::into_inner) else {
                    return;
                };
                let elapsed = (Utc::now() - started_at).to_std().unwrap_or(Duration::ZERO);
                this.callbacks.on_typing_timeout(elapsed);
            }
        }));
    }

    /// `markRunComplete` (spec §4.8). Seals once `markDispatchIdle` has also
    /// fired.
    pub fn mark_run_complete(self: &Arc<Self>) {
        self.run_complete.store(true, Ordering::SeqCst);
        self.maybe_seal();
    }

    /// `markDispatchIdle` (spec §4.8). Seals once `markRunComplete` has also
    /// fired.
    pub fn mark_dispatch_idle(self: &Arc<Self>) {
        self.dispatch_idle.store(true, Ordering::SeqCst);
        self.maybe_seal();
    }

    fn maybe_seal(self: &Arc<Self>) {
        if !self.run_complete.load(Ordering::SeqCst) || !self.dispatch_idle.load(Ordering::SeqCst) {
            return;
        }
        if self.sealed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.active.store(false, Ordering::SeqCst);
        self.timers.lock().unwrap_or_else(std::sync::PoisonError::into_inner).abort_all();
        debug!("typing controller sealed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingCallbacks {
        starts: AtomicUsize,
        timeouts: AtomicUsize,
    }

    impl TypingCallbacks for Arc<CountingCallbacks> {
        fn on_reply_start(&self) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_typing_timeout(&self, _elapsed: Duration) {
            self.timeouts.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn short_intervals() -> TypingIntervals {
        TypingIntervals {
            typing_interval: Duration::from_millis(10),
            ttl: Duration::from_millis(30),
            reminder_interval: Duration::from_millis(15),
        }
    }

    #[tokio::test]
    async fn ensure_start_fires_once_per_cycle() {
        let counters = Arc::new(CountingCallbacks::default());
        let controller = TypingController::with_intervals(Arc::clone(&counters), short_intervals());

        controller.ensure_start();
        controller.ensure_start();
        controller.ensure_start();

        assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ensure_start_noop_after_run_complete() {
        let counters = Arc::new(CountingCallbacks::default());
        let controller = TypingController::with_intervals(Arc::clone(&counters), short_intervals());
        controller.mark_run_complete();

        controller.ensure_start();
        assert_eq!(counters.starts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn start_typing_on_text_skips_empty_and_silent_token() {
        let counters = Arc::new(CountingCallbacks::default());
        let controller = TypingController::with_intervals(Arc::clone(&counters), short_intervals());

        controller.start_typing_on_text("");
        controller.start_typing_on_text("   ");
        controller.start_typing_on_text(DEFAULT_SILENT_REPLY_TOKEN);
        assert_eq!(counters.starts.load(Ordering::SeqCst), 0);

        controller.start_typing_on_text("hello");
        assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn periodic_timer_refreshes_while_active() {
        let counters = Arc::new(CountingCallbacks::default());
        let controller = TypingController::with_intervals(Arc::clone(&counters), short_intervals());

        controller.start_typing_loop();
        tokio::time::sleep(Duration::from_millis(35)).await;

        assert!(counters.starts.load(Ordering::SeqCst) >= 2);
    }

    // Scenario S6: after seal, a late event must not invoke on_reply_start again.
    #[tokio::test]
    async fn seal_blocks_late_events() {
        let counters = Arc::new(CountingCallbacks::default());
        let controller = TypingController::with_intervals(Arc::clone(&counters), short_intervals());

        controller.start_typing_loop();
        tokio::time::sleep(Duration::from_millis(15)).await;

        controller.mark_run_complete();
        controller.mark_dispatch_idle();
        assert!(controller.is_sealed());

        let before = counters.starts.load(Ordering::SeqCst);
        // Simulate a stale tool-stream event racing in after seal.
        controller.start_typing_on_text("late stray text");
        controller.ensure_start();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(counters.starts.load(Ordering::SeqCst), before);
    }

    #[tokio::test]
    async fn ttl_expiry_triggers_timeout_then_reminders() {
        let counters = Arc::new(CountingCallbacks::default());
        let controller = TypingController::with_intervals(Arc::clone(&counters), short_intervals());

        controller.start_typing_loop();
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(counters.timeouts.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn seal_is_idempotent_and_permanent() {
        let counters = Arc::new(CountingCallbacks::default());
        let controller = TypingController::with_intervals(Arc::clone(&counters), short_intervals());

        controller.mark_run_complete();
        controller.mark_dispatch_idle();
        controller.mark_dispatch_idle();
        controller.mark_run_complete();

        assert!(controller.is_sealed());
    }
}
