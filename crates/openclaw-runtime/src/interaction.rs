//! C6 — interaction manager.
//!
//! A process-wide `sessionKey -> PendingInteraction` map with TTL
//! expiration, plus the answer-parsing rules used to turn a user's free
//! text into one of the interaction's option labels.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use openclaw_core::SessionKey;
use tracing::debug;

use crate::types::{PendingInteraction, PendingInteractionOption};

/// Default time-to-live for a pending interaction before it silently
/// expires (spec §4.6 "Default TTL 5 minutes").
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Interval at which [`InteractionManager::cleanup_expired`] should be
/// driven by a background loop (spec §4.6 "Cleanup timer interval is 60s").
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Tracks at most one pending interaction per session.
pub struct InteractionManager {
    ttl: chrono::Duration,
    entries: Mutex<HashMap<SessionKey, PendingInteraction>>,
}

impl Default for InteractionManager {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl InteractionManager {
    /// Create a manager with the given TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::seconds(300)),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Record a new pending interaction, replacing any existing one for
    /// the same session (spec §3 invariant: at most one per `sessionKey`).
    pub fn set(&self, mut interaction: PendingInteraction) {
        interaction.expires_at = interaction.created_at + self.ttl;
        let key = interaction.session_key.clone();
        self.entries.lock().expect("interaction map poisoned").insert(key, interaction);
    }

    /// Fetch the pending interaction for `session_key`, if any and not
    /// expired. An expired entry is removed as a side effect of the read.
    #[must_use]
    pub fn get(&self, session_key: &SessionKey) -> Option<PendingInteraction> {
        let mut entries = self.entries.lock().expect("interaction map poisoned");
        match entries.get(session_key) {
            Some(entry) if entry.expires_at > Utc::now() => Some(entry.clone()),
            Some(_) => {
                entries.remove(session_key);
                None
            },
            None => None,
        }
    }

    /// Remove any pending interaction for `session_key`, regardless of
    /// expiration.
    pub fn clear(&self, session_key: &SessionKey) {
        self.entries.lock().expect("interaction map poisoned").remove(session_key);
    }

    /// Remove every expired entry. Returns the number removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.lock().expect("interaction map poisoned");
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        let removed = before.saturating_sub(entries.len());
        if removed > 0 {
            debug!(removed, "cleaned up expired pending interactions");
        }
        removed
    }
}

/// Parse a user's free-text reply to a pending interaction into the
/// corresponding option label(s), or return it as a free-form answer
/// (spec §4.6 "Answer parsing").
#[must_use]
pub fn parse_user_answer(input: &str, options: &[PendingInteractionOption], multi_select: bool) -> String {
    let trimmed = input.trim();

    if options.is_empty() {
        return trimmed.to_owned();
    }

    if multi_select && trimmed.contains(',') {
        let mut labels = Vec::new();
        for token in trimmed.split(',') {
            if let Some(label) = resolve_index(token.trim(), options) {
                if !labels.contains(&label) {
                    labels.push(label);
                }
            }
        }
        if !labels.is_empty() {
            return labels.join(", ");
        }
    }

    if let Some(label) = resolve_index(trimmed, options) {
        return label;
    }

    if let Some(label) = options.iter().find(|o| o.label.eq_ignore_ascii_case(trimmed)) {
        return label.label.clone();
    }

    trimmed.to_owned()
}

fn resolve_index(token: &str, options: &[PendingInteractionOption]) -> Option<String> {
    let index: usize = token.parse().ok()?;
    let index = index.checked_sub(1)?;
    options.get(index).map(|o| o.label.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Vec<PendingInteractionOption> {
        vec![
            PendingInteractionOption { label: "A".to_owned(), description: None },
            PendingInteractionOption { label: "B".to_owned(), description: None },
            PendingInteractionOption { label: "C".to_owned(), description: None },
        ]
    }

    #[test]
    fn no_options_returns_trimmed_input() {
        assert_eq!(parse_user_answer("  hi there  ", &[], false), "hi there");
    }

    #[test]
    fn single_index_resolves_to_label() {
        assert_eq!(parse_user_answer("2", &options(), false), "B");
    }

    #[test]
    fn case_insensitive_label_match() {
        assert_eq!(parse_user_answer("b", &options(), false), "B");
    }

    #[test]
    fn unmatched_input_is_free_form() {
        assert_eq!(parse_user_answer("something else", &options(), false), "something else");
    }

    // Scenario S7: multi-select comma list resolves in input order, deduped.
    #[test]
    fn multi_select_comma_list_resolves_in_order() {
        assert_eq!(parse_user_answer("1,3,2", &options(), true), "A, C, B");
        assert_eq!(parse_user_answer("hello", &options(), true), "hello");
    }

    #[test]
    fn multi_select_dedupes_repeated_indices() {
        assert_eq!(parse_user_answer("1,1,2", &options(), true), "A, B");
    }

    // Invariant 9: answer-parsing is idempotent once it has resolved to a label.
    #[test]
    fn answer_parsing_is_idempotent_on_labels() {
        let once = parse_user_answer("1,3,2", &options(), true);
        let twice = parse_user_answer(&once, &options(), true);
        assert_eq!(once, twice);
    }

    #[test]
    fn set_then_get_round_trips_within_ttl() {
        let manager = InteractionManager::new(Duration::from_secs(60));
        let key = SessionKey::new("s1");
        manager.set(sample_interaction(key.clone()));
        assert!(manager.get(&key).is_some());
    }

    #[test]
    fn get_after_expiry_returns_none_and_evicts() {
        let manager = InteractionManager::new(Duration::from_secs(0));
        let key = SessionKey::new("s1");
        manager.set(sample_interaction(key.clone()));
        std::thread::sleep(Duration::from_millis(5));
        assert!(manager.get(&key).is_none());
        assert_eq!(manager.cleanup_expired(), 0);
    }

    #[test]
    fn set_replaces_previous_entry_for_same_session() {
        let manager = InteractionManager::new(Duration::from_secs(60));
        let key = SessionKey::new("s1");
        let mut first = sample_interaction(key.clone());
        first.question = "first".to_owned();
        manager.set(first);
        let mut second = sample_interaction(key.clone());
        second.question = "second".to_owned();
        manager.set(second);

        assert_eq!(manager.get(&key).unwrap().question, "second");
    }

    fn sample_interaction(session_key: SessionKey) -> PendingInteraction {
        PendingInteraction {
            id: "int-1".to_owned(),
            cli_session_id: None,
            session_key,
            tool_call_id: "t1".to_owned(),
            kind: crate::types::PendingInteractionKind::AskUserQuestion,
            question: "Proceed?".to_owned(),
            options: options(),
            multi_select: false,
            created_at: Utc::now(),
            expires_at: Utc::now(),
            agent_id: None,
            provider: "claude".to_owned(),
        }
    }
}
