//! C5 — session transcript writer and reader (spec §4.5).
//!
//! One append-only JSON-lines file per session. Writes are best-effort: an
//! I/O error is logged and swallowed rather than propagated, because a
//! transcript write must never fail the run it's describing (spec §4.5
//! "failures ... must not interrupt the run they describe").

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use openclaw_cli_runner::{CliToolResultEvent, CliToolUseEvent, Usage};
use openclaw_core::SessionKey;
use openclaw_events::{EventBus, OpenclawEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// A `tool_use` call as recorded in a [`TranscriptRecord::Assistant`]
/// record (spec §4.5 "structured call entries").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// The tool call's id.
    pub id: String,
    /// The tool name.
    pub name: String,
    /// Argument name -> value.
    pub input: HashMap<String, Value>,
}

/// Why the run's assistant turn stopped (spec §4.5 `stopReason`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StopReason {
    /// At least one tool call was made.
    ToolUse,
    /// No tool calls; the turn ended on plain text.
    Stop,
}

/// One line of a session transcript file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TranscriptRecord {
    /// The transcript's header, written once when the file is created.
    Header {
        /// The session this transcript belongs to.
        session_key: SessionKey,
        /// When the session (and so the transcript) started.
        started_at: DateTime<Utc>,
    },
    /// An assistant turn appended to the transcript: every `tool_use` call
    /// made during the run, in order, followed by any text (spec §4.5
    /// record 1).
    Assistant {
        /// When this record was appended.
        at: DateTime<Utc>,
        /// All `tool_use` calls made during the run, in order.
        tool_calls: Vec<ToolCallRecord>,
        /// The message text.
        text: String,
        /// `"toolUse"` if any tool calls exist, else `"stop"`.
        stop_reason: StopReason,
        /// Token usage for the run.
        usage: Usage,
    },
    /// A tool call's result (spec §4.5 record 2, one per
    /// [`CliToolResultEvent`]).
    ToolResult {
        /// When this record was appended. Strictly greater than the
        /// assistant record it answers (spec §4.5 "timestamp monotonically
        /// greater than the assistant record").
        at: DateTime<Utc>,
        /// The id of the tool call this result answers.
        tool_use_id: String,
        /// The flattened result text (spec §4.4 "tool-result flattening").
        content: String,
        /// Whether the tool call was reported as an error.
        is_error: bool,
    },
}

impl TranscriptRecord {
    fn at(&self) -> DateTime<Utc> {
        match self {
            Self::Header { started_at, .. } => *started_at,
            Self::Assistant { at, .. } | Self::ToolResult { at, .. } => *at,
        }
    }
}

/// Appends records to one session's transcript file, enforcing monotonic
/// timestamps per write (spec §4.5 invariant: "timestamps within one
/// transcript file are monotonically non-decreasing").
pub struct TranscriptWriter {
    dir: PathBuf,
    events: EventBus,
    last_at: Mutex<Option<DateTime<Utc>>>,
}

impl TranscriptWriter {
    /// Create a writer that stores transcripts under `dir`, one file per
    /// session named `<sessionKey>.jsonl`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, events: EventBus) -> Self {
        Self {
            dir: dir.into(),
            events,
            last_at: Mutex::new(None),
        }
    }

    fn path_for(&self, session_key: &SessionKey) -> PathBuf {
        self.dir.join(format!("{}.jsonl", sanitize(session_key.as_str())))
    }

    /// Write the header record if the transcript file does not already
    /// exist. No-op if it does (a restart must not duplicate the header).
    pub fn ensure_header(&self, session_key: &SessionKey, started_at: DateTime<Utc>) {
        let path = self.path_for(session_key);
        if path.exists() {
            return;
        }
        self.append(session_key, TranscriptRecord::Header { session_key: session_key.clone(), started_at });
    }

    /// Append a raw assistant record. This is the low-level primitive; the
    /// per-run entry point that implements spec §4.5's gating is
    /// [`append_run`](Self::append_run). Returns the (possibly clamped)
    /// timestamp actually written.
    pub fn append_assistant(
        &self,
        session_key: &SessionKey,
        text: impl Into<String>,
        tool_calls: Vec<ToolCallRecord>,
        stop_reason: StopReason,
        usage: Usage,
        at: DateTime<Utc>,
    ) -> DateTime<Utc> {
        self.append(session_key, TranscriptRecord::Assistant { at, tool_calls, text: text.into(), stop_reason, usage })
    }

    /// Append a raw tool-result record. Returns the (possibly clamped)
    /// timestamp actually written.
    pub fn append_tool_result(
        &self,
        session_key: &SessionKey,
        tool_use_id: impl Into<String>,
        content: impl Into<String>,
        is_error: bool,
        at: DateTime<Utc>,
    ) -> DateTime<Utc> {
        self.append(session_key, TranscriptRecord::ToolResult { at, tool_use_id: tool_use_id.into(), content: content.into(), is_error })
    }

    /// Record one completed run (spec §4.5): "for each run with at least
    /// one tool event", append one assistant record containing every
    /// `tool_use` call (in order) and the run's text, with `stopReason`
    /// derived from whether any tool calls were made, then one tool-result
    /// record per [`CliToolResultEvent`], each timestamped strictly after
    /// the assistant record. A run with no tool events at all writes
    /// nothing — this writer exists to index tool activity, not to
    /// duplicate the conversation log.
    pub fn append_run(
        &self,
        session_key: &SessionKey,
        text: &str,
        tool_uses: &[CliToolUseEvent],
        tool_results: &[CliToolResultEvent],
        usage: Usage,
        at: DateTime<Utc>,
    ) {
        if tool_uses.is_empty() && tool_results.is_empty() {
            return;
        }

        let tool_calls: Vec<ToolCallRecord> =
            tool_uses.iter().map(|tu| ToolCallRecord { id: tu.id.clone(), name: tu.name.clone(), input: tu.input.clone() }).collect();
        let stop_reason = if tool_uses.is_empty() { StopReason::Stop } else { StopReason::ToolUse };

        let assistant_at = self.append_assistant(session_key, text, tool_calls, stop_reason, usage, at);

        for (i, result) in tool_results.iter().enumerate() {
            let offset = i64::try_from(i).unwrap_or(i64::MAX).saturating_add(1);
            let result_at = assistant_at + chrono::Duration::milliseconds(offset);
            self.append_tool_result(session_key, &result.tool_use_id, &result.content, result.is_error, result_at);
        }
    }

    fn append(&self, session_key: &SessionKey, mut record: TranscriptRecord) -> DateTime<Utc> {
        let clamped_at = {
            let mut last = self.last_at.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            let at = record.at().max(last.unwrap_or(record.at()));
            *last = Some(at);
            at
        };
        match &mut record {
            TranscriptRecord::Assistant { at, .. } | TranscriptRecord::ToolResult { at, .. } => *at = clamped_at,
            TranscriptRecord::Header { .. } => {},
        }

        let path = self.path_for(session_key);
        if let Err(e) = write_line(&path, &record) {
            warn!(error = %e, session_key = %session_key, "failed to append transcript record, dropping");
            return clamped_at;
        }

        self.events.publish(OpenclawEvent::SessionTranscriptUpdate { session_key: session_key.clone(), records_appended: 1 });
        clamped_at
    }
}

fn write_line(path: &Path, record: &TranscriptRecord) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut line = serde_json::to_string(record).map_err(std::io::Error::other)?;
    line.push('\n');

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())
}

fn sanitize(session_key: &str) -> String {
    session_key.chars().map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' }).collect()
}

/// Read back every record for `session_key`, in append order. Used by the
/// announce flow to extract a final summary (spec §4.7 `extractSummary`)
/// and by any transcript-inspection tooling.
///
/// # Errors
///
/// Returns an I/O error if the file exists but cannot be read. A missing
/// file is not an error — it yields an empty transcript.
pub fn read_transcript(dir: &Path, session_key: &SessionKey) -> std::io::Result<Vec<TranscriptRecord>> {
    let path = dir.join(format!("{}.jsonl", sanitize(session_key.as_str())));
    let file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut records = Vec::new();
    for line in std::io::BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(record) => records.push(record),
            Err(e) => warn!(error = %e, "skipping malformed transcript line"),
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn writer() -> (tempfile::TempDir, TranscriptWriter) {
        let dir = tempfile::tempdir().unwrap();
        let writer = TranscriptWriter::new(dir.path(), EventBus::new());
        (dir, writer)
    }

    fn tool_use(id: &str, name: &str) -> CliToolUseEvent {
        CliToolUseEvent { id: id.to_owned(), name: name.to_owned(), input: HashMap::new() }
    }

    fn tool_result(id: &str, content: &str, is_error: bool) -> CliToolResultEvent {
        CliToolResultEvent { tool_use_id: id.to_owned(), content: content.to_owned(), is_error }
    }

    #[test]
    fn header_written_once() {
        let (dir, writer) = writer();
        let key = SessionKey::new("s1");
        writer.ensure_header(&key, Utc::now());
        writer.ensure_header(&key, Utc::now());

        let records = read_transcript(dir.path(), &key).unwrap();
        assert_eq!(records.len(), 1);
        assert!(matches!(records[0], TranscriptRecord::Header { .. }));
    }

    #[test]
    fn append_then_read_round_trips() {
        let (dir, writer) = writer();
        let key = SessionKey::new("s1");
        let now = Utc::now();
        writer.ensure_header(&key, now);
        writer.append_assistant(&key, "hello", vec![], StopReason::Stop, Usage::default(), now);
        writer.append_tool_result(&key, "call-1", "ok", false, now);

        let records = read_transcript(dir.path(), &key).unwrap();
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn timestamps_are_monotonic_non_decreasing() {
        let (dir, writer) = writer();
        let key = SessionKey::new("s1");
        let t0 = Utc::now();
        let earlier = t0 - chrono::Duration::seconds(10);

        writer.ensure_header(&key, t0);
        writer.append_assistant(&key, "first", vec![], StopReason::Stop, Usage::default(), t0);
        writer.append_assistant(&key, "out of order", vec![], StopReason::Stop, Usage::default(), earlier);

        let records = read_transcript(dir.path(), &key).unwrap();
        let TranscriptRecord::Assistant { at: second_at, .. } = &records[2] else {
            panic!("expected assistant record");
        };
        assert!(*second_at >= t0);
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let records = read_transcript(dir.path(), &SessionKey::new("nope")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn session_key_with_odd_characters_is_sanitized_to_a_safe_path() {
        let (dir, writer) = writer();
        let key = SessionKey::new("telegram:123/456");
        writer.ensure_header(&key, Utc::now());
        assert!(read_transcript(dir.path(), &key).unwrap().len() == 1);
    }

    // Spec §4.5: a run with no tool events writes nothing.
    #[test]
    fn append_run_writes_nothing_without_tool_events() {
        let (dir, writer) = writer();
        let key = SessionKey::new("s1");
        let now = Utc::now();
        writer.ensure_header(&key, now);
        writer.append_run(&key, "just text, no tools", &[], &[], Usage::default(), now);

        let records = read_transcript(dir.path(), &key).unwrap();
        assert_eq!(records.len(), 1, "only the header should be present");
    }

    // Spec §4.5 record 1: assistant record carries tool calls, stopReason,
    // usage, and text; record 2: one tool-result per event, timestamped
    // strictly after the assistant record.
    #[test]
    fn append_run_writes_assistant_then_tool_results_in_order() {
        let (dir, writer) = writer();
        let key = SessionKey::new("s1");
        let now = Utc::now();
        writer.ensure_header(&key, now);

        let uses = vec![tool_use("t1", "search"), tool_use("t2", "read_file")];
        let results = vec![tool_result("t1", "sunny", false), tool_result("t2", "contents", false)];
        let usage = Usage { input_tokens: 10, output_tokens: 5, ..Usage::default() };
        writer.append_run(&key, "done looking", &uses, &results, usage, now);

        let records = read_transcript(dir.path(), &key).unwrap();
        assert_eq!(records.len(), 4); // header + assistant + 2 tool results

        let TranscriptRecord::Assistant { tool_calls, text, stop_reason, usage: recorded_usage, at: assistant_at, .. } = &records[1]
        else {
            panic!("expected assistant record");
        };
        assert_eq!(tool_calls.len(), 2);
        assert_eq!(tool_calls[0].id, "t1");
        assert_eq!(tool_calls[1].name, "read_file");
        assert_eq!(text, "done looking");
        assert_eq!(*stop_reason, StopReason::ToolUse);
        assert_eq!(recorded_usage.input_tokens, 10);

        let TranscriptRecord::ToolResult { at: first_at, tool_use_id: first_id, content: first_content, .. } = &records[2] else {
            panic!("expected tool result record");
        };
        assert_eq!(first_id, "t1");
        assert_eq!(first_content, "sunny");
        assert!(*first_at > *assistant_at);

        let TranscriptRecord::ToolResult { at: second_at, tool_use_id: second_id, .. } = &records[3] else {
            panic!("expected tool result record");
        };
        assert_eq!(second_id, "t2");
        assert!(*second_at > *first_at);
    }

    // stopReason is "stop" when the run has tool_results but no unresolved
    // tool_uses recorded against this run (e.g. none made this turn, but a
    // prior one's result still needs recording would never happen in
    // practice — this models a defensive case: tool_uses empty, a result
    // present).
    #[test]
    fn append_run_stop_reason_is_stop_without_tool_uses() {
        let (dir, writer) = writer();
        let key = SessionKey::new("s1");
        let now = Utc::now();
        writer.append_run(&key, "text", &[], &[tool_result("t1", "ok", false)], Usage::default(), now);

        let records = read_transcript(dir.path(), &key).unwrap();
        let TranscriptRecord::Assistant { stop_reason, .. } = &records[0] else {
            panic!("expected assistant record");
        };
        assert_eq!(*stop_reason, StopReason::Stop);
    }
}
