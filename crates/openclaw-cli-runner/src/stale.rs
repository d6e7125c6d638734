//! Stale-process cleanup (spec §4.3).
//!
//! Before each run: enumerate processes via `ps -ax`, find entries that
//! look like abandoned backend invocations (stopped, or conflicting with a
//! resume we're about to issue), and kill them. A no-op on Windows, where
//! there is no `ps`.

use regex::Regex;
use tokio::process::Command;
use tracing::{info, warn};

/// Default threshold: only act once more than this many stopped processes
/// match a given session-id pattern (spec §4.3 step 1).
pub const DEFAULT_STOPPED_THRESHOLD: usize = 10;

/// One row from `ps -ax -o pid=,state=,command=`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PsEntry {
    /// Process id.
    pub pid: u32,
    /// Raw state column (e.g. `"T"`, `"S+"`, `"Ss"`).
    pub state: String,
    /// Full command line.
    pub command: String,
}

impl PsEntry {
    /// Whether the state column carries the POSIX "stopped" marker (`T`).
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.state.contains('T')
    }
}

/// Parse `ps -ax -o pid=,state=,command=` output into rows.
///
/// Each line is `<pid> <state> <command...>`, whitespace-separated with the
/// command taking the remainder of the line.
#[must_use]
pub fn parse_ps_output(output: &str) -> Vec<PsEntry> {
    output
        .lines()
        .filter_map(|line| {
            let trimmed = line.trim_start();
            let mut parts = trimmed.splitn(3, char::is_whitespace);
            let pid: u32 = parts.next()?.parse().ok()?;
            let state = parts.next()?.to_owned();
            let command = parts.next().unwrap_or_default().trim_start().to_owned();
            Some(PsEntry { pid, state, command })
        })
        .collect()
}

/// Among `entries`, find stopped processes whose command line matches
/// `pattern` — candidates for the threshold-gated cleanup in step 1.
#[must_use]
pub fn find_stopped_matching<'a>(entries: &'a [PsEntry], pattern: &Regex) -> Vec<&'a PsEntry> {
    entries
        .iter()
        .filter(|e| e.is_stopped() && pattern.is_match(&e.command))
        .collect()
}

/// Among `entries`, find any process (regardless of state) whose command
/// line matches `pattern` — used for step 2's resume-conflict kill, which
/// applies unconditionally rather than behind a threshold.
#[must_use]
pub fn find_matching<'a>(entries: &'a [PsEntry], pattern: &Regex) -> Vec<&'a PsEntry> {
    entries.iter().filter(|e| pattern.is_match(&e.command)).collect()
}

/// Run `ps -ax` and parse its output. Returns an empty list on Windows or
/// if the `ps` invocation itself fails (stale-process cleanup is
/// best-effort housekeeping, never fatal to a run).
pub async fn list_processes() -> Vec<PsEntry> {
    if cfg!(windows) {
        return Vec::new();
    }

    match Command::new("ps").args(["-ax", "-o", "pid=,state=,command="]).output().await {
        Ok(output) => parse_ps_output(&String::from_utf8_lossy(&output.stdout)),
        Err(e) => {
            warn!(error = %e, "failed to list processes for stale-process cleanup");
            Vec::new()
        },
    }
}

/// Send `SIGKILL` to a pid. Best-effort: a process that already exited is
/// not an error.
pub async fn kill(pid: u32) {
    if cfg!(windows) {
        return;
    }
    if let Err(e) = Command::new("kill").args(["-9", &pid.to_string()]).status().await {
        warn!(pid, error = %e, "failed to kill stale process");
    }
}

/// Step 1: kill stopped processes matching `session_id_pattern`, but only
/// if more than `threshold` of them are currently stopped.
pub async fn cleanup_stopped(session_id_pattern: &Regex, threshold: usize) -> usize {
    let entries = list_processes().await;
    let stopped = find_stopped_matching(&entries, session_id_pattern);
    if stopped.len() <= threshold {
        return 0;
    }

    let pids: Vec<u32> = stopped.iter().map(|e| e.pid).collect();
    for pid in &pids {
        kill(*pid).await;
    }
    info!(count = pids.len(), "killed stopped stale processes");
    pids.len()
}

/// Step 2: kill any process whose command line matches the resume
/// invocation we're about to issue, unconditionally (prevents two
/// processes fighting over the same CLI session file).
pub async fn cleanup_resume_conflicts(resume_command_pattern: &Regex) -> usize {
    let entries = list_processes().await;
    let matches = find_matching(&entries, resume_command_pattern);
    let pids: Vec<u32> = matches.iter().map(|e| e.pid).collect();
    for pid in &pids {
        kill(*pid).await;
    }
    if !pids.is_empty() {
        info!(count = pids.len(), "killed resume-conflicting stale processes");
    }
    pids.len()
}

/// Build the regex matching a resume invocation's command line (spec §4.3
/// step 2: `command.*<resumeArgs with sessionId substituted>`).
#[must_use]
pub fn resume_conflict_pattern(command: &str, resume_args: &[String], session_id: &str) -> Regex {
    let substituted: Vec<String> = resume_args
        .iter()
        .map(|arg| arg.replace("{sessionId}", session_id))
        .collect();
    let joined = substituted.join(".*");
    let escaped_command = regex::escape(command);
    let pattern = format!("{escaped_command}.*{joined}");
    Regex::new(&pattern).unwrap_or_else(|_| Regex::new(&regex::escape(command)).expect("literal regex is always valid"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ps_output_rows() {
        let output = "  1234 T    claude --session abc123\n  5678 Ss+  bash\n";
        let entries = parse_ps_output(output);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].pid, 1234);
        assert_eq!(entries[0].state, "T");
        assert_eq!(entries[0].command, "claude --session abc123");
        assert!(entries[0].is_stopped());
        assert!(!entries[1].is_stopped());
    }

    #[test]
    fn find_stopped_matching_filters_by_state_and_pattern() {
        let entries = vec![
            PsEntry { pid: 1, state: "T".to_owned(), command: "claude --session abc".to_owned() },
            PsEntry { pid: 2, state: "T".to_owned(), command: "other-tool --session abc".to_owned() },
            PsEntry { pid: 3, state: "S".to_owned(), command: "claude --session abc".to_owned() },
        ];
        let pattern = Regex::new("claude.*abc").unwrap();
        let matched = find_stopped_matching(&entries, &pattern);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].pid, 1);
    }

    #[test]
    fn resume_conflict_pattern_substitutes_session_id() {
        let pattern = resume_conflict_pattern(
            "claude",
            &["--resume".to_owned(), "{sessionId}".to_owned()],
            "sess-42",
        );
        assert!(pattern.is_match("/usr/local/bin/claude --resume sess-42"));
        assert!(!pattern.is_match("/usr/local/bin/claude --resume sess-99"));
    }
}
