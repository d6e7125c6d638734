//! C3 — process executor.

use std::collections::HashMap;
use std::process::Stdio;

use openclaw_config::BackendSpec;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::{Duration, timeout};
use tracing::{debug, warn};

use crate::error::{CliRunnerError, CliRunnerResult};
use crate::sandbox::wrap_for_sandbox;
use crate::types::{ExecResult, FailoverReason, SandboxContext};

/// Default `PATH` applied to every child process, ensuring a minimally
/// functional environment even when `clear_env` drops the caller's own
/// `PATH` (spec §4.3 "Environment is the union of a default `PATH`, caller
/// env, container env, and backend overrides").
const DEFAULT_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// Build the environment map for one invocation.
///
/// - `clear_env=false`: start from the caller's own process environment.
/// - `clear_env=true`: start empty.
/// - Either way, a default `PATH` is applied first (so it can be
///   overridden), then the backend's `env`, then (when sandboxed) the
///   sandbox's own overrides, which win last.
#[must_use]
pub fn build_env(backend: &BackendSpec, sandbox: Option<&SandboxContext>) -> HashMap<String, String> {
    let mut env = HashMap::new();
    env.insert("PATH".to_owned(), DEFAULT_PATH.to_owned());

    if !backend.clear_env {
        for (key, value) in std::env::vars() {
            env.insert(key, value);
        }
    }

    for (key, value) in &backend.env {
        env.insert(key.clone(), value.clone());
    }

    if let Some(sandbox) = sandbox {
        for (key, value) in &sandbox.env {
            env.insert(key.clone(), value.clone());
        }
    }

    env
}

/// Run one child process invocation to completion or timeout.
///
/// If `sandbox` is `Some` and sandboxing applies, `argv` is wrapped via
/// [`wrap_for_sandbox`] before being spawned; `argv[0]` is always the
/// program to exec, with the rest as its arguments.
///
/// # Errors
///
/// Returns [`CliRunnerError::Spawn`] if the child process cannot be
/// started at all. A timeout or non-zero exit is *not* an error here — the
/// caller classifies those from the returned [`ExecResult`] via
/// [`classify_failover`].
pub async fn execute(
    argv: &[String],
    cwd: &std::path::Path,
    env: &HashMap<String, String>,
    stdin_payload: Option<&str>,
    timeout_ms: u64,
) -> CliRunnerResult<ExecResult> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| CliRunnerError::Spawn {
            command: String::new(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty argv"),
        })?;

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(cwd)
        .env_clear()
        .envs(env)
        .stdin(if stdin_payload.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(program = %program, args = ?args, "spawning backend process");

    let mut child = command.spawn().map_err(|e| CliRunnerError::Spawn {
        command: program.clone(),
        source: e,
    })?;

    if let Some(payload) = stdin_payload {
        if let Some(mut stdin) = child.stdin.take() {
            let payload = payload.to_owned();
            // Write on a best-effort basis; a child that exits before
            // reading all of stdin (e.g. crashes immediately) shouldn't
            // fail the whole invocation — its exit code/stderr already
            // carries the real failure.
            let _ = stdin.write_all(payload.as_bytes()).await;
            let _ = stdin.shutdown().await;
        }
    }

    let run = async {
        let output = child.wait_with_output().await;
        output
    };

    match timeout(Duration::from_millis(timeout_ms), run).await {
        Ok(Ok(output)) => Ok(ExecResult {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
            signal: unix_signal(&output.status),
            killed: false,
        }),
        Ok(Err(e)) => Err(CliRunnerError::Spawn {
            command: program.clone(),
            source: e,
        }),
        Err(_) => {
            warn!(program = %program, timeout_ms, "backend process timed out, killing");
            Ok(ExecResult {
                stdout: String::new(),
                stderr: "process executor timeout".to_owned(),
                exit_code: None,
                signal: None,
                killed: true,
            })
        },
    }
}

#[cfg(unix)]
fn unix_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn unix_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}

/// Classify a failed run's error text into a [`FailoverReason`] (spec §4.3
/// "`FailoverReason` derivation is a pure function of the error message",
/// §11 classification table).
#[must_use]
pub fn classify_failover(error_text: &str) -> FailoverReason {
    let lower = error_text.to_ascii_lowercase();

    if lower.contains("rate limit") || lower.contains("rate_limit") || lower.contains("429") {
        FailoverReason::RateLimit
    } else if lower.contains("unauthorized")
        || lower.contains("invalid api key")
        || lower.contains("authentication")
        || lower.contains("401")
    {
        FailoverReason::Auth
    } else if lower.contains("quota") || lower.contains("billing") || lower.contains("insufficient credit") {
        FailoverReason::Quota
    } else if lower.contains("model not found") || lower.contains("model_unavailable") || lower.contains("unsupported model") {
        FailoverReason::ModelUnavailable
    } else if lower.contains("econnrefused")
        || lower.contains("connection reset")
        || lower.contains("dns")
        || lower.contains("network")
        || lower.contains("timed out connecting")
    {
        FailoverReason::Network
    } else {
        FailoverReason::Unknown
    }
}

/// Wrap `argv` for sandboxed execution when the run requests it and the
/// backend allows it (spec §4.3 "When the run's `sandboxContext.enabled`
/// is true and `BackendSpec.sandboxMode ∈ {inherit,always}`").
#[must_use]
pub fn maybe_wrap_for_sandbox(
    argv: Vec<String>,
    backend: &BackendSpec,
    sandbox: Option<&SandboxContext>,
) -> Vec<String> {
    use openclaw_config::SandboxMode;

    let should_sandbox = match backend.sandbox_mode {
        SandboxMode::Off => false,
        SandboxMode::Always => true,
        SandboxMode::Inherit => sandbox.is_some_and(|s| s.enabled),
    };

    match (should_sandbox, sandbox) {
        (true, Some(sandbox)) => wrap_for_sandbox(&argv, sandbox),
        _ => argv,
    }
}
