//! CLI backend invocation: resolving a backend, queueing and executing its
//! process, and parsing whatever it prints back out.
//!
//! This crate owns C1 (re-exported from `openclaw-config`, which is where
//! `BackendSpec` itself lives), C2 (the per-backend run queue), C3 (the
//! process executor, sandboxing, and stale-process cleanup), and C4 (the
//! output parser).

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod executor;
mod parser;
mod queue;
mod sandbox;
mod stale;
mod types;

pub use error::{CliRunnerError, CliRunnerResult};
pub use executor::{build_env, classify_failover, execute, maybe_wrap_for_sandbox};
pub use openclaw_config::resolve_backend;
pub use parser::parse_output;
pub use queue::RunQueue;
pub use sandbox::{quote_argv, shell_quote, wrap_for_sandbox};
pub use stale::{
    DEFAULT_STOPPED_THRESHOLD, PsEntry, cleanup_resume_conflicts, cleanup_stopped, list_processes, resume_conflict_pattern,
};
pub use types::{
    CliToolResultEvent, CliToolUseEvent, DetectedInteraction, ExecResult, FailoverReason, InteractionKind, InteractionOption,
    ParsedOutput, RunRequest, SandboxContext, ToolResultInput, Usage,
};
