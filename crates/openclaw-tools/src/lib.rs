//! The tool surface exposed to LLM runs (spec §6): `sessions_spawn`,
//! `sessions_subagent_remove`, `sessions_history`, `sessions_send`, and
//! `sessions_list`. Each tool is a direct Rust function call against the
//! subagent orchestration core (no MCP round-trip), following the
//! `BuiltinTool`/`ToolRegistry` shape the teacher uses for its own built-in
//! coding tools.
//!
//! JSON schemas here are restricted to string/number/bool/array/object —
//! no `anyOf`/`oneOf`/`allOf` union schemas (spec §6).

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod context;
mod error;
mod history;
mod launcher;
mod list;
mod registry;
mod remove;
mod send;
mod spawn;

pub use context::ToolContext;
pub use error::{ToolError, ToolResult};
pub use history::SessionsHistoryTool;
pub use launcher::{ChildRunLauncher, LaunchRequest, LaunchedChild};
pub use list::SessionsListTool;
pub use registry::{ToolDefinition, ToolRegistry};
pub use remove::SessionsSubagentRemoveTool;
pub use send::SessionsSendTool;
pub use spawn::SessionsSpawnTool;

use serde_json::Value;

/// A tool callable by an LLM run, invoked as a direct in-process function
/// rather than through MCP.
#[async_trait::async_trait]
pub trait SubagentTool: Send + Sync {
    /// Tool name as exposed to the LLM (e.g. `sessions_spawn`).
    fn name(&self) -> &'static str;

    /// Human-readable description for the LLM's tool list.
    fn description(&self) -> &'static str;

    /// JSON schema for the tool's input parameters.
    fn input_schema(&self) -> Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult;
}
