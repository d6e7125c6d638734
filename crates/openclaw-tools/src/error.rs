//! Tool execution errors.

/// Errors raised while validating or executing a tool call.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The tool's arguments failed schema validation.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The tool ran but could not complete (I/O failure, launcher error,
    /// gateway call failure surfaced as a hard error rather than a
    /// structured tool result).
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// No tool is registered under the requested name.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

/// Result type returned by a tool's `execute`. The `Ok` payload is the raw
/// text handed back to the LLM (often a JSON-encoded structured result, per
/// spec §6's per-tool response shapes).
pub type ToolResult = Result<String, ToolError>;
