//! C4 — backend output parser.
//!
//! Turns raw child-process output into a [`ParsedOutput`], regardless of
//! which of the four `OutputMode`s the backend uses.

use std::collections::HashSet;

use openclaw_config::OutputMode;
use serde_json::Value;
use tracing::warn;

use crate::error::{CliRunnerError, CliRunnerResult};
use crate::types::{
    CliToolResultEvent, CliToolUseEvent, DetectedInteraction, InteractionKind, InteractionOption, ParsedOutput, Usage,
};

/// Parse raw backend output according to `mode`.
///
/// `session_id_fields` names the JSON keys checked, in order, for the
/// backend's own session id (`BackendSpec::session_id_fields`).
///
/// # Errors
///
/// Returns [`CliRunnerError::Parse`] when `mode` expects JSON and none of
/// the output could be parsed as such.
pub fn parse_output(raw: &str, mode: OutputMode, session_id_fields: &[String]) -> CliRunnerResult<ParsedOutput> {
    match mode {
        OutputMode::Text => Ok(ParsedOutput { text: raw.trim().to_owned(), ..ParsedOutput::default() }),
        OutputMode::Json => parse_single_json(raw, session_id_fields),
        OutputMode::Jsonl => parse_jsonl(raw, session_id_fields),
        OutputMode::StreamJsonl => parse_stream_jsonl(raw, session_id_fields),
    }
}

fn parse_single_json(raw: &str, session_id_fields: &[String]) -> CliRunnerResult<ParsedOutput> {
    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|e| CliRunnerError::Parse(format!("invalid json output: {e}")))?;

    let mut output = ParsedOutput { text: extract_text(&value).unwrap_or_default(), ..ParsedOutput::default() };
    output.session_id = extract_session_id(&value, session_id_fields);
    if let Some(usage) = value.get("usage") {
        output.usage.merge(&parse_usage(usage));
    }
    Ok(output)
}

fn parse_jsonl(raw: &str, session_id_fields: &[String]) -> CliRunnerResult<ParsedOutput> {
    let mut output = ParsedOutput::default();
    let mut text_parts = Vec::new();
    let mut parsed_any = false;

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "skipping malformed jsonl line");
                continue;
            },
        };
        parsed_any = true;

        if let Some(text) = extract_text(&value) {
            text_parts.push(text);
        }
        if let Some(usage) = value.get("usage") {
            output.usage.merge(&parse_usage(usage));
        }
        if let Some(session_id) = extract_session_id(&value, session_id_fields) {
            output.session_id = Some(session_id);
        }
    }

    if !parsed_any && !raw.trim().is_empty() {
        return Err(CliRunnerError::Parse("no valid jsonl lines found".to_owned()));
    }

    output.text = text_parts.join("\n");
    Ok(output)
}

fn parse_stream_jsonl(raw: &str, session_id_fields: &[String]) -> CliRunnerResult<ParsedOutput> {
    let mut output = ParsedOutput::default();
    let mut text_parts = Vec::new();
    let mut parsed_any = false;

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "skipping malformed stream-jsonl line");
                continue;
            },
        };
        parsed_any = true;

        match value.get("type").and_then(Value::as_str) {
            Some("assistant") => handle_assistant_line(&value, &mut output, &mut text_parts),
            Some("user") => handle_user_line(&value, &mut output),
            Some("result") => handle_result_line(&value, &mut output, &mut text_parts, session_id_fields),
            _ => {
                if let Some(session_id) = extract_session_id(&value, session_id_fields) {
                    output.session_id = Some(session_id);
                }
            },
        }
    }

    if !parsed_any && !raw.trim().is_empty() {
        return Err(CliRunnerError::Parse("no valid stream-jsonl lines found".to_owned()));
    }

    output.text = text_parts.join("");
    output.pending_interaction = detect_pending_interaction(&output.tool_uses, &output.tool_results);
    Ok(output)
}

fn handle_assistant_line(value: &Value, output: &mut ParsedOutput, text_parts: &mut Vec<String>) {
    let Some(message) = value.get("message") else { return };

    if let Some(usage) = message.get("usage") {
        output.usage.merge(&parse_usage(usage));
    }

    let Some(blocks) = message.get("content").and_then(Value::as_array) else { return };
    for block in blocks {
        match block.get("type").and_then(Value::as_str) {
            Some("text") => {
                if let Some(text) = block.get("text").and_then(Value::as_str) {
                    text_parts.push(text.to_owned());
                }
            },
            Some("tool_use") => {
                let id = block.get("id").and_then(Value::as_str).unwrap_or_default().to_owned();
                let name = block.get("name").and_then(Value::as_str).unwrap_or_default().to_owned();
                let input = block
                    .get("input")
                    .and_then(Value::as_object)
                    .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                    .unwrap_or_default();
                output.tool_uses.push(CliToolUseEvent { id, name, input });
            },
            _ => {},
        }
    }
}

fn handle_user_line(value: &Value, output: &mut ParsedOutput) {
    let Some(blocks) = value.get("message").and_then(|m| m.get("content")).and_then(Value::as_array) else {
        return;
    };
    for block in blocks {
        if block.get("type").and_then(Value::as_str) != Some("tool_result") {
            continue;
        }
        let tool_use_id = block.get("tool_use_id").and_then(Value::as_str).unwrap_or_default().to_owned();
        let is_error = block.get("is_error").and_then(Value::as_bool).unwrap_or(false);
        let content = block.get("content").map_or_else(String::new, flatten_tool_result_content);
        output.tool_results.push(CliToolResultEvent { tool_use_id, content, is_error });
    }
}

fn handle_result_line(value: &Value, output: &mut ParsedOutput, text_parts: &mut Vec<String>, session_id_fields: &[String]) {
    // Spec §4.4: "if the accumulated text is empty, substitute result.result".
    // The assistant text blocks already carry the reply in the normal
    // stream shape, so only fall back to the result event's own text when
    // nothing was collected yet — otherwise the reply is duplicated.
    if text_parts.is_empty() {
        if let Some(text) = value.get("result").and_then(Value::as_str) {
            text_parts.push(text.to_owned());
        }
    }
    if let Some(usage) = value.get("usage") {
        output.usage.merge(&parse_usage(usage));
    }
    if let Some(session_id) = extract_session_id(value, session_id_fields) {
        output.session_id = Some(session_id);
    }
}

/// Flatten a `tool_result` block's `content`, which may be a plain string
/// or an array of `{"type": "text", "text": "..."}` blocks.
fn flatten_tool_result_content(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Array(blocks) => blocks.iter().filter_map(|b| b.get("text").and_then(Value::as_str)).collect::<String>(),
        other => other.to_string(),
    }
}

/// Concatenate text from `message`, `content`, `result`, then root (spec
/// §4.4 json/jsonl). `message` and `content` may themselves be a plain
/// string, a `{"text": "..."}`-shaped object, or (for `message`) an
/// Anthropic-style `{"content": [{"text": "..."}]}` block array.
fn extract_text(value: &Value) -> Option<String> {
    for field in ["message", "content"] {
        if let Some(found) = value.get(field).and_then(extract_text_from_field) {
            return Some(found);
        }
    }
    for field in ["result", "text", "response", "output"] {
        if let Some(text) = value.get(field).and_then(Value::as_str) {
            return Some(text.to_owned());
        }
    }
    None
}

/// Pull text out of a `message`/`content` field value, however it's
/// shaped: a plain string, a single block object, or a block array.
fn extract_text_from_field(field: &Value) -> Option<String> {
    match field {
        Value::String(s) => Some(s.clone()),
        Value::Array(blocks) => {
            let joined: String = blocks.iter().filter_map(|b| b.get("text").and_then(Value::as_str)).collect();
            (!joined.is_empty()).then_some(joined)
        },
        Value::Object(_) => {
            if let Some(text) = field.get("text").and_then(Value::as_str) {
                return Some(text.to_owned());
            }
            field.get("content").and_then(extract_text_from_field)
        },
        _ => None,
    }
}

fn extract_session_id(value: &Value, fields: &[String]) -> Option<String> {
    fields.iter().find_map(|field| value.get(field).and_then(Value::as_str).map(str::to_owned))
}

fn parse_usage(value: &Value) -> Usage {
    let field = |key: &str| value.get(key).and_then(Value::as_u64).unwrap_or(0);
    Usage {
        input_tokens: field("input_tokens"),
        output_tokens: field("output_tokens"),
        cache_read_input_tokens: field("cache_read_input_tokens"),
        cache_write_input_tokens: value
            .get("cache_creation_input_tokens")
            .and_then(Value::as_u64)
            .unwrap_or_else(|| field("cache_write_input_tokens")),
        total_tokens: field("total_tokens"),
    }
}

/// Detect a pending interaction: the highest-indexed `tool_use` with no
/// matching `tool_result`, if it names one of the two interactive tools.
/// Any other unanswered tool call is ordinary in-flight work, not a pause
/// waiting on the user.
fn detect_pending_interaction(tool_uses: &[CliToolUseEvent], tool_results: &[CliToolResultEvent]) -> Option<DetectedInteraction> {
    let answered: HashSet<&str> = tool_results.iter().map(|r| r.tool_use_id.as_str()).collect();
    let last_unanswered = tool_uses.iter().rev().find(|tu| !answered.contains(tu.id.as_str()))?;

    match last_unanswered.name.as_str() {
        "AskUserQuestion" => Some(build_ask_user_question(last_unanswered)),
        "ExitPlanMode" => Some(build_plan_approval(last_unanswered)),
        _ => None,
    }
}

fn build_ask_user_question(tool_use: &CliToolUseEvent) -> DetectedInteraction {
    let first_question = tool_use.input.get("questions").and_then(Value::as_array).and_then(|qs| qs.first());

    let question = first_question
        .and_then(|q| q.get("question"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    let multi_select = first_question.and_then(|q| q.get("multiSelect")).and_then(Value::as_bool).unwrap_or(false);
    let options = first_question
        .and_then(|q| q.get("options"))
        .and_then(Value::as_array)
        .map(|arr| arr.iter().map(parse_option).collect())
        .unwrap_or_default();

    DetectedInteraction {
        kind: InteractionKind::AskUserQuestion,
        tool_call_id: tool_use.id.clone(),
        question,
        options,
        multi_select,
    }
}

fn build_plan_approval(tool_use: &CliToolUseEvent) -> DetectedInteraction {
    DetectedInteraction {
        kind: InteractionKind::PlanApproval,
        tool_call_id: tool_use.id.clone(),
        question: "AI has finished planning, approve execution?".to_owned(),
        options: Vec::new(),
        multi_select: false,
    }
}

fn parse_option(value: &Value) -> InteractionOption {
    match value {
        Value::String(label) => InteractionOption { label: label.clone(), description: None },
        Value::Object(_) => InteractionOption {
            label: value.get("label").and_then(Value::as_str).unwrap_or_default().to_owned(),
            description: value.get("description").and_then(Value::as_str).map(str::to_owned),
        },
        _ => InteractionOption { label: String::new(), description: None },
    }
}
