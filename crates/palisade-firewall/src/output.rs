//! Message plumbing for the post-result pipeline: text extraction and
//! the three transforms (truncate, warn, replace-with-error).
//!
//! Invariant: rewritten structured messages preserve `toolCallId` and
//! `toolName` from the original event. Plain-string inputs with no
//! identifiers may be replaced by plain strings.

use serde_json::{Value, json};

/// Where the extractable text lives in the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TextShape {
    /// The whole message is a string.
    PlainString,
    /// `content` is a string.
    ContentString,
    /// `content` is an array of text blocks.
    ContentBlocks,
}

/// Extract the plain text of a message: the string itself, or its
/// `content` field (string or array of `{type: "text"}` blocks, joined
/// with newlines).
pub(crate) fn extract_text(message: &Value) -> Option<(String, TextShape)> {
    match message {
        Value::String(s) => Some((s.clone(), TextShape::PlainString)),
        Value::Object(map) => match map.get("content") {
            Some(Value::String(s)) => Some((s.clone(), TextShape::ContentString)),
            Some(Value::Array(blocks)) => {
                let texts: Vec<&str> = blocks
                    .iter()
                    .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
                    .filter_map(|b| b.get("text").and_then(Value::as_str))
                    .collect();
                if texts.is_empty() {
                    None
                } else {
                    Some((texts.join("\n"), TextShape::ContentBlocks))
                }
            },
            _ => None,
        },
        _ => None,
    }
}

/// Replace the message's text wholesale (used by the truncating size
/// guard). Block arrays collapse to a single text block; other fields of
/// a structured message survive untouched.
pub(crate) fn replace_text(message: &Value, shape: TextShape, text: &str) -> Value {
    match (shape, message) {
        (TextShape::PlainString, _) => Value::String(text.to_string()),
        (TextShape::ContentString, Value::Object(map)) => {
            let mut map = map.clone();
            map.insert("content".to_string(), Value::String(text.to_string()));
            Value::Object(map)
        },
        (TextShape::ContentBlocks, Value::Object(map)) => {
            let mut map = map.clone();
            map.insert(
                "content".to_string(),
                json!([{"type": "text", "text": text}]),
            );
            Value::Object(map)
        },
        _ => Value::String(text.to_string()),
    }
}

/// Append a warning to the message, preserving prior content verbatim.
/// Structured block arrays get a new text block at the end.
pub(crate) fn append_warning(message: &Value, shape: TextShape, warning: &str) -> Value {
    match (shape, message) {
        (TextShape::PlainString, Value::String(s)) => Value::String(format!("{s}\n{warning}")),
        (TextShape::ContentString, Value::Object(map)) => {
            let mut map = map.clone();
            let content = map
                .get("content")
                .and_then(Value::as_str)
                .unwrap_or_default();
            map.insert(
                "content".to_string(),
                Value::String(format!("{content}\n{warning}")),
            );
            Value::Object(map)
        },
        (TextShape::ContentBlocks, Value::Object(map)) => {
            let mut map = map.clone();
            if let Some(Value::Array(blocks)) = map.get_mut("content") {
                blocks.push(json!({"type": "text", "text": warning}));
            }
            Value::Object(map)
        },
        _ => Value::String(warning.to_string()),
    }
}

/// Build the structured error result used by blocking transforms,
/// carrying over the original identifiers when present.
pub(crate) fn error_result(
    tool_call_id: Option<&str>,
    tool_name: Option<&str>,
    text: &str,
) -> Value {
    let mut map = serde_json::Map::new();
    if let Some(id) = tool_call_id {
        map.insert("toolCallId".to_string(), Value::String(id.to_string()));
    }
    if let Some(name) = tool_name {
        map.insert("toolName".to_string(), Value::String(name.to_string()));
    }
    map.insert("isError".to_string(), Value::Bool(true));
    map.insert(
        "content".to_string(),
        json!([{"type": "text", "text": text}]),
    );
    Value::Object(map)
}
