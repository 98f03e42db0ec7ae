//! Raw JSON -> canonical [`SessionEvent`] decomposition (spec-level "Event
//! Normalization"). Shared by both JSONL providers; the embedded-database
//! provider builds `SessionEvent`s directly from rows instead (its shape
//! doesn't need content-block fan-out).

use agentlens_types::{
    ContentBlock, MessageInfo, ResultInfo, SessionEvent, SessionEventKind, ToolInfo, Usage,
};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Decompose one already-unwrapped JSONL record into zero or more canonical
/// events. `is_sidechain` / `permission_mode` are the per-line flags the raw
/// record carries; they're stamped onto every event this call produces.
pub fn decompose(
    raw: &Value,
    timestamp: DateTime<Utc>,
    is_sidechain: bool,
    permission_mode: Option<String>,
) -> Vec<SessionEvent> {
    let ty = raw.get("type").and_then(Value::as_str).unwrap_or("");
    let mut out = Vec::new();

    match ty {
        "user" => decompose_user(raw, timestamp, is_sidechain, permission_mode, &mut out),
        "assistant" => {
            decompose_assistant(raw, timestamp, is_sidechain, permission_mode, &mut out)
        }
        "result" => {
            out.push(synthetic_system_event(timestamp, is_sidechain, permission_mode));
        }
        "summary" => {
            out.push(SessionEvent {
                kind: SessionEventKind::Summary,
                timestamp,
                message: extract_message(raw),
                tool: None,
                result: None,
                is_sidechain,
                permission_mode,
            });
        }
        "system" => {
            out.push(SessionEvent {
                kind: SessionEventKind::System,
                timestamp,
                message: extract_message(raw),
                tool: None,
                result: None,
                is_sidechain,
                permission_mode,
            });
        }
        _ => {}
    }

    out
}

fn synthetic_system_event(
    timestamp: DateTime<Utc>,
    is_sidechain: bool,
    permission_mode: Option<String>,
) -> SessionEvent {
    SessionEvent {
        kind: SessionEventKind::System,
        timestamp,
        message: Some(MessageInfo {
            text: Some("Session ended".to_string()),
            ..Default::default()
        }),
        tool: None,
        result: None,
        is_sidechain,
        permission_mode,
    }
}

fn extract_message(raw: &Value) -> Option<MessageInfo> {
    let message = raw.get("message")?;
    let role = message
        .get("role")
        .and_then(Value::as_str)
        .map(String::from);
    let id = message.get("id").and_then(Value::as_str).map(String::from);
    let model = message
        .get("model")
        .and_then(Value::as_str)
        .map(String::from);
    let usage = message.get("usage").and_then(|u| extract_usage(u));
    let content: Vec<ContentBlock> = message
        .get("content")
        .and_then(Value::as_array)
        .map(|blocks| {
            blocks
                .iter()
                .filter_map(|b| serde_json::from_value(b.clone()).ok())
                .collect()
        })
        .unwrap_or_default();
    let text = message
        .get("content")
        .and_then(Value::as_str)
        .map(String::from);
    Some(MessageInfo {
        role,
        id,
        model,
        usage,
        content,
        text,
    })
}

fn extract_usage(u: &Value) -> Option<Usage> {
    Some(Usage {
        input_tokens: u.get("input_tokens").and_then(Value::as_u64).unwrap_or(0),
        output_tokens: u.get("output_tokens").and_then(Value::as_u64).unwrap_or(0),
        cache_creation_input_tokens: u
            .get("cache_creation_input_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0),
        cache_read_input_tokens: u
            .get("cache_read_input_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0),
        reasoning_tokens: u
            .get("reasoning_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0),
        reported_cost: u.get("reported_cost").and_then(Value::as_f64).unwrap_or(0.0),
    })
}

fn decompose_assistant(
    raw: &Value,
    timestamp: DateTime<Utc>,
    is_sidechain: bool,
    permission_mode: Option<String>,
    out: &mut Vec<SessionEvent>,
) {
    let Some(message) = extract_message(raw) else {
        return;
    };
    let model = message.model.clone();
    let usage = message.usage;

    if message.content.is_empty() {
        // No content array: treat the whole thing as a single assistant text event.
        out.push(SessionEvent {
            kind: SessionEventKind::Assistant,
            timestamp,
            message: Some(message),
            tool: None,
            result: None,
            is_sidechain,
            permission_mode,
        });
        return;
    }

    let mut tool_use_indices = Vec::new();
    let mut has_text = false;
    for (i, block) in message.content.iter().enumerate() {
        match block {
            ContentBlock::ToolUse { .. } => tool_use_indices.push(i),
            ContentBlock::Text { text } if !text.is_empty() => has_text = true,
            _ => {}
        }
    }

    for (n, &i) in tool_use_indices.iter().enumerate() {
        let ContentBlock::ToolUse { id, name, input } = &message.content[i] else {
            unreachable!()
        };
        let is_last_tool_use = n == tool_use_indices.len() - 1;
        out.push(SessionEvent {
            kind: SessionEventKind::ToolUse,
            timestamp,
            // Attach usage/cost to the last tool_use event when there's no
            // text block to carry it, so tokens aren't lost.
            message: if is_last_tool_use && !has_text {
                Some(MessageInfo {
                    model: model.clone(),
                    usage,
                    ..Default::default()
                })
            } else {
                None
            },
            tool: Some(ToolInfo {
                name: name.clone(),
                input: input.clone(),
                tool_use_id: Some(id.clone()),
            }),
            result: None,
            is_sidechain,
            permission_mode: permission_mode.clone(),
        });
    }

    if let Some(text) = message.content.iter().find_map(ContentBlock::as_text) {
        if !text.is_empty() {
            out.push(SessionEvent {
                kind: SessionEventKind::Assistant,
                timestamp,
                message: Some(MessageInfo {
                    role: message.role.clone(),
                    id: message.id.clone(),
                    model,
                    usage,
                    content: message.content.clone(),
                    text: Some(text.to_string()),
                }),
                tool: None,
                result: None,
                is_sidechain,
                permission_mode,
            });
        }
    }
}

fn decompose_user(
    raw: &Value,
    timestamp: DateTime<Utc>,
    is_sidechain: bool,
    permission_mode: Option<String>,
    out: &mut Vec<SessionEvent>,
) {
    let Some(message) = extract_message(raw) else {
        return;
    };

    let mut remaining_text: Option<String> = None;
    if message.content.is_empty() {
        remaining_text = message.text.clone();
    }

    for block in &message.content {
        match block {
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => {
                let output = match content {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                out.push(SessionEvent {
                    kind: SessionEventKind::ToolResult,
                    timestamp,
                    message: None,
                    tool: None,
                    result: Some(ResultInfo {
                        tool_use_id: Some(tool_use_id.clone()),
                        output,
                        is_error: *is_error,
                    }),
                    is_sidechain,
                    permission_mode: permission_mode.clone(),
                });
            }
            ContentBlock::Text { text } if !text.is_empty() => {
                remaining_text = Some(text.clone());
            }
            _ => {}
        }
    }

    if let Some(text) = remaining_text.filter(|t| !t.is_empty()) {
        out.push(SessionEvent {
            kind: SessionEventKind::User,
            timestamp,
            message: Some(MessageInfo {
                role: message.role,
                id: message.id,
                text: Some(text),
                ..Default::default()
            }),
            tool: None,
            result: None,
            is_sidechain,
            permission_mode,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn decomposes_assistant_tool_use_and_text() {
        let raw = serde_json::json!({
            "type": "assistant",
            "message": {
                "role": "assistant",
                "model": "test-model",
                "content": [
                    {"type": "tool_use", "id": "t1", "name": "Read", "input": {"path": "a.rs"}},
                    {"type": "text", "text": "done reading"}
                ],
                "usage": {"input_tokens": 10, "output_tokens": 5}
            }
        });
        let events = decompose(&raw, ts(), false, None);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, SessionEventKind::ToolUse);
        assert!(events[0].message.is_none(), "text block carries the usage, not the tool_use");
        assert_eq!(events[1].kind, SessionEventKind::Assistant);
        assert_eq!(events[1].message.as_ref().unwrap().usage.unwrap().input_tokens, 10);
    }

    #[test]
    fn attaches_usage_to_last_tool_use_when_no_text() {
        let raw = serde_json::json!({
            "type": "assistant",
            "message": {
                "content": [
                    {"type": "tool_use", "id": "t1", "name": "Read", "input": {}},
                    {"type": "tool_use", "id": "t2", "name": "Write", "input": {}}
                ],
                "usage": {"input_tokens": 3, "output_tokens": 1}
            }
        });
        let events = decompose(&raw, ts(), false, None);
        assert_eq!(events.len(), 2);
        assert!(events[0].message.is_none());
        assert_eq!(events[1].message.as_ref().unwrap().usage.unwrap().output_tokens, 1);
    }

    #[test]
    fn decomposes_user_tool_result_and_text() {
        let raw = serde_json::json!({
            "type": "user",
            "message": {
                "content": [
                    {"type": "tool_result", "tool_use_id": "t1", "content": "ok", "is_error": false},
                    {"type": "text", "text": "thanks"}
                ]
            }
        });
        let events = decompose(&raw, ts(), false, None);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, SessionEventKind::ToolResult);
        assert_eq!(events[0].result.as_ref().unwrap().tool_use_id.as_deref(), Some("t1"));
        assert_eq!(events[1].kind, SessionEventKind::User);
    }

    #[test]
    fn result_marker_becomes_synthetic_system_event() {
        let raw = serde_json::json!({"type": "result"});
        let events = decompose(&raw, ts(), false, None);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, SessionEventKind::System);
        assert_eq!(events[0].message.as_ref().unwrap().text.as_deref(), Some("Session ended"));
    }
}
