//! Builds the lossy [`FollowEvent`] UIs consume from a canonical
//! `SessionEvent`. Thanks to the content-block fan-out already performed in
//! [`crate::normalize`], this is a 1:1 mapping.

use agentlens_types::{
    collapse_whitespace, truncate, FollowEvent, FollowEventKind, SessionEvent, SessionEventKind,
};

use crate::tool_summary::format_tool_input;

const TEXT_SUMMARY_MAX: usize = 200;
const TOOL_RESULT_SUMMARY_MAX: usize = 120;
const TOOL_INPUT_SUMMARY_MAX: usize = 80;

pub fn to_follow_event(event: &SessionEvent, provider_id: &str) -> FollowEvent {
    let (summary, tool_input_preview) = match event.kind {
        SessionEventKind::ToolUse => {
            let tool = event.tool.as_ref();
            let preview = tool
                .map(|t| clamp(&format_tool_input(&t.name, &t.input), TOOL_INPUT_SUMMARY_MAX))
                .unwrap_or_default();
            (preview.clone(), Some(preview))
        }
        SessionEventKind::ToolResult => {
            let text = event.result.as_ref().map(|r| r.output.as_str()).unwrap_or("");
            (clamp(text, TOOL_RESULT_SUMMARY_MAX), None)
        }
        _ => {
            let text = event.message.as_ref().and_then(|m| m.text()).unwrap_or("");
            (clamp(text, TEXT_SUMMARY_MAX), None)
        }
    };

    let message = event.message.as_ref();
    let tool = event.tool.as_ref();

    FollowEvent {
        provider_id: provider_id.to_string(),
        kind: FollowEventKind::from(event.kind),
        timestamp: event.timestamp,
        summary,
        model: message.and_then(|m| m.model.clone()),
        tokens: message.and_then(|m| m.usage).map(|u| u.input_tokens + u.output_tokens),
        cache_tokens: message
            .and_then(|m| m.usage)
            .map(|u| u.cache_creation_input_tokens + u.cache_read_input_tokens),
        cost: message.and_then(|m| m.usage).map(|u| u.reported_cost),
        tool_name: tool.map(|t| t.name.clone()),
        tool_input_preview,
        rate_limits: None,
        raw_pointer: None,
    }
}

fn clamp(text: &str, max: usize) -> String {
    truncate(&collapse_whitespace(text), max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentlens_types::{MessageInfo, ToolInfo};
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn builds_tool_use_summary_from_registry() {
        let event = SessionEvent {
            kind: SessionEventKind::ToolUse,
            timestamp: Utc::now(),
            message: None,
            tool: Some(ToolInfo {
                name: "Bash".into(),
                input: json!({"command": "cargo test"}),
                tool_use_id: Some("t1".into()),
            }),
            result: None,
            is_sidechain: false,
            permission_mode: None,
        };
        let fe = to_follow_event(&event, "workspace_jsonl");
        assert_eq!(fe.summary, "cargo test");
        assert_eq!(fe.tool_name.as_deref(), Some("Bash"));
    }

    #[test]
    fn truncates_long_text_summaries_with_ellipsis() {
        let long_text = "x".repeat(250);
        let event = SessionEvent {
            kind: SessionEventKind::Assistant,
            timestamp: Utc::now(),
            message: Some(MessageInfo {
                text: Some(long_text),
                ..Default::default()
            }),
            tool: None,
            result: None,
            is_sidechain: false,
            permission_mode: None,
        };
        let fe = to_follow_event(&event, "workspace_jsonl");
        assert_eq!(fe.summary.len(), TEXT_SUMMARY_MAX);
        assert!(fe.summary.ends_with("..."));
    }
}
