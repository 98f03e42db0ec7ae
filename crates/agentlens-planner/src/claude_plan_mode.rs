use agentlens_types::{PlanSource, SessionEvent, SessionEventKind};

use crate::markdown;
use crate::ExtractedPlan;

const PLAN_DIR_MARKER: &str = ".claude/plans/";

/// Tool-driven "plan mode": buffers assistant text between `EnterPlanMode`
/// and `ExitPlanMode`, preferring a captured `Write` to the plan directory
/// if one occurred in between.
#[derive(Debug, Default)]
pub struct ClaudePlanModeTracker {
    active: bool,
    text_buffer: String,
    captured_write: Option<String>,
    captured_path: Option<String>,
}

pub trait FileReader {
    fn read(&self, path: &str) -> Option<String>;
}

impl ClaudePlanModeTracker {
    pub fn on_session_event(&mut self, event: &SessionEvent, file_reader: Option<&dyn FileReader>) -> Option<ExtractedPlan> {
        match event.kind {
            SessionEventKind::ToolUse => {
                let tool = event.tool.as_ref()?;
                match tool.name.as_str() {
                    "EnterPlanMode" => {
                        self.active = true;
                        self.text_buffer.clear();
                        self.captured_write = None;
                        self.captured_path = None;
                        None
                    }
                    "Write" if self.active => {
                        let path = tool.input.get("file_path").and_then(|v| v.as_str()).unwrap_or("");
                        if path.contains(PLAN_DIR_MARKER) {
                            self.captured_path = Some(path.to_string());
                            self.captured_write =
                                tool.input.get("content").and_then(|v| v.as_str()).map(String::from);
                        }
                        None
                    }
                    "ExitPlanMode" if self.active => {
                        self.active = false;
                        let content = self
                            .captured_write
                            .take()
                            .or_else(|| Some(std::mem::take(&mut self.text_buffer)).filter(|s| !s.is_empty()))
                            .or_else(|| {
                                self.captured_path
                                    .as_deref()
                                    .and_then(|p| file_reader.and_then(|r| r.read(p)))
                            })?;
                        let parsed = markdown::parse(&content);
                        self.text_buffer.clear();
                        self.captured_path = None;
                        Some(ExtractedPlan {
                            source: PlanSource::ClaudeCode,
                            title: parsed.title,
                            steps: parsed.steps,
                            raw_markdown: content,
                        })
                    }
                    _ => None,
                }
            }
            SessionEventKind::Assistant if self.active => {
                if let Some(text) = event.message.as_ref().and_then(|m| m.text()) {
                    if !self.text_buffer.is_empty() {
                        self.text_buffer.push('\n');
                    }
                    self.text_buffer.push_str(text);
                }
                None
            }
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentlens_types::{MessageInfo, ToolInfo};
    use chrono::Utc;
    use serde_json::json;

    fn tool_event(name: &str, input: serde_json::Value) -> SessionEvent {
        SessionEvent {
            kind: SessionEventKind::ToolUse,
            timestamp: Utc::now(),
            message: None,
            tool: Some(ToolInfo { name: name.to_string(), input, tool_use_id: None }),
            result: None,
            is_sidechain: false,
            permission_mode: None,
        }
    }

    #[test]
    fn finalizes_from_buffered_assistant_text_when_no_write_captured() {
        let mut tracker = ClaudePlanModeTracker::default();
        tracker.on_session_event(&tool_event("EnterPlanMode", json!({})), None);
        tracker.on_session_event(
            &SessionEvent {
                kind: SessionEventKind::Assistant,
                timestamp: Utc::now(),
                message: Some(MessageInfo {
                    text: Some("- [ ] Add the retry wrapper\n".to_string()),
                    ..Default::default()
                }),
                tool: None,
                result: None,
                is_sidechain: false,
                permission_mode: None,
            },
            None,
        );
        let plan = tracker.on_session_event(&tool_event("ExitPlanMode", json!({})), None).expect("plan extracted");
        assert_eq!(plan.steps.len(), 1);
    }

    #[test]
    fn prefers_captured_write_over_buffered_text() {
        let mut tracker = ClaudePlanModeTracker::default();
        tracker.on_session_event(&tool_event("EnterPlanMode", json!({})), None);
        tracker.on_session_event(
            &tool_event(
                "Write",
                json!({"file_path": ".claude/plans/2026-plan.md", "content": "- [ ] From the write call\n"}),
            ),
            None,
        );
        let plan = tracker.on_session_event(&tool_event("ExitPlanMode", json!({})), None).expect("plan extracted");
        assert_eq!(plan.steps[0].description, "From the write call");
    }
}
