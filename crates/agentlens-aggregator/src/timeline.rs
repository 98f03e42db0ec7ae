use std::collections::VecDeque;

use agentlens_types::{truncate, NoiseLevel, SessionEvent, SessionEventKind, TimelineEvent, TimelineEventKind};

const DESCRIPTION_MAX: usize = 200;

#[derive(Debug, Default)]
pub struct Timeline {
    events: VecDeque<TimelineEvent>,
}

fn classify(event: &SessionEvent) -> Option<(TimelineEventKind, NoiseLevel, String)> {
    match event.kind {
        SessionEventKind::User => {
            let text = event.message.as_ref().and_then(|m| m.text()).unwrap_or("");
            Some((TimelineEventKind::UserPrompt, NoiseLevel::User, text.to_string()))
        }
        SessionEventKind::Assistant => {
            let text = event.message.as_ref().and_then(|m| m.text()).unwrap_or("");
            Some((TimelineEventKind::AssistantResponse, NoiseLevel::Ai, text.to_string()))
        }
        SessionEventKind::ToolUse => {
            let name = event.tool.as_ref().map(|t| t.name.as_str()).unwrap_or("tool");
            Some((TimelineEventKind::ToolCall, NoiseLevel::Noise, format!("Called {name}")))
        }
        SessionEventKind::ToolResult => {
            let failed = event.result.as_ref().is_some_and(|r| r.is_error);
            let desc = if failed { "Tool result: error" } else { "Tool result" };
            Some((TimelineEventKind::ToolResult, NoiseLevel::Noise, desc.to_string()))
        }
        SessionEventKind::Summary => {
            let text = event.message.as_ref().and_then(|m| m.text()).unwrap_or("Compaction");
            Some((TimelineEventKind::Compaction, NoiseLevel::System, text.to_string()))
        }
        SessionEventKind::System => {
            let text = event.message.as_ref().and_then(|m| m.text()).unwrap_or("System event");
            Some((TimelineEventKind::SessionStart, NoiseLevel::System, text.to_string()))
        }
        SessionEventKind::Result => None,
    }
}

impl Timeline {
    pub fn record(&mut self, event: &SessionEvent, cap: usize) {
        let Some((kind, noise_level, description)) = classify(event) else {
            return;
        };
        self.events.push_back(TimelineEvent {
            kind,
            timestamp: event.timestamp,
            description: truncate(&description, DESCRIPTION_MAX),
            noise_level,
            metadata: None,
            is_sidechain: Some(event.is_sidechain),
        });
        while self.events.len() > cap {
            self.events.pop_front();
        }
    }

    pub fn snapshot(&self) -> Vec<TimelineEvent> {
        self.events.iter().cloned().collect()
    }

    pub fn reset(&mut self) {
        self.events.clear();
    }

    pub fn restore(&mut self, events: Vec<TimelineEvent>, cap: usize) {
        self.events = events.into();
        while self.events.len() > cap {
            self.events.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentlens_types::MessageInfo;
    use chrono::Utc;

    #[test]
    fn caps_timeline_length() {
        let mut timeline = Timeline::default();
        for i in 0..5 {
            timeline.record(
                &SessionEvent {
                    kind: SessionEventKind::User,
                    timestamp: Utc::now(),
                    message: Some(MessageInfo { text: Some(format!("msg {i}")), ..Default::default() }),
                    tool: None,
                    result: None,
                    is_sidechain: false,
                    permission_mode: None,
                },
                3,
            );
        }
        assert_eq!(timeline.snapshot().len(), 3);
    }
}
