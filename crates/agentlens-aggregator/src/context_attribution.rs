use agentlens_types::{ContentBlock, ContextAttribution, SessionEvent, SessionEventKind};

/// Accumulates the estimated prompt-token attribution (spec §4.4.6).
/// Token estimate is `ceil(len / 4)` over UTF-8 characters.
#[derive(Debug, Default)]
pub struct ContextAttributionTracker {
    totals: ContextAttribution,
}

fn estimate_tokens(text: &str) -> u64 {
    ((text.chars().count() as f64) / 4.0).ceil() as u64
}

impl ContextAttributionTracker {
    pub fn record(&mut self, event: &SessionEvent) {
        match event.kind {
            SessionEventKind::User => {
                if let Some(text) = event.message.as_ref().and_then(|m| m.text()) {
                    let tokens = estimate_tokens(text);
                    if text.contains("<system-reminder>") || text.contains("CLAUDE.md") {
                        self.totals.system_prompt += tokens;
                    } else {
                        self.totals.user_messages += tokens;
                    }
                }
            }
            SessionEventKind::ToolResult => {
                if let Some(result) = &event.result {
                    self.totals.tool_outputs += estimate_tokens(&result.output);
                }
            }
            SessionEventKind::Assistant => {
                if let Some(message) = &event.message {
                    for block in &message.content {
                        match block {
                            ContentBlock::Thinking { thinking } => {
                                self.totals.thinking += estimate_tokens(thinking);
                            }
                            ContentBlock::Text { text } => {
                                self.totals.assistant_responses += estimate_tokens(text);
                            }
                            _ => {}
                        }
                    }
                    if message.content.is_empty() {
                        if let Some(text) = message.text() {
                            self.totals.assistant_responses += estimate_tokens(text);
                        }
                    }
                }
            }
            SessionEventKind::ToolUse => {
                if let Some(tool) = &event.tool {
                    self.totals.tool_inputs += estimate_tokens(&tool.input.to_string());
                }
            }
            SessionEventKind::Summary => {
                if let Some(text) = event.message.as_ref().and_then(|m| m.text()) {
                    self.totals.other += estimate_tokens(text);
                }
            }
            _ => {}
        }
    }

    pub fn snapshot(&self) -> ContextAttribution {
        self.totals
    }

    pub fn seed(&mut self, attribution: ContextAttribution) {
        self.totals = attribution;
    }

    pub fn reset(&mut self) {
        self.totals = ContextAttribution::default();
    }
}
