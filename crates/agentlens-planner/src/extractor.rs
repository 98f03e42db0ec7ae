use agentlens_aggregator::PlanTracker;
use agentlens_types::{PlanState, SessionEvent};

use crate::claude_plan_mode::{ClaudePlanModeTracker, FileReader};
use crate::markdown::completion_rate;
use crate::{structured_tool, xml_block, ExtractedPlan};

/// Dispatches each event across all three provider-specific plan sources and
/// keeps at most one [`ExtractedPlan`] at a time — the most recently
/// finalized one wins.
pub struct PlanExtractor {
    claude_mode: ClaudePlanModeTracker,
    current: Option<ExtractedPlan>,
    file_reader: Option<Box<dyn FileReader>>,
}

impl Default for PlanExtractor {
    fn default() -> Self {
        Self { claude_mode: ClaudePlanModeTracker::default(), current: None, file_reader: None }
    }
}

impl PlanExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file_reader(mut self, reader: Box<dyn FileReader>) -> Self {
        self.file_reader = Some(reader);
        self
    }
}

impl PlanTracker for PlanExtractor {
    fn on_session_event(&mut self, event: &SessionEvent) {
        if let Some(plan) = self.claude_mode.on_session_event(event, self.file_reader.as_deref()) {
            self.current = Some(plan);
            return;
        }
        if let Some(plan) = xml_block::extract(event) {
            self.current = Some(plan);
            return;
        }
        if let Some(plan) = structured_tool::extract(event) {
            self.current = Some(plan);
        }
    }

    fn snapshot(&self) -> Option<PlanState> {
        self.current.as_ref().map(|plan| PlanState {
            active: true,
            title: plan.title.clone(),
            source: Some(plan.source),
            completion_rate: completion_rate(&plan.steps),
            steps: plan.steps.clone(),
            raw_markdown: Some(plan.raw_markdown.clone()),
        })
    }

    fn reset(&mut self) {
        self.claude_mode.reset();
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentlens_types::{MessageInfo, SessionEventKind};
    use chrono::Utc;

    #[test]
    fn xml_block_plan_is_reflected_in_snapshot() {
        let mut extractor = PlanExtractor::new();
        extractor.on_session_event(&SessionEvent {
            kind: SessionEventKind::Assistant,
            timestamp: Utc::now(),
            message: Some(MessageInfo {
                text: Some("<proposed_plan>\n# Ship\n- [ ] Add tests\n</proposed_plan>".to_string()),
                ..Default::default()
            }),
            tool: None,
            result: None,
            is_sidechain: false,
            permission_mode: None,
        });

        let plan = extractor.snapshot().expect("plan present");
        assert!(plan.active);
        assert_eq!(plan.title.as_deref(), Some("Ship"));
    }

    #[test]
    fn reset_clears_the_current_plan() {
        let mut extractor = PlanExtractor::new();
        extractor.on_session_event(&SessionEvent {
            kind: SessionEventKind::Assistant,
            timestamp: Utc::now(),
            message: Some(MessageInfo {
                text: Some("<proposed_plan>\n- [ ] Add tests\n</proposed_plan>".to_string()),
                ..Default::default()
            }),
            tool: None,
            result: None,
            is_sidechain: false,
            permission_mode: None,
        });
        assert!(extractor.snapshot().is_some());
        extractor.reset();
        assert!(extractor.snapshot().is_none());
    }
}
