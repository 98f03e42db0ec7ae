use std::sync::OnceLock;

use agentlens_types::{PlanSource, SessionEvent, SessionEventKind};
use regex::Regex;

use crate::markdown;
use crate::ExtractedPlan;

fn envelope_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<proposed_plan>(.*?)</proposed_plan>").expect("static regex")
    })
}

/// Embedded-XML plan source: scans assistant text for a `<proposed_plan>`
/// envelope. Stateless — each assistant turn is evaluated independently.
pub fn extract(event: &SessionEvent) -> Option<ExtractedPlan> {
    if event.kind != SessionEventKind::Assistant {
        return None;
    }
    let text = event.message.as_ref().and_then(|m| m.text())?;
    let caps = envelope_re().captures(text)?;
    let body = caps[1].trim();
    let parsed = markdown::parse(body);
    Some(ExtractedPlan {
        source: PlanSource::Opencode,
        title: parsed.title,
        steps: parsed.steps,
        raw_markdown: body.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentlens_types::MessageInfo;
    use chrono::Utc;

    #[test]
    fn extracts_plan_from_envelope() {
        let event = SessionEvent {
            kind: SessionEventKind::Assistant,
            timestamp: Utc::now(),
            message: Some(MessageInfo {
                text: Some(
                    "Here's my plan:\n<proposed_plan>\n# Ship it\n- [ ] Add tests\n</proposed_plan>\nok?".to_string(),
                ),
                ..Default::default()
            }),
            tool: None,
            result: None,
            is_sidechain: false,
            permission_mode: None,
        };
        let plan = extract(&event).expect("plan found");
        assert_eq!(plan.title.as_deref(), Some("Ship it"));
        assert_eq!(plan.steps.len(), 1);
    }

    #[test]
    fn returns_none_without_envelope() {
        let event = SessionEvent {
            kind: SessionEventKind::Assistant,
            timestamp: Utc::now(),
            message: Some(MessageInfo { text: Some("no plan here".to_string()), ..Default::default() }),
            tool: None,
            result: None,
            is_sidechain: false,
            permission_mode: None,
        };
        assert!(extract(&event).is_none());
    }
}
