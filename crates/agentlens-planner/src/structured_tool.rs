use agentlens_types::{PlanSource, PlanStep, SessionEvent, SessionEventKind, StepStatus};
use serde_json::Value;

use crate::ExtractedPlan;

/// Structured plan tool (`UpdatePlan`): builds steps directly from
/// `input.approach` or `input.plan`, skipping the markdown parser entirely.
pub fn extract(event: &SessionEvent) -> Option<ExtractedPlan> {
    if event.kind != SessionEventKind::ToolUse {
        return None;
    }
    let tool = event.tool.as_ref()?;
    if tool.name != "UpdatePlan" {
        return None;
    }
    let items = tool.input.get("approach").or_else(|| tool.input.get("plan"))?.as_array()?;

    let steps: Vec<PlanStep> = items
        .iter()
        .enumerate()
        .filter_map(|(id, item)| step_from_item(id, item))
        .collect();
    if steps.is_empty() {
        return None;
    }

    Some(ExtractedPlan {
        source: PlanSource::Codex,
        title: None,
        raw_markdown: serde_json::to_string_pretty(items).unwrap_or_default(),
        steps,
    })
}

fn step_from_item(id: usize, item: &Value) -> Option<PlanStep> {
    match item {
        Value::String(desc) => Some(PlanStep { id, description: desc.clone(), status: StepStatus::Pending, phase: None, complexity: None }),
        Value::Object(_) => {
            let description = item
                .get("step")
                .or_else(|| item.get("description"))
                .and_then(Value::as_str)?
                .to_string();
            let status = item.get("status").and_then(Value::as_str).map(map_status).unwrap_or(StepStatus::Pending);
            Some(PlanStep { id, description, status, phase: None, complexity: None })
        }
        _ => None,
    }
}

fn map_status(status: &str) -> StepStatus {
    match status {
        "completed" => StepStatus::Completed,
        "in_progress" | "in-progress" => StepStatus::InProgress,
        _ => StepStatus::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentlens_types::ToolInfo;
    use chrono::Utc;
    use serde_json::json;

    fn update_plan_event(input: serde_json::Value) -> SessionEvent {
        SessionEvent {
            kind: SessionEventKind::ToolUse,
            timestamp: Utc::now(),
            message: None,
            tool: Some(ToolInfo { name: "UpdatePlan".to_string(), input, tool_use_id: None }),
            result: None,
            is_sidechain: false,
            permission_mode: None,
        }
    }

    #[test]
    fn builds_steps_from_string_array() {
        let event = update_plan_event(json!({"approach": ["add tests", "ship it"]}));
        let plan = extract(&event).expect("plan extracted");
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].status, StepStatus::Pending);
    }

    #[test]
    fn builds_steps_from_object_array_with_status() {
        let event = update_plan_event(json!({
            "plan": [
                {"step": "write the parser", "status": "completed"},
                {"step": "wire it up", "status": "in-progress"},
            ]
        }));
        let plan = extract(&event).expect("plan extracted");
        assert_eq!(plan.steps[0].status, StepStatus::Completed);
        assert_eq!(plan.steps[1].status, StepStatus::InProgress);
    }
}
