use std::collections::HashMap;

use agentlens_types::{SubagentLifecycle, SubagentStatus};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Tracks `Task` tool-call lifecycles (spec §4.4.5). `toolUseId` doubles as
/// the subagent id.
#[derive(Debug, Default)]
pub struct SubagentTracker {
    subagents: Vec<SubagentLifecycle>,
    pending_index: HashMap<String, usize>,
}

impl SubagentTracker {
    pub fn on_spawn(&mut self, tool_use_id: &str, input: &Value, spawn_time: DateTime<Utc>) {
        let description = input.get("description").and_then(Value::as_str).unwrap_or("").to_string();
        let subagent_type = input
            .get("subagent_type")
            .and_then(Value::as_str)
            .unwrap_or("general")
            .to_string();
        self.subagents.push(SubagentLifecycle {
            id: tool_use_id.to_string(),
            description,
            subagent_type,
            spawn_time,
            status: SubagentStatus::Running,
            completion_time: None,
            duration_ms: None,
        });
        self.pending_index.insert(tool_use_id.to_string(), self.subagents.len() - 1);
    }

    pub fn on_result(&mut self, tool_use_id: &str, completion_time: DateTime<Utc>) {
        let Some(&idx) = self.pending_index.get(tool_use_id) else {
            return;
        };
        let sub = &mut self.subagents[idx];
        sub.status = SubagentStatus::Completed;
        sub.completion_time = Some(completion_time);
        sub.duration_ms = Some((completion_time - sub.spawn_time).num_milliseconds());
        self.pending_index.remove(tool_use_id);
    }

    pub fn snapshot(&self) -> Vec<SubagentLifecycle> {
        self.subagents.clone()
    }

    pub fn reset(&mut self) {
        self.subagents.clear();
        self.pending_index.clear();
    }

    pub fn restore(&mut self, subagents: Vec<SubagentLifecycle>) {
        self.pending_index = subagents
            .iter()
            .enumerate()
            .filter(|(_, s)| s.status == SubagentStatus::Running)
            .map(|(i, s)| (s.id.clone(), i))
            .collect();
        self.subagents = subagents;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn completes_a_spawned_subagent() {
        let mut tracker = SubagentTracker::default();
        let t0 = Utc::now();
        tracker.on_spawn("t1", &json!({"description": "fix bug", "subagent_type": "bugfix"}), t0);
        let t1 = t0 + chrono::Duration::seconds(5);
        tracker.on_result("t1", t1);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].status, agentlens_types::SubagentStatus::Completed);
        assert_eq!(snapshot[0].duration_ms, Some(5000));
    }
}
