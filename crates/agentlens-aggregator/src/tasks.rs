use std::collections::HashMap;
use std::sync::OnceLock;

use agentlens_types::{TaskState, TaskStatus, TrackedTask};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;

/// Data stashed from a `TaskCreate` `tool_use`, keyed by its `toolUseId`,
/// until the matching `tool_result` reveals the assigned task id.
#[derive(Debug, Clone)]
struct PendingTaskCreate {
    subject: String,
    description: Option<String>,
    active_form: Option<String>,
    subagent_type: Option<String>,
    is_goal_gate: Option<bool>,
}

#[derive(Debug, Default)]
pub struct TaskTracker {
    state: TaskState,
    pending_creates: HashMap<String, PendingTaskCreate>,
}

fn task_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?:Task #|"taskId"\s*:\s*"?)(\d+)"#).expect("static regex"))
}

impl TaskTracker {
    pub fn on_task_create(&mut self, tool_use_id: &str, input: &Value) {
        let subject = input
            .get("subject")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        self.pending_creates.insert(
            tool_use_id.to_string(),
            PendingTaskCreate {
                subject,
                description: str_field(input, "description"),
                active_form: str_field(input, "activeForm"),
                subagent_type: str_field(input, "subagentType"),
                is_goal_gate: input.get("isGoalGate").and_then(Value::as_bool),
            },
        );
    }

    pub fn on_task_create_result(&mut self, tool_use_id: &str, output: &str, now: DateTime<Utc>) {
        let Some(pending) = self.pending_creates.remove(tool_use_id) else {
            return;
        };
        let Some(task_id) = extract_task_id(output) else {
            return;
        };
        self.state.tasks.insert(
            task_id.clone(),
            TrackedTask {
                task_id,
                subject: pending.subject,
                description: pending.description,
                status: TaskStatus::Pending,
                active_form: pending.active_form,
                created_at: now,
                updated_at: now,
                tool_call_count: 0,
                blocked_by: Vec::new(),
                blocks: Vec::new(),
                subagent_type: pending.subagent_type,
                is_goal_gate: pending.is_goal_gate,
                session_origin: None,
            },
        );
    }

    pub fn on_task_update(&mut self, input: &Value, now: DateTime<Utc>) {
        let Some(task_id) = str_field(input, "taskId") else {
            return;
        };
        let status = str_field(input, "status");

        if status.as_deref() == Some("deleted") {
            self.state.tasks.remove(&task_id);
            if self.state.active_task_id.as_deref() == Some(task_id.as_str()) {
                self.state.active_task_id = None;
            }
            return;
        }

        let entry = self.state.tasks.entry(task_id.clone()).or_insert_with(|| TrackedTask {
            task_id: task_id.clone(),
            subject: str_field(input, "subject").unwrap_or_else(|| format!("Task {task_id}")),
            description: None,
            status: TaskStatus::Pending,
            active_form: None,
            created_at: now,
            updated_at: now,
            tool_call_count: 0,
            blocked_by: Vec::new(),
            blocks: Vec::new(),
            subagent_type: None,
            is_goal_gate: None,
            session_origin: None,
        });

        if let Some(status) = &status {
            entry.status = match status.as_str() {
                "pending" => TaskStatus::Pending,
                "in_progress" => TaskStatus::InProgress,
                "completed" => TaskStatus::Completed,
                _ => entry.status,
            };
        }
        if let Some(subject) = str_field(input, "subject") {
            entry.subject = subject;
        }
        if let Some(description) = str_field(input, "description") {
            entry.description = Some(description);
        }
        if let Some(active_form) = str_field(input, "activeForm") {
            entry.active_form = Some(active_form);
        }
        entry.blocked_by.extend(str_array(input, "addBlockedBy"));
        entry.blocks.extend(str_array(input, "addBlocks"));
        entry.updated_at = now;

        if status.as_deref() == Some("in_progress") {
            self.state.active_task_id = Some(task_id);
        }
    }

    pub fn state(&self) -> &TaskState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = TaskState::default();
        self.pending_creates.clear();
    }

    pub fn restore(&mut self, state: TaskState) {
        self.state = state;
        self.pending_creates.clear();
    }
}

fn str_field(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(Value::as_str).map(String::from)
}

fn str_array(value: &Value, field: &str) -> Vec<String> {
    value
        .get(field)
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_str).map(String::from).collect())
        .unwrap_or_default()
}

fn extract_task_id(output: &str) -> Option<String> {
    task_id_re().captures(output).map(|c| c[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn creates_task_once_result_reveals_the_id() {
        let mut tracker = TaskTracker::default();
        tracker.on_task_create("t1", &json!({"subject": "Write tests"}));
        tracker.on_task_create_result("t1", "Created Task #42", Utc::now());
        let task = tracker.state().tasks.get("42").unwrap();
        assert_eq!(task.subject, "Write tests");
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn parses_taskid_from_json_result_text() {
        let mut tracker = TaskTracker::default();
        tracker.on_task_create("t1", &json!({"subject": "x"}));
        tracker.on_task_create_result("t1", r#"{"taskId":"7"}"#, Utc::now());
        assert!(tracker.state().tasks.contains_key("7"));
    }

    #[test]
    fn update_sets_active_task_on_in_progress() {
        let mut tracker = TaskTracker::default();
        tracker.on_task_update(&json!({"taskId": "1", "status": "in_progress"}), Utc::now());
        assert_eq!(tracker.state().active_task_id.as_deref(), Some("1"));
        assert_eq!(tracker.state().tasks["1"].status, TaskStatus::InProgress);
    }

    #[test]
    fn update_with_deleted_status_removes_task_and_clears_active() {
        let mut tracker = TaskTracker::default();
        tracker.on_task_update(&json!({"taskId": "1", "status": "in_progress"}), Utc::now());
        tracker.on_task_update(&json!({"taskId": "1", "status": "deleted"}), Utc::now());
        assert!(!tracker.state().tasks.contains_key("1"));
        assert!(tracker.state().active_task_id.is_none());
    }

    #[test]
    fn update_on_unknown_task_creates_a_placeholder() {
        let mut tracker = TaskTracker::default();
        tracker.on_task_update(&json!({"taskId": "99", "status": "pending"}), Utc::now());
        assert_eq!(tracker.state().tasks["99"].subject, "Task 99");
    }
}
