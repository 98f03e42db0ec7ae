use std::collections::HashMap;

use agentlens_types::{PendingToolCall, ToolAnalytics};
use chrono::{DateTime, Utc};

/// Per-tool call counters plus the in-flight `tool_use -> tool_result`
/// correlation map (spec §4.4.3).
#[derive(Debug, Default)]
pub struct ToolTracker {
    analytics: HashMap<String, ToolAnalytics>,
    pending: HashMap<String, PendingToolCall>,
}

impl ToolTracker {
    pub fn on_tool_use(&mut self, tool_use_id: &str, name: &str, start_time: DateTime<Utc>) {
        self.analytics.entry(name.to_string()).or_default().pending_count += 1;
        self.pending.insert(
            tool_use_id.to_string(),
            PendingToolCall { tool_use_id: tool_use_id.to_string(), name: name.to_string(), start_time },
        );
    }

    /// Returns the resolved tool name for the matching pending call, if any
    /// (used by truncation detection to attribute the marker to a tool).
    pub fn on_tool_result(&mut self, tool_use_id: &str, is_error: bool, end_time: DateTime<Utc>) -> Option<String> {
        let pending = self.pending.remove(tool_use_id)?;
        let entry = self.analytics.entry(pending.name.clone()).or_default();
        entry.pending_count = entry.pending_count.saturating_sub(1);
        entry.completed_count += 1;
        if is_error {
            entry.failure_count += 1;
        } else {
            entry.success_count += 1;
        }
        let elapsed = (end_time - pending.start_time).num_milliseconds();
        if elapsed >= 0 {
            entry.total_duration_ms += elapsed;
        }
        Some(pending.name)
    }

    pub fn pending_tool_name(&self, tool_use_id: &str) -> Option<&str> {
        self.pending.get(tool_use_id).map(|p| p.name.as_str())
    }

    pub fn analytics(&self) -> &HashMap<String, ToolAnalytics> {
        &self.analytics
    }

    pub fn reset(&mut self) {
        self.analytics.clear();
        self.pending.clear();
    }

    pub fn restore(&mut self, analytics: HashMap<String, ToolAnalytics>) {
        self.analytics = analytics;
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completes_a_pending_call_and_records_duration() {
        let mut tracker = ToolTracker::default();
        let t0 = Utc::now();
        tracker.on_tool_use("t1", "Read", t0);
        assert_eq!(tracker.analytics()["Read"].pending_count, 1);

        let t1 = t0 + chrono::Duration::milliseconds(50);
        let name = tracker.on_tool_result("t1", false, t1);
        assert_eq!(name.as_deref(), Some("Read"));
        let entry = &tracker.analytics()["Read"];
        assert_eq!(entry.pending_count, 0);
        assert_eq!(entry.success_count, 1);
        assert_eq!(entry.completed_count, 1);
        assert_eq!(entry.total_duration_ms, 50);
    }

    #[test]
    fn unmatched_tool_result_does_not_alter_analytics() {
        let mut tracker = ToolTracker::default();
        assert!(tracker.on_tool_result("missing", true, Utc::now()).is_none());
        assert!(tracker.analytics().is_empty());
    }
}
