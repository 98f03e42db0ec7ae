use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lossy, UI-facing summary of one (fragment of a) [`crate::SessionEvent`].
///
/// A single `SessionEvent` can fan out into several of these — an assistant
/// message with three `tool_use` blocks and one text block becomes four.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowEvent {
    pub provider_id: String,
    #[serde(rename = "type")]
    pub kind: FollowEventKind,
    pub timestamp: DateTime<Utc>,
    /// Truncated to <=200 chars, whitespace-collapsed.
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Truncated to <=80 chars.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_input_preview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limits: Option<serde_json::Value>,
    /// Opaque pointer back into the raw log (byte offset, row id, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_pointer: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowEventKind {
    User,
    Assistant,
    ToolUse,
    ToolResult,
    Summary,
    System,
    Result,
}

impl From<crate::session_event::SessionEventKind> for FollowEventKind {
    fn from(k: crate::session_event::SessionEventKind) -> Self {
        use crate::session_event::SessionEventKind as K;
        match k {
            K::User => FollowEventKind::User,
            K::Assistant => FollowEventKind::Assistant,
            K::ToolUse => FollowEventKind::ToolUse,
            K::ToolResult => FollowEventKind::ToolResult,
            K::Summary => FollowEventKind::Summary,
            K::System => FollowEventKind::System,
            K::Result => FollowEventKind::Result,
        }
    }
}
