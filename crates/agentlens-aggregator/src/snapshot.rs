use std::collections::HashMap;

use agentlens_types::{
    BurnSample, CompactionEvent, ContextAttribution, ModelUsage, PlanState, ResponseLatency,
    SubagentLifecycle, TaskState, TimelineEvent, TokenTotals, ToolAnalytics, TruncationEvent,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current `SerializedState` schema version. Bump whenever a durable field
/// is added, removed, or changes meaning; `restore()` refuses any other
/// version rather than guessing at a migration.
pub const SCHEMA_VERSION: u32 = 1;

/// Everything the aggregator needs to resume without replaying the session
/// from scratch. Transient in-flight maps (pending tool calls, pending task
/// creates, pending subagents, the pending user request, and the plan
/// extractor's buffers) are deliberately absent — they're cleared on
/// `restore()`, not serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedState {
    pub schema_version: u32,
    pub provider_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_event_time: Option<DateTime<Utc>>,
    pub event_count: u64,
    pub message_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_model: Option<String>,
    pub tokens: TokenTotals,
    pub model_usage: HashMap<String, ModelUsage>,
    pub current_context_size: u64,
    pub previous_context_size: u64,
    pub context_attribution: ContextAttribution,
    pub compactions: Vec<CompactionEvent>,
    pub truncations: Vec<TruncationEvent>,
    pub tool_analytics: HashMap<String, ToolAnalytics>,
    pub burn_samples: Vec<BurnSample>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub burn_last_sample_time: Option<DateTime<Utc>>,
    pub burn_tokens_since_last_sample: u64,
    pub latency_records: Vec<ResponseLatency>,
    pub task_state: TaskState,
    pub subagents: Vec<SubagentLifecycle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanState>,
    pub timeline: Vec<TimelineEvent>,
}
