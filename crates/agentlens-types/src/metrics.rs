use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cumulative token/cost totals for a session. Monotonically non-decreasing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenTotals {
    pub input: u64,
    pub output: u64,
    pub cache_write: u64,
    pub cache_read: u64,
    pub reported_cost: f64,
}

/// Per-model accumulator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelUsage {
    pub calls: u64,
    pub tokens: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_write_tokens: u64,
    pub cache_read_tokens: u64,
    pub cost: f64,
}

/// Per-tool-name call analytics.
///
/// Invariant: `pending_count >= 0` (enforced by saturating decrement) and
/// `success_count + failure_count == completed_count`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolAnalytics {
    pub success_count: u64,
    pub failure_count: u64,
    /// Milliseconds, summed across every completed call.
    pub total_duration_ms: i64,
    pub completed_count: u64,
    pub pending_count: u64,
}

/// Transient bookkeeping for an in-flight tool call. Never serialized.
#[derive(Debug, Clone)]
pub struct PendingToolCall {
    pub tool_use_id: String,
    pub name: String,
    pub start_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedTask {
    pub task_id: String,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_form: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub tool_call_count: u64,
    #[serde(default)]
    pub blocked_by: Vec<String>,
    #[serde(default)]
    pub blocks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subagent_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_goal_gate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_origin: Option<String>,
}

/// Per-session durable task state: the map plus which task (if any) is active.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskState {
    pub tasks: HashMap<String, TrackedTask>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_task_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubagentStatus {
    Running,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubagentLifecycle {
    /// Equals the `toolUseId` of the spawning `Task` call.
    pub id: String,
    pub description: String,
    pub subagent_type: String,
    pub spawn_time: DateTime<Utc>,
    pub status: SubagentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanSource {
    ClaudeCode,
    Opencode,
    Codex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    pub id: usize,
    pub description: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<Complexity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanState {
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PlanSource>,
    #[serde(default)]
    pub steps: Vec<PlanStep>,
    pub completion_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_markdown: Option<String>,
}

impl Default for PlanState {
    fn default() -> Self {
        Self {
            active: false,
            title: None,
            source: None,
            steps: Vec::new(),
            completion_rate: 0.0,
            raw_markdown: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CompactionEvent {
    pub timestamp: DateTime<Utc>,
    pub context_before: u64,
    pub context_after: u64,
    pub tokens_reclaimed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruncationEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    pub marker: String,
}

/// One sliding-window sample: tokens/minute observed at `time_ms`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BurnSample {
    pub time_ms: i64,
    pub tokens_per_minute: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResponseLatency {
    pub first_token_latency_ms: i64,
    pub total_response_time_ms: i64,
    pub request_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineEventKind {
    UserPrompt,
    AssistantResponse,
    ToolCall,
    ToolResult,
    Compaction,
    SessionStart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseLevel {
    User,
    Ai,
    System,
    Noise,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEvent {
    #[serde(rename = "type")]
    pub kind: TimelineEventKind,
    pub timestamp: DateTime<Utc>,
    /// Truncated to <=200 chars.
    pub description: String,
    pub noise_level: NoiseLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_sidechain: Option<bool>,
}

/// Non-negative counters estimating which part of the prompt the currently
/// reported input tokens came from. Invariant: the sum is <= current input
/// tokens (it's an estimate, not a second ledger).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextAttribution {
    pub system_prompt: u64,
    pub user_messages: u64,
    pub assistant_responses: u64,
    pub tool_inputs: u64,
    pub tool_outputs: u64,
    pub thinking: u64,
    pub other: u64,
}

impl ContextAttribution {
    pub fn sum(&self) -> u64 {
        self.system_prompt
            + self.user_messages
            + self.assistant_responses
            + self.tool_inputs
            + self.tool_outputs
            + self.thinking
            + self.other
    }
}

/// Reported tokens/minute plus the sliding window backing it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BurnRateInfo {
    pub tokens_per_minute: u64,
    pub samples: Vec<BurnSample>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatencyStats {
    pub recent: Vec<ResponseLatency>,
    pub average_first_token_latency_ms: f64,
    pub average_total_response_time_ms: f64,
}

impl LatencyStats {
    pub fn from_records(records: &[ResponseLatency]) -> Self {
        if records.is_empty() {
            return Self::default();
        }
        let n = records.len() as f64;
        let sum_first: i64 = records.iter().map(|r| r.first_token_latency_ms).sum();
        let sum_total: i64 = records.iter().map(|r| r.total_response_time_ms).sum();
        Self {
            recent: records.to_vec(),
            average_first_token_latency_ms: sum_first as f64 / n,
            average_total_response_time_ms: sum_total as f64 / n,
        }
    }
}

/// Full point-in-time snapshot returned by `Aggregator::get_metrics()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_event_time: Option<DateTime<Utc>>,
    pub event_count: u64,
    pub message_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_model: Option<String>,
    pub provider_id: String,
    pub tokens: TokenTotals,
    pub model_usage: HashMap<String, ModelUsage>,
    pub current_context_size: u64,
    pub context_attribution: ContextAttribution,
    pub compaction_count: u64,
    pub compactions: Vec<CompactionEvent>,
    pub truncation_count: u64,
    pub truncations: Vec<TruncationEvent>,
    pub tool_analytics: HashMap<String, ToolAnalytics>,
    pub burn_rate: BurnRateInfo,
    pub task_state: TaskState,
    pub subagents: Vec<SubagentLifecycle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanState>,
    pub timeline: Vec<TimelineEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<LatencyStats>,
}
