use std::collections::HashMap;

use agentlens_types::{
    AggregatedMetrics, AggregatorConfig, CompactionEvent, ModelUsage, SessionEvent,
    SessionEventKind, TokenTotals, TruncationEvent, Usage,
};
use chrono::{DateTime, Utc};

use crate::burn_rate::BurnRateTracker;
use crate::context_attribution::ContextAttributionTracker;
use crate::latency::LatencyTracker;
use crate::plan_tracker::PlanTracker;
use crate::snapshot::{SerializedState, SCHEMA_VERSION};
use crate::subagents::SubagentTracker;
use crate::tasks::TaskTracker;
use crate::timeline::Timeline;
use crate::tools::ToolTracker;
use crate::{Error, Result};

const SYNTHETIC_TOKEN_COUNT_PREFIX: &str = "token-count-";

/// Provider-native context-size override, injected so the aggregator stays
/// decoupled from `agentlens-providers`.
pub type ContextSizeFn = Box<dyn Fn(&Usage) -> Option<u64> + Send>;

/// Consumes canonical [`SessionEvent`]s in emission order and maintains all
/// aggregate session state (spec "Aggregator", the core state engine).
pub struct Aggregator {
    config: AggregatorConfig,
    provider_id: String,
    context_size_fn: Option<ContextSizeFn>,
    plan_tracker: Option<Box<dyn PlanTracker>>,

    session_start_time: Option<DateTime<Utc>>,
    last_event_time: Option<DateTime<Utc>>,
    event_count: u64,
    message_count: u64,
    current_model: Option<String>,

    tokens: TokenTotals,
    model_usage: HashMap<String, ModelUsage>,
    current_context_size: u64,
    previous_context_size: u64,

    compactions: Vec<CompactionEvent>,
    truncations: Vec<TruncationEvent>,

    latency: LatencyTracker,
    tools: ToolTracker,
    tasks: TaskTracker,
    subagents: SubagentTracker,
    context_attribution: ContextAttributionTracker,
    burn_rate: BurnRateTracker,
    timeline: Timeline,
}

impl Aggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        let provider_id = config.provider_id.clone();
        Self {
            config,
            provider_id,
            context_size_fn: None,
            plan_tracker: None,
            session_start_time: None,
            last_event_time: None,
            event_count: 0,
            message_count: 0,
            current_model: None,
            tokens: TokenTotals::default(),
            model_usage: HashMap::new(),
            current_context_size: 0,
            previous_context_size: 0,
            compactions: Vec::new(),
            truncations: Vec::new(),
            latency: LatencyTracker::default(),
            tools: ToolTracker::default(),
            tasks: TaskTracker::default(),
            subagents: SubagentTracker::default(),
            context_attribution: ContextAttributionTracker::default(),
            burn_rate: BurnRateTracker::default(),
            timeline: Timeline::default(),
        }
    }

    pub fn with_context_size_fn(mut self, f: ContextSizeFn) -> Self {
        self.context_size_fn = Some(f);
        self
    }

    pub fn with_plan_tracker(mut self, tracker: Box<dyn PlanTracker>) -> Self {
        self.plan_tracker = Some(tracker);
        self
    }

    /// Canonical entry point.
    pub fn process_session_event(&mut self, event: &SessionEvent) {
        self.step_counters(event);
        self.step_model_tracking(event);
        self.step_latency(event);
        self.step_tokens(event);
        self.step_tasks(event);
        self.step_truncation(event);
        self.step_tool_calls(event);
        self.step_subagents(event);
        self.step_plan(event);
        self.context_attribution.record(event);
        self.timeline.record(event, self.config.timeline_cap);
        self.step_explicit_compaction(event);
    }

    fn step_counters(&mut self, event: &SessionEvent) {
        self.event_count += 1;
        self.session_start_time.get_or_insert(event.timestamp);
        self.last_event_time = Some(event.timestamp);

        let is_token_count_tick = event
            .message
            .as_ref()
            .and_then(|m| m.id.as_deref())
            .is_some_and(|id| id.starts_with(SYNTHETIC_TOKEN_COUNT_PREFIX));
        if !is_token_count_tick && event.kind != SessionEventKind::System {
            self.message_count += 1;
        }
    }

    fn step_model_tracking(&mut self, event: &SessionEvent) {
        if let Some(model) = event.message.as_ref().and_then(|m| m.model.as_deref()) {
            self.current_model = Some(model.to_string());
        }
    }

    fn step_latency(&mut self, event: &SessionEvent) {
        match event.kind {
            SessionEventKind::User => {
                if event.message.as_ref().and_then(|m| m.text()).is_some_and(|t| !t.is_empty()) {
                    self.latency.on_user_text(event.timestamp);
                }
            }
            SessionEventKind::Assistant => {
                let has_text = event.message.as_ref().and_then(|m| m.text()).is_some_and(|t| !t.is_empty());
                let has_usage = event.message.as_ref().is_some_and(|m| m.usage.is_some());
                self.latency.on_assistant(event.timestamp, has_text, has_usage, self.config.latency_cap);
            }
            _ => {}
        }
    }

    fn step_tokens(&mut self, event: &SessionEvent) {
        let Some(usage) = event.message.as_ref().and_then(|m| m.usage) else {
            return;
        };

        self.tokens.input += usage.input_tokens;
        self.tokens.output += usage.output_tokens;
        self.tokens.cache_write += usage.cache_creation_input_tokens;
        self.tokens.cache_read += usage.cache_read_input_tokens;
        self.tokens.reported_cost += usage.reported_cost;

        let context_size = self
            .context_size_fn
            .as_ref()
            .and_then(|f| f(&usage))
            .unwrap_or(usage.input_tokens + usage.cache_creation_input_tokens + usage.cache_read_input_tokens);

        if self.previous_context_size > 0
            && (context_size as f64) < (self.previous_context_size as f64) * (1.0 - self.config.compaction_drop_ratio)
        {
            self.compactions.push(CompactionEvent {
                timestamp: event.timestamp,
                context_before: self.previous_context_size,
                context_after: context_size,
                tokens_reclaimed: self.previous_context_size.saturating_sub(context_size),
            });
        }
        self.previous_context_size = context_size;
        self.current_context_size = context_size;

        let model_key = event
            .message
            .as_ref()
            .and_then(|m| m.model.clone())
            .or_else(|| self.current_model.clone())
            .unwrap_or_else(|| "unknown".to_string());
        let entry = self.model_usage.entry(model_key).or_default();
        entry.calls += 1;
        entry.input_tokens += usage.input_tokens;
        entry.output_tokens += usage.output_tokens;
        entry.cache_write_tokens += usage.cache_creation_input_tokens;
        entry.cache_read_tokens += usage.cache_read_input_tokens;
        entry.tokens += usage.input_tokens + usage.output_tokens;
        entry.cost += usage.reported_cost;

        self.burn_rate.record_tokens(
            event.timestamp,
            usage.input_tokens + usage.output_tokens,
            self.config.burn_sample_ms,
            self.config.burn_window_ms,
        );
    }

    fn step_tool_calls(&mut self, event: &SessionEvent) {
        match event.kind {
            SessionEventKind::ToolUse => {
                if let Some(tool) = &event.tool {
                    if let Some(id) = &tool.tool_use_id {
                        self.tools.on_tool_use(id, &tool.name, event.timestamp);
                    }
                }
            }
            SessionEventKind::ToolResult => {
                if let Some(result) = &event.result {
                    if let Some(id) = &result.tool_use_id {
                        self.tools.on_tool_result(id, result.is_error, event.timestamp);
                    }
                }
            }
            _ => {}
        }
    }

    fn step_tasks(&mut self, event: &SessionEvent) {
        match event.kind {
            SessionEventKind::ToolUse => {
                let Some(tool) = &event.tool else { return };
                match tool.name.as_str() {
                    "TaskCreate" => {
                        if let Some(id) = &tool.tool_use_id {
                            self.tasks.on_task_create(id, &tool.input);
                        }
                    }
                    "TaskUpdate" => {
                        self.tasks.on_task_update(&tool.input, event.timestamp);
                    }
                    _ => {}
                }
            }
            SessionEventKind::ToolResult => {
                let Some(result) = &event.result else { return };
                let Some(id) = &result.tool_use_id else { return };
                if self.tools.pending_tool_name(id) == Some("TaskCreate") {
                    self.tasks.on_task_create_result(id, &result.output, event.timestamp);
                }
            }
            _ => {}
        }
    }

    fn step_subagents(&mut self, event: &SessionEvent) {
        match event.kind {
            SessionEventKind::ToolUse => {
                let Some(tool) = &event.tool else { return };
                if tool.name == "Task" {
                    if let Some(id) = &tool.tool_use_id {
                        self.subagents.on_spawn(id, &tool.input, event.timestamp);
                    }
                }
            }
            SessionEventKind::ToolResult => {
                let Some(result) = &event.result else { return };
                let Some(id) = &result.tool_use_id else { return };
                self.subagents.on_result(id, event.timestamp);
            }
            _ => {}
        }
    }

    fn step_plan(&mut self, event: &SessionEvent) {
        if let Some(tracker) = self.plan_tracker.as_mut() {
            tracker.on_session_event(event);
        }
    }

    fn step_truncation(&mut self, event: &SessionEvent) {
        if event.kind != SessionEventKind::ToolResult {
            return;
        }
        let Some(result) = &event.result else { return };
        let Some(marker) = crate::truncation::detect(&result.output) else {
            return;
        };
        let tool_name = result.tool_use_id.as_deref().and_then(|id| self.tools.pending_tool_name(id)).map(String::from);
        self.truncations.push(TruncationEvent {
            timestamp: event.timestamp,
            tool_name,
            marker: marker.to_string(),
        });
    }

    fn step_explicit_compaction(&mut self, event: &SessionEvent) {
        if event.kind != SessionEventKind::Summary {
            return;
        }
        self.compactions.push(CompactionEvent {
            timestamp: event.timestamp,
            context_before: self.previous_context_size,
            context_after: 0,
            tokens_reclaimed: self.previous_context_size,
        });
        self.previous_context_size = 0;
        self.current_context_size = 0;
    }

    pub fn seed_context_size(&mut self, size: u64) {
        self.current_context_size = size;
        self.previous_context_size = size;
    }

    pub fn seed_context_attribution(&mut self, attribution: agentlens_types::ContextAttribution) {
        self.context_attribution.seed(attribution);
    }

    pub fn reset(&mut self) {
        self.session_start_time = None;
        self.last_event_time = None;
        self.event_count = 0;
        self.message_count = 0;
        self.current_model = None;
        self.tokens = TokenTotals::default();
        self.model_usage.clear();
        self.current_context_size = 0;
        self.previous_context_size = 0;
        self.compactions.clear();
        self.truncations.clear();
        self.latency.reset();
        self.tools.reset();
        self.tasks.reset();
        self.subagents.reset();
        self.context_attribution.reset();
        self.burn_rate.reset();
        self.timeline.reset();
        if let Some(tracker) = self.plan_tracker.as_mut() {
            tracker.reset();
        }
    }

    pub fn get_metrics(&self) -> AggregatedMetrics {
        AggregatedMetrics {
            session_start_time: self.session_start_time,
            last_event_time: self.last_event_time,
            event_count: self.event_count,
            message_count: self.message_count,
            current_model: self.current_model.clone(),
            provider_id: self.provider_id.clone(),
            tokens: self.tokens,
            model_usage: self.model_usage.clone(),
            current_context_size: self.current_context_size,
            context_attribution: self.context_attribution.snapshot(),
            compaction_count: self.compactions.len() as u64,
            compactions: self.compactions.clone(),
            truncation_count: self.truncations.len() as u64,
            truncations: self.truncations.clone(),
            tool_analytics: self.tools.analytics().clone(),
            burn_rate: self.burn_rate.snapshot(),
            task_state: self.tasks.state().clone(),
            subagents: self.subagents.snapshot(),
            plan: self.plan_tracker.as_ref().and_then(|t| t.snapshot()),
            timeline: self.timeline.snapshot(),
            latency: Some(self.latency.snapshot()),
        }
    }

    pub fn serialize(&self) -> SerializedState {
        SerializedState {
            schema_version: SCHEMA_VERSION,
            provider_id: self.provider_id.clone(),
            session_start_time: self.session_start_time,
            last_event_time: self.last_event_time,
            event_count: self.event_count,
            message_count: self.message_count,
            current_model: self.current_model.clone(),
            tokens: self.tokens,
            model_usage: self.model_usage.clone(),
            current_context_size: self.current_context_size,
            previous_context_size: self.previous_context_size,
            context_attribution: self.context_attribution.snapshot(),
            compactions: self.compactions.clone(),
            truncations: self.truncations.clone(),
            tool_analytics: self.tools.analytics().clone(),
            burn_samples: self.burn_rate.snapshot().samples,
            burn_last_sample_time: self.burn_rate.last_sample_time(),
            burn_tokens_since_last_sample: self.burn_rate.tokens_since_last_sample(),
            latency_records: self.latency.snapshot().recent,
            task_state: self.tasks.state().clone(),
            subagents: self.subagents.snapshot(),
            plan: self.plan_tracker.as_ref().and_then(|t| t.snapshot()),
            timeline: self.timeline.snapshot(),
        }
    }

    /// No-op (the caller must fall back to full replay) if `state`'s schema
    /// version doesn't match. Transient state is always cleared.
    pub fn restore(&mut self, state: SerializedState) -> Result<()> {
        if state.schema_version != SCHEMA_VERSION {
            return Err(Error::SchemaMismatch { expected: SCHEMA_VERSION, found: state.schema_version });
        }

        self.provider_id = state.provider_id;
        self.session_start_time = state.session_start_time;
        self.last_event_time = state.last_event_time;
        self.event_count = state.event_count;
        self.message_count = state.message_count;
        self.current_model = state.current_model;
        self.tokens = state.tokens;
        self.model_usage = state.model_usage;
        self.current_context_size = state.current_context_size;
        self.previous_context_size = state.previous_context_size;
        self.context_attribution.seed(state.context_attribution);
        self.compactions = state.compactions;
        self.truncations = state.truncations;
        self.tools.restore(state.tool_analytics);
        self.burn_rate.restore(state.burn_samples, state.burn_last_sample_time, state.burn_tokens_since_last_sample);
        self.latency.restore(state.latency_records, self.config.latency_cap);
        self.tasks.restore(state.task_state);
        self.subagents.restore(state.subagents);
        self.timeline.restore(state.timeline, self.config.timeline_cap);
        if let Some(tracker) = self.plan_tracker.as_mut() {
            tracker.reset();
        }
        Ok(())
    }
}
