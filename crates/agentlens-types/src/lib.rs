mod config;
mod content_block;
mod error;
mod follow_event;
mod metrics;
mod raw;
mod session_event;
mod tool;
mod util;

pub use config::AggregatorConfig;
pub use content_block::ContentBlock;
pub use error::{Error, Result};
pub use follow_event::{FollowEvent, FollowEventKind};
pub use metrics::{
    AggregatedMetrics, BurnRateInfo, BurnSample, CompactionEvent, Complexity, ContextAttribution,
    LatencyStats, ModelUsage, PendingToolCall, PlanSource, PlanState, PlanStep, ResponseLatency,
    StepStatus, SubagentLifecycle, SubagentStatus, TaskState, TaskStatus, TimelineEvent,
    TimelineEventKind, NoiseLevel, ToolAnalytics, TokenTotals, TrackedTask, TruncationEvent,
};
pub use raw::{ProjectHash, RawEvent};
pub use session_event::{MessageInfo, ResultInfo, SessionEvent, SessionEventKind, ToolInfo, Usage};
pub use tool::{ToolKind, ToolOrigin};
pub use util::{collapse_whitespace, is_64_char_hex, truncate};
