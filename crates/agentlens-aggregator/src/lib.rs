//! Stateful aggregation engine. Consumes the canonical `SessionEvent` stream
//! produced by `agentlens-providers` and maintains token, tool, task, plan,
//! and timeline metrics for a single session.

mod aggregator;
mod burn_rate;
mod context_attribution;
mod error;
mod latency;
mod plan_tracker;
mod snapshot;
mod subagents;
mod tasks;
mod timeline;
mod tools;
mod truncation;

pub use agentlens_types::AggregatorConfig;

pub use aggregator::{Aggregator, ContextSizeFn};
pub use error::{Error, Result};
pub use plan_tracker::PlanTracker;
pub use snapshot::{SerializedState, SCHEMA_VERSION};
