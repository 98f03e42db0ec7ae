//! Plan extractor: recovers an agent's in-progress plan from its raw event
//! stream across three provider-specific dispatch strategies, all feeding a
//! single shared markdown parser.

mod claude_plan_mode;
mod extractor;
mod markdown;
mod structured_tool;
mod xml_block;

use agentlens_types::{PlanSource, PlanStep};

pub use claude_plan_mode::FileReader;
pub use extractor::PlanExtractor;

/// One fully parsed plan, before being reduced to the lossy [`agentlens_types::PlanState`].
#[derive(Debug, Clone)]
pub struct ExtractedPlan {
    pub source: PlanSource,
    pub title: Option<String>,
    pub steps: Vec<PlanStep>,
    pub raw_markdown: String,
}
