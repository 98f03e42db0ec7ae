//! Session liveness detection (from tailed log bytes) and a lightweight
//! pattern clusterer surfacing repeated event summaries.

mod activity;
mod pattern;

pub use activity::{classify, ActivityStatus};
pub use pattern::{PatternCluster, PatternClusterer};
