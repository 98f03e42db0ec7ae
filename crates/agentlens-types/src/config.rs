use serde::{Deserialize, Serialize};

/// Tunables recognized by the aggregator. All optional; defaults match the
/// behavior described for the reference implementation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    pub timeline_cap: usize,
    pub latency_cap: usize,
    pub burn_window_ms: i64,
    pub burn_sample_ms: i64,
    /// >20% context-drop heuristic for compaction, expressed as the retained
    /// fraction (0.8 = "drop below 80% of the previous size triggers it").
    pub compaction_drop_ratio: f64,
    /// Activity detector staleness threshold, in seconds.
    pub stale_after_secs: i64,
    pub provider_id: String,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            timeline_cap: 200,
            latency_cap: 100,
            burn_window_ms: 300_000,
            burn_sample_ms: 10_000,
            compaction_drop_ratio: 0.8,
            stale_after_secs: 300,
            provider_id: String::new(),
        }
    }
}
