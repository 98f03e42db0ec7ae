use serde::{Deserialize, Serialize};
use serde_json::Value;

/// SHA-256 hex digest identifying a project root, stable across git worktrees.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectHash(String);

impl ProjectHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProjectHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One line of a JSONL log, or one row of an embedded database, before normalization.
///
/// Opaque on purpose: the shape varies per provider and the normalizer is the only
/// place allowed to reach into it. Immutable after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub provider_id: &'static str,
    pub value: Value,
}

impl RawEvent {
    pub fn new(provider_id: &'static str, value: Value) -> Self {
        Self { provider_id, value }
    }
}
