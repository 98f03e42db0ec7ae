use std::path::{Path, PathBuf};

use agentlens_aggregator::SerializedState;
use agentlens_providers::ReaderCursor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Current on-disk envelope schema. Bumped whenever a field is added,
/// removed, or changes meaning; `SnapshotStore::load` refuses (and deletes)
/// any other version rather than guessing at a migration.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything needed to resume a session's reader + aggregator without a
/// full replay, persisted as one JSON file per session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEnvelope {
    pub version: u32,
    pub session_id: String,
    pub provider_id: String,
    pub reader_position: ReaderCursor,
    pub source_size: u64,
    pub created_at: DateTime<Utc>,
    pub aggregator: SerializedState,
    #[serde(default)]
    pub consumer: serde_json::Value,
}

impl SnapshotEnvelope {
    /// `currentSourceSize < readerPosition` means the backing file was
    /// truncated since the snapshot was written (JSONL providers only —
    /// database-backed readers report `source_size == 0` and are always
    /// valid, since the time-cursor reader never needs a byte length).
    pub fn is_stale(&self, current_source_size: u64) -> bool {
        if self.source_size == 0 {
            return false;
        }
        match self.reader_position.as_byte_offset() {
            Some(offset) => current_source_size < offset,
            None => false,
        }
    }
}

/// Reads and writes `SnapshotEnvelope`s under `<config_dir>/snapshots/`.
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// `config_dir` is the workspace config root; snapshots live in its
    /// `snapshots/` subdirectory.
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self { dir: snapshots_dir(&config_dir.into()) }
    }

    pub fn save(&self, envelope: &SnapshotEnvelope) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&envelope.session_id);
        let tmp_path = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(envelope).map_err(Error::Json)?;
        std::fs::write(&tmp_path, content)?;
        std::fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    /// Loads the snapshot for `session_id`, if any. A version mismatch
    /// deletes the stale file and returns `Ok(None)` — the caller falls back
    /// to a full replay rather than trust a schema it can't interpret.
    pub fn load(&self, session_id: &str) -> Result<Option<SnapshotEnvelope>> {
        let path = self.path_for(session_id);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)?;
        let envelope: SnapshotEnvelope = match serde_json::from_str(&content) {
            Ok(e) => e,
            Err(_) => {
                let _ = std::fs::remove_file(&path);
                return Ok(None);
            }
        };

        if envelope.version != SNAPSHOT_VERSION {
            let _ = std::fs::remove_file(&path);
            return Ok(None);
        }

        Ok(Some(envelope))
    }

    pub fn delete(&self, session_id: &str) -> Result<()> {
        let path = self.path_for(session_id);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize(session_id)))
    }
}

fn sanitize(session_id: &str) -> String {
    session_id.chars().map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c }).collect()
}

pub fn snapshots_dir(workspace_dir: &Path) -> PathBuf {
    workspace_dir.join("snapshots")
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentlens_types::TokenTotals;
    use std::collections::HashMap;

    fn envelope(session_id: &str, reader_position: ReaderCursor, source_size: u64) -> SnapshotEnvelope {
        SnapshotEnvelope {
            version: SNAPSHOT_VERSION,
            session_id: session_id.to_string(),
            provider_id: "workspace_jsonl".to_string(),
            reader_position,
            source_size,
            created_at: Utc::now(),
            aggregator: SerializedState {
                schema_version: agentlens_aggregator::SCHEMA_VERSION,
                provider_id: "workspace_jsonl".to_string(),
                session_start_time: None,
                last_event_time: None,
                event_count: 0,
                message_count: 0,
                current_model: None,
                tokens: TokenTotals::default(),
                model_usage: HashMap::new(),
                current_context_size: 0,
                previous_context_size: 0,
                context_attribution: Default::default(),
                compactions: Vec::new(),
                truncations: Vec::new(),
                tool_analytics: HashMap::new(),
                burn_samples: Vec::new(),
                burn_last_sample_time: None,
                burn_tokens_since_last_sample: 0,
                latency_records: Vec::new(),
                task_state: Default::default(),
                subagents: Vec::new(),
                plan: None,
                timeline: Vec::new(),
            },
            consumer: serde_json::Value::Null,
        }
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let env = envelope("abc/def:1", ReaderCursor::ByteOffset(512), 1024);

        store.save(&env).unwrap();
        let loaded = store.load("abc/def:1").unwrap().expect("snapshot present");
        assert_eq!(loaded.reader_position.as_byte_offset(), Some(512));

        let on_disk = dir.path().join("snapshots").join("abc_def_1.json");
        assert!(on_disk.exists());
    }

    #[test]
    fn mismatched_version_is_deleted_and_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let mut env = envelope("sess", ReaderCursor::ByteOffset(10), 10);
        env.version = 999;
        store.save(&env).unwrap();

        let path = dir.path().join("snapshots").join("sess.json");
        assert!(path.exists());
        assert!(store.load("sess").unwrap().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn truncated_jsonl_source_is_stale() {
        let env = envelope("sess", ReaderCursor::ByteOffset(1000), 1000);
        assert!(env.is_stale(500));
        assert!(!env.is_stale(1000));
        assert!(!env.is_stale(1500));
    }

    #[test]
    fn db_backed_snapshot_is_always_valid() {
        let env = envelope("sess", ReaderCursor::TimeUpdated(123), 0);
        assert!(!env.is_stale(0));
    }

    #[test]
    fn sanitizes_path_separators_in_session_id() {
        assert_eq!(sanitize("a/b\\c:d"), "a_b_c_d");
    }
}
