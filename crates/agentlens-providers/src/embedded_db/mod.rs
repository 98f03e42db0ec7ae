//! Provider 3: an embedded relational database (`project`, `session`,
//! `message`, `part` tables) queried read-only, out-of-process, via
//! `sqlite3 -readonly -json`.

pub mod query;

use std::path::{Path, PathBuf};
use std::process::Command;

use agentlens_types::Usage;
use serde_json::Value;

use crate::reader::TimeCursorReader;
use crate::traits::{Reader, SearchHit, SessionFileStats, SessionProvider};
use crate::Result;
use query::{run_readonly_query, DbHandle};

pub const PROVIDER_ID: &str = "embedded_db";

/// `session_path`s handed out by this provider encode `{db path}#{session
/// id}` — there's no real filesystem session file, just a pair of keys into
/// the shared database. Opaque to every caller except this module.
fn encode_session_path(db_path: &Path, session_id: &str) -> PathBuf {
    PathBuf::from(format!("{}#{}", db_path.display(), session_id))
}

fn decode_session_path(session_path: &Path) -> Option<(PathBuf, String)> {
    let raw = session_path.to_string_lossy();
    let (db, session_id) = raw.rsplit_once('#')?;
    Some((PathBuf::from(db), session_id.to_string()))
}

pub struct EmbeddedDbProvider {
    db_path: PathBuf,
}

impl EmbeddedDbProvider {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self { db_path: db_path.into() }
    }

    fn db(&self) -> DbHandle {
        DbHandle::new(&self.db_path)
    }

    /// Exact `worktree` match -> longest-prefix match on normalized absolute
    /// paths -> fallback to the repo root commit hash.
    fn resolve_project_id(&self, workspace_path: &Path) -> Option<String> {
        let target = agentlens_core::normalize_path(workspace_path);
        let target_str = target.to_string_lossy().to_string();
        let rows = run_readonly_query(&self.db(), "select id, worktree from project").ok()?;

        if let Some(row) = rows.iter().find(|r| {
            r.get("worktree").and_then(Value::as_str).map(|w| {
                agentlens_core::normalize_path(Path::new(w)) == target
            }) == Some(true)
        }) {
            return row.get("id").and_then(Value::as_str).map(String::from);
        }

        let mut best: Option<(&Value, usize)> = None;
        for row in &rows {
            let Some(worktree) = row.get("worktree").and_then(Value::as_str) else {
                continue;
            };
            if target_str.starts_with(worktree) && worktree.len() > best.map(|(_, len)| len).unwrap_or(0) {
                best = Some((row, worktree.len()));
            }
        }
        if let Some((row, _)) = best {
            return row.get("id").and_then(Value::as_str).map(String::from);
        }

        let commit_hash = repo_root_commit_hash(workspace_path)?;
        rows.iter()
            .find(|r| r.get("id").and_then(Value::as_str) == Some(commit_hash.as_str()))
            .and_then(|r| r.get("id").and_then(Value::as_str).map(String::from))
    }
}

fn repo_root_commit_hash(workspace_path: &Path) -> Option<String> {
    let output = Command::new("git")
        .args(["rev-list", "--max-parents=0", "HEAD"])
        .current_dir(workspace_path)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.lines().last().unwrap_or_default().trim().to_string())
        .filter(|s| !s.is_empty())
}

impl SessionProvider for EmbeddedDbProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn get_session_directory(&self, _workspace_path: &Path) -> PathBuf {
        self.db_path.clone()
    }

    fn discover_session_directory(&self, _workspace_path: &Path) -> Option<PathBuf> {
        self.db_path.is_file().then(|| self.db_path.clone())
    }

    fn find_active_session(&self, workspace_path: &Path) -> Option<PathBuf> {
        self.find_all_sessions(workspace_path).into_iter().next()
    }

    fn find_all_sessions(&self, workspace_path: &Path) -> Vec<PathBuf> {
        let Some(project_id) = self.resolve_project_id(workspace_path) else {
            return Vec::new();
        };
        let Ok(rows) = run_readonly_query(
            &self.db(),
            &format!(
                "select id from session where project_id = '{}' order by time_updated desc",
                project_id.replace('\'', "''")
            ),
        ) else {
            return Vec::new();
        };
        rows.iter()
            .filter_map(|r| r.get("id").and_then(Value::as_str))
            .map(|id| encode_session_path(&self.db_path, id))
            .collect()
    }

    fn create_reader(&self, session_path: &Path) -> Result<Box<dyn Reader>> {
        let (db_path, session_id) = decode_session_path(session_path)
            .ok_or_else(|| crate::Error::Provider("malformed embedded_db session path".into()))?;
        Ok(Box::new(TimeCursorReader::new(DbHandle::new(db_path), session_id)))
    }

    fn read_session_stats(&self, session_path: &Path) -> SessionFileStats {
        let Some((db_path, session_id)) = decode_session_path(session_path) else {
            return SessionFileStats::default();
        };
        let db = DbHandle::new(db_path);
        let Ok(rows) = run_readonly_query(
            &db,
            &format!(
                "select count(*) as n, max(time_updated) as last from message where session_id = '{}'",
                session_id.replace('\'', "''")
            ),
        ) else {
            return SessionFileStats::default();
        };
        let Some(row) = rows.first() else {
            return SessionFileStats::default();
        };
        let count = row.get("n").and_then(Value::as_u64).unwrap_or(0);
        let last_modified = row
            .get("last")
            .and_then(Value::as_i64)
            .and_then(chrono::DateTime::from_timestamp_millis);
        SessionFileStats {
            size_bytes: 0,
            line_or_row_count: count,
            last_modified,
        }
    }

    fn search_in_session(&self, _session_path: &Path, _query: &str, _max_results: usize) -> Vec<SearchHit> {
        // Parts are JSON blobs, not line-oriented text; substring scan over
        // rows isn't meaningful the way it is for JSONL. Left unimplemented
        // pending a dedicated full-text query.
        Vec::new()
    }

    fn extract_session_label(&self, session_path: &Path) -> Option<String> {
        let (db_path, session_id) = decode_session_path(session_path)?;
        let db = DbHandle::new(db_path);
        let rows = run_readonly_query(
            &db,
            &format!(
                "select s.title as title from session s where s.id = '{}'",
                session_id.replace('\'', "''")
            ),
        )
        .ok()?;
        rows.first()
            .and_then(|r| r.get("title").and_then(Value::as_str))
            .map(|t| agentlens_types::truncate(t, 60))
    }

    fn compute_context_size(&self, usage: &Usage) -> Option<u64> {
        Some(usage.input_tokens + usage.cache_creation_input_tokens + usage.cache_read_input_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_and_decodes_session_path_round_trip() {
        let db = Path::new("/data/store.db");
        let encoded = encode_session_path(db, "sess-123");
        let (decoded_db, decoded_id) = decode_session_path(&encoded).unwrap();
        assert_eq!(decoded_db, db);
        assert_eq!(decoded_id, "sess-123");
    }
}
