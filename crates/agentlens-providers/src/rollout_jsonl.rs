//! Provider 2: append-only JSONL rollout files living under a single
//! directory tree, one file per session, discoverable only by reading the
//! leading `session_meta` line (which carries the originating `cwd`).

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, SystemTime};

use agentlens_types::Usage;
use regex::Regex;
use serde_json::Value;
use walkdir::WalkDir;

use crate::reader::ByteOffsetReader;
use crate::traits::{Reader, SearchHit, SessionFileStats, SessionProvider};
use crate::Result;

pub const PROVIDER_ID: &str = "rollout_jsonl";

const ACTIVE_WINDOW: Duration = Duration::from_secs(5 * 60);

fn uuid_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12})$")
            .expect("static regex")
    })
}

pub struct RolloutJsonlProvider {
    root: PathBuf,
}

impl RolloutJsonlProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn all_rollout_files(&self) -> Vec<PathBuf> {
        WalkDir::new(&self.root)
            .into_iter()
            .flatten()
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "jsonl"))
            .map(|e| e.path().to_path_buf())
            .collect()
    }

    fn session_meta_cwd(path: &Path) -> Option<String> {
        let file = std::fs::File::open(path).ok()?;
        let first_line = std::io::BufRead::lines(std::io::BufReader::new(file)).next()?.ok()?;
        let value: Value = serde_json::from_str(first_line.trim()).ok()?;
        if value.get("type").and_then(Value::as_str) != Some("session_meta") {
            return None;
        }
        value
            .get("cwd")
            .or_else(|| value.pointer("/payload/cwd"))
            .and_then(Value::as_str)
            .map(String::from)
    }

    fn sessions_for_workspace(&self, workspace_path: &Path) -> Vec<PathBuf> {
        let target = agentlens_core::normalize_path(workspace_path);
        let mut matches: Vec<(PathBuf, SystemTime)> = self
            .all_rollout_files()
            .into_iter()
            .filter(|path| {
                Self::session_meta_cwd(path)
                    .map(|cwd| agentlens_core::normalize_path(Path::new(&cwd)) == target)
                    .unwrap_or(false)
            })
            .filter_map(|path| {
                let mtime = path.metadata().ok()?.modified().ok()?;
                Some((path, mtime))
            })
            .collect();
        matches.sort_by_key(|(_, mtime)| std::cmp::Reverse(*mtime));
        matches.into_iter().map(|(path, _)| path).collect()
    }
}

impl SessionProvider for RolloutJsonlProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn get_session_directory(&self, _workspace_path: &Path) -> PathBuf {
        self.root.clone()
    }

    fn discover_session_directory(&self, _workspace_path: &Path) -> Option<PathBuf> {
        self.root.is_dir().then(|| self.root.clone())
    }

    fn find_active_session(&self, workspace_path: &Path) -> Option<PathBuf> {
        let sessions = self.sessions_for_workspace(workspace_path);
        let now = SystemTime::now();
        sessions
            .iter()
            .find(|path| {
                path.metadata()
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .and_then(|mtime| now.duration_since(mtime).ok())
                    .is_some_and(|age| age <= ACTIVE_WINDOW)
            })
            .or_else(|| sessions.first())
            .cloned()
    }

    fn find_all_sessions(&self, workspace_path: &Path) -> Vec<PathBuf> {
        self.sessions_for_workspace(workspace_path)
    }

    fn create_reader(&self, session_path: &Path) -> Result<Box<dyn Reader>> {
        Ok(Box::new(ByteOffsetReader::with_unwrapper(
            session_path,
            PROVIDER_ID,
            skip_session_meta,
        )))
    }

    fn read_session_stats(&self, session_path: &Path) -> SessionFileStats {
        let Ok(meta) = std::fs::metadata(session_path) else {
            return SessionFileStats::default();
        };
        let line_count = std::fs::read_to_string(session_path)
            .map(|s| s.lines().filter(|l| !l.trim().is_empty()).count() as u64)
            .unwrap_or(0);
        SessionFileStats {
            size_bytes: meta.len(),
            line_or_row_count: line_count,
            last_modified: meta.modified().ok().map(chrono::DateTime::from),
        }
    }

    fn search_in_session(&self, session_path: &Path, query: &str, max_results: usize) -> Vec<SearchHit> {
        crate::search::substring_search(session_path, query, max_results)
    }

    fn extract_session_label(&self, session_path: &Path) -> Option<String> {
        crate::search::first_user_message_label(session_path)
    }

    fn compute_context_size(&self, usage: &Usage) -> Option<u64> {
        Some(usage.input_tokens + usage.cache_creation_input_tokens + usage.cache_read_input_tokens)
    }
}

fn skip_session_meta(value: &Value) -> Option<Value> {
    if value.get("type").and_then(Value::as_str) == Some("session_meta") {
        None
    } else {
        Some(value.clone())
    }
}

/// Extracts the trailing 5-hyphen UUID from a rollout filename, which is the
/// provider's session id.
pub fn session_id_from_filename(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy();
    uuid_suffix_re()
        .captures(&stem)
        .map(|c| c[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_trailing_uuid_from_filename() {
        let path = Path::new("rollout-2024-01-01T00-00-00-4b1f6f2a-9a3e-4b1a-8e1a-0f1f2e3d4c5b.jsonl");
        assert_eq!(
            session_id_from_filename(path),
            Some("4b1f6f2a-9a3e-4b1a-8e1a-0f1f2e3d4c5b".to_string())
        );
    }

    #[test]
    fn skips_session_meta_header() {
        assert!(skip_session_meta(&serde_json::json!({"type": "session_meta", "cwd": "/x"})).is_none());
        assert!(skip_session_meta(&serde_json::json!({"type": "user"})).is_some());
    }
}
