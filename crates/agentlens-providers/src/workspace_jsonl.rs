//! Provider 1: one append-only JSONL file per session, stored in a
//! per-workspace directory whose name is derived from the workspace path.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use agentlens_types::Usage;

use crate::reader::ByteOffsetReader;
use crate::traits::{Reader, SearchHit, SessionFileStats, SessionProvider};
use crate::Result;

pub const PROVIDER_ID: &str = "workspace_jsonl";

const ACTIVE_WINDOW: Duration = Duration::from_secs(5 * 60);

pub struct WorkspaceJsonlProvider {
    root: PathBuf,
}

impl WorkspaceJsonlProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn encode_workspace(&self, workspace_path: &Path) -> String {
        let normalized = workspace_path.to_string_lossy().replace('\\', "/");
        normalized
            .chars()
            .map(|c| if matches!(c, ':' | '/' | '_') { '-' } else { c })
            .collect()
    }
}

impl SessionProvider for WorkspaceJsonlProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn get_session_directory(&self, workspace_path: &Path) -> PathBuf {
        self.root.join(self.encode_workspace(workspace_path))
    }

    fn discover_session_directory(&self, workspace_path: &Path) -> Option<PathBuf> {
        let computed = self.get_session_directory(workspace_path);
        if computed.is_dir() {
            return Some(computed);
        }

        let basename = workspace_path.file_name()?.to_string_lossy().to_lowercase();
        if let Ok(entries) = std::fs::read_dir(&self.root) {
            for entry in entries.flatten() {
                let name = entry.file_name().to_string_lossy().to_lowercase();
                if name.starts_with(&basename) || name.contains(&basename) {
                    return Some(entry.path());
                }
            }
        }

        let fallback = std::env::temp_dir().join("agentlens").join(self.encode_workspace(workspace_path));
        fallback.is_dir().then_some(fallback)
    }

    fn find_active_session(&self, workspace_path: &Path) -> Option<PathBuf> {
        let dir = self.discover_session_directory(workspace_path)?;
        let mut candidates: Vec<(PathBuf, SystemTime)> = std::fs::read_dir(&dir)
            .ok()?
            .flatten()
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "jsonl"))
            .filter_map(|e| {
                let meta = e.metadata().ok()?;
                if meta.len() == 0 {
                    return None;
                }
                Some((e.path(), meta.modified().ok()?))
            })
            .collect();

        candidates.sort_by_key(|(_, mtime)| std::cmp::Reverse(*mtime));
        let now = SystemTime::now();
        candidates
            .iter()
            .find(|(_, mtime)| now.duration_since(*mtime).is_ok_and(|age| age <= ACTIVE_WINDOW))
            .or_else(|| candidates.first())
            .map(|(path, _)| path.clone())
    }

    fn find_all_sessions(&self, workspace_path: &Path) -> Vec<PathBuf> {
        let Some(dir) = self.discover_session_directory(workspace_path) else {
            return Vec::new();
        };
        let mut entries: Vec<(PathBuf, SystemTime)> = std::fs::read_dir(&dir)
            .into_iter()
            .flatten()
            .flatten()
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "jsonl"))
            .filter_map(|e| Some((e.path(), e.metadata().ok()?.modified().ok()?)))
            .collect();
        entries.sort_by_key(|(_, mtime)| std::cmp::Reverse(*mtime));
        entries.into_iter().map(|(path, _)| path).collect()
    }

    fn create_reader(&self, session_path: &Path) -> Result<Box<dyn Reader>> {
        Ok(Box::new(ByteOffsetReader::new(session_path, PROVIDER_ID)))
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_workspace_path_separators() {
        let provider = WorkspaceJsonlProvider::new("/data/sessions");
        let encoded = provider.encode_workspace(Path::new("/home/user/my_project"));
        assert_eq!(encoded, "-home-user-my-project");
    }

    #[test]
    fn find_all_sessions_orders_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let provider = WorkspaceJsonlProvider::new(dir.path());
        let ws = Path::new("/proj");
        let session_dir = provider.get_session_directory(ws);
        std::fs::create_dir_all(&session_dir).unwrap();
        std::fs::write(session_dir.join("a.jsonl"), "{}\n").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));
        std::fs::write(session_dir.join("b.jsonl"), "{}\n").unwrap();

        let sessions = provider.find_all_sessions(ws);
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].file_name().unwrap(), "b.jsonl");
    }
}
