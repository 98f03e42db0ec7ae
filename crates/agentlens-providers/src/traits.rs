use std::path::{Path, PathBuf};

use agentlens_types::SessionEvent;

use crate::Result;

/// Discovery + lifecycle contract every coding-agent log source implements.
///
/// Failure policy: every method here returns an empty/`None` result on I/O
/// failure rather than propagating — discovery must never take down a caller
/// that's just trying to find sessions.
pub trait SessionProvider: Send + Sync {
    /// Stable id, e.g. `"workspace_jsonl"`.
    fn id(&self) -> &'static str;

    /// Where this provider would look for `workspace_path`'s sessions.
    fn get_session_directory(&self, workspace_path: &Path) -> PathBuf;

    /// Like `get_session_directory`, but falls back to (1) a directory scan
    /// matching by prefix/basename/case-insensitive, then (2) a temp-dir
    /// fallback, for providers whose encoding might disagree with ours.
    fn discover_session_directory(&self, workspace_path: &Path) -> Option<PathBuf>;

    /// Most recently active session for a workspace: prefers files with mtime
    /// within the 5-minute "active" window, falling back to most-recent
    /// mtime; skips empty files.
    fn find_active_session(&self, workspace_path: &Path) -> Option<PathBuf>;

    /// All sessions for a workspace, newest first.
    fn find_all_sessions(&self, workspace_path: &Path) -> Vec<PathBuf>;

    /// Build an incremental reader over one session's backing file/rows.
    fn create_reader(&self, session_path: &Path) -> Result<Box<dyn Reader>>;

    fn read_session_stats(&self, session_path: &Path) -> SessionFileStats;

    /// Substring scan returning snippets with up to +/-40 chars of context.
    fn search_in_session(
        &self,
        session_path: &Path,
        query: &str,
        max_results: usize,
    ) -> Vec<SearchHit>;

    /// First non-empty user-message text, truncated to 60 chars.
    fn extract_session_label(&self, session_path: &Path) -> Option<String>;

    /// Provider-native context-window override; default formula is
    /// `input + cache_write + cache_read` when this returns `None`.
    fn compute_context_size(&self, _usage: &agentlens_types::Usage) -> Option<u64> {
        None
    }

    fn context_window_limit(&self, _model_id: &str) -> Option<u64> {
        None
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionFileStats {
    pub size_bytes: u64,
    pub line_or_row_count: u64,
    pub last_modified: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub line_or_row: u64,
    pub snippet: String,
}

/// Delivers only newly appended events since the last call, resumably.
///
/// Two implementations ship in this crate: [`crate::reader::ByteOffsetReader`]
/// (JSONL tail) and [`crate::reader::TimeCursorReader`] (embedded database).
pub trait Reader: Send {
    /// Ordered new events since the last call; may be empty.
    fn read_new(&mut self) -> Result<Vec<SessionEvent>>;

    /// Restart from the beginning and return everything.
    fn read_all(&mut self) -> Result<Vec<SessionEvent>>;

    fn reset(&mut self);

    fn exists(&self) -> bool;

    /// Flush any buffered partial state (called on watcher stop).
    fn flush(&mut self);

    fn position(&self) -> ReaderCursor;

    fn seek_to(&mut self, cursor: ReaderCursor);

    fn was_truncated(&self) -> bool;
}

/// Opaque resume point: a byte offset for JSONL sources, an epoch-ms
/// timestamp for the embedded-database source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum ReaderCursor {
    ByteOffset(u64),
    TimeUpdated(i64),
}

impl ReaderCursor {
    pub fn as_byte_offset(&self) -> Option<u64> {
        match self {
            ReaderCursor::ByteOffset(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_time_updated(&self) -> Option<i64> {
        match self {
            ReaderCursor::TimeUpdated(n) => Some(*n),
            _ => None,
        }
    }
}
