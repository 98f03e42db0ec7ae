use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use agentlens_types::SessionEvent;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::traits::{Reader, ReaderCursor};
use crate::{Error, Result};

/// A provider's hook for turning one already-JSON-parsed line into the
/// envelope `normalize::decompose` expects, or `None` to skip the line (used
/// by the rollout provider to swallow its leading `session_meta` header).
pub type LineUnwrapper = fn(&Value) -> Option<Value>;

/// Byte-offset tail reader for JSONL sources (spec "Incremental Reader",
/// byte-offset-tail implementation).
///
/// Invariant: `file_position` is always at a line boundary after a
/// successful `read_new()`.
pub struct ByteOffsetReader {
    path: PathBuf,
    provider_id: &'static str,
    file_position: u64,
    partial_line: Vec<u8>,
    was_truncated: bool,
    unwrap: LineUnwrapper,
}

fn default_unwrap(v: &Value) -> Option<Value> {
    Some(v.clone())
}

impl ByteOffsetReader {
    pub fn new(path: impl Into<PathBuf>, provider_id: &'static str) -> Self {
        Self::with_unwrapper(path, provider_id, default_unwrap)
    }

    pub fn with_unwrapper(
        path: impl Into<PathBuf>,
        provider_id: &'static str,
        unwrap: LineUnwrapper,
    ) -> Self {
        Self {
            path: path.into(),
            provider_id,
            file_position: 0,
            partial_line: Vec::new(),
            was_truncated: false,
            unwrap,
        }
    }

    fn current_size(&self) -> Option<u64> {
        std::fs::metadata(&self.path).ok().map(|m| m.len())
    }

    fn feed(&mut self, bytes: &[u8], out: &mut Vec<SessionEvent>) {
        self.partial_line.extend_from_slice(bytes);

        loop {
            let Some(newline_pos) = self.partial_line.iter().position(|&b| b == b'\n') else {
                break;
            };
            let line_bytes: Vec<u8> = self.partial_line.drain(..=newline_pos).collect();
            // Drop the trailing '\n' itself.
            let line = String::from_utf8_lossy(&line_bytes[..line_bytes.len() - 1]);
            self.parse_line(line.trim(), out);
        }
    }

    fn parse_line(&self, line: &str, out: &mut Vec<SessionEvent>) {
        if line.is_empty() || !line.starts_with('{') {
            return;
        }
        let value: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(err) => {
                warn!(provider = self.provider_id, %err, "skipping malformed JSONL line");
                return;
            }
        };
        let Some(envelope) = (self.unwrap)(&value) else {
            return;
        };
        let timestamp = envelope
            .get("timestamp")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);
        let is_sidechain = envelope
            .get("isSidechain")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let permission_mode = envelope
            .get("permissionMode")
            .and_then(Value::as_str)
            .map(String::from);
        out.extend(crate::normalize::decompose(
            &envelope,
            timestamp,
            is_sidechain,
            permission_mode,
        ));
    }
}

impl Reader for ByteOffsetReader {
    fn read_new(&mut self) -> Result<Vec<SessionEvent>> {
        let Some(size) = self.current_size() else {
            return Ok(Vec::new());
        };

        if size < self.file_position {
            debug!(path = %self.path.display(), "source truncated, resetting cursor");
            self.was_truncated = true;
            self.file_position = 0;
            self.partial_line.clear();
        }

        if size == self.file_position {
            return Ok(Vec::new());
        }

        let mut file = File::open(&self.path).map_err(Error::Io)?;
        file.seek(SeekFrom::Start(self.file_position))
            .map_err(Error::Io)?;
        let to_read = (size - self.file_position) as usize;
        let mut buf = vec![0u8; to_read];
        file.read_exact(&mut buf).map_err(Error::Io)?;

        let mut out = Vec::new();
        self.feed(&buf, &mut out);
        self.file_position = size;
        Ok(out)
    }

    fn read_all(&mut self) -> Result<Vec<SessionEvent>> {
        self.reset();
        self.read_new()
    }

    fn reset(&mut self) {
        self.file_position = 0;
        self.partial_line.clear();
        self.was_truncated = false;
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn flush(&mut self) {
        self.partial_line.clear();
    }

    fn position(&self) -> ReaderCursor {
        ReaderCursor::ByteOffset(self.file_position)
    }

    fn seek_to(&mut self, cursor: ReaderCursor) {
        if let Some(offset) = cursor.as_byte_offset() {
            self.file_position = offset;
            self.partial_line.clear();
        }
    }

    fn was_truncated(&self) -> bool {
        self.was_truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn reads_only_newly_appended_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "s.jsonl",
            "{\"type\":\"user\",\"message\":{\"content\":\"hi\"}}\n",
        );
        let mut reader = ByteOffsetReader::new(&path, "workspace_jsonl");
        let first = reader.read_new().unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(reader.read_new().unwrap().len(), 0);

        let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(f, "{{\"type\":\"result\"}}").unwrap();
        let second = reader.read_new().unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(reader.position(), ReaderCursor::ByteOffset(path.metadata().unwrap().len()));
    }

    #[test]
    fn detects_truncation_and_resets() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "s.jsonl", "{\"type\":\"result\"}\n".repeat(5).as_str());
        let mut reader = ByteOffsetReader::new(&path, "workspace_jsonl");
        reader.read_new().unwrap();
        assert!(!reader.was_truncated());

        write_file(&dir, "s.jsonl", "{\"type\":\"result\"}\n");
        let events = reader.read_new().unwrap();
        assert!(reader.was_truncated());
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn skips_malformed_lines_without_advancing_semantics() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "s.jsonl", "not json\n{\"type\":\"result\"}\n");
        let mut reader = ByteOffsetReader::new(&path, "workspace_jsonl");
        let events = reader.read_new().unwrap();
        assert_eq!(events.len(), 1);
    }
}
