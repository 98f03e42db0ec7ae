//! Substring search and session-label extraction shared by the JSONL
//! providers. Both treat I/O failure as "no results" per the discovery
//! failure policy, never propagating an error.

use std::path::Path;

use serde_json::Value;

use crate::traits::SearchHit;

const CONTEXT_CHARS: usize = 40;
const LABEL_MAX_CHARS: usize = 60;

pub fn substring_search(session_path: &Path, query: &str, max_results: usize) -> Vec<SearchHit> {
    let Ok(contents) = std::fs::read_to_string(session_path) else {
        return Vec::new();
    };
    let needle = query.to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut hits = Vec::new();
    for (line_no, line) in contents.lines().enumerate() {
        if hits.len() >= max_results {
            break;
        }
        let haystack = line.to_lowercase();
        let Some(pos) = haystack.find(&needle) else {
            continue;
        };
        let chars: Vec<char> = line.chars().collect();
        let byte_to_char: Vec<usize> = line.char_indices().map(|(i, _)| i).collect();
        let char_pos = byte_to_char.iter().position(|&b| b == pos).unwrap_or(0);
        let start = char_pos.saturating_sub(CONTEXT_CHARS);
        let end = (char_pos + needle.chars().count() + CONTEXT_CHARS).min(chars.len());
        let snippet: String = chars[start..end].iter().collect();
        hits.push(SearchHit {
            line_or_row: line_no as u64 + 1,
            snippet,
        });
    }
    hits
}

pub fn first_user_message_label(session_path: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(session_path).ok()?;
    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || !trimmed.starts_with('{') {
            continue;
        }
        let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
            continue;
        };
        if value.get("type").and_then(Value::as_str) != Some("user") {
            continue;
        }
        let text = extract_text(&value);
        if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
            return Some(agentlens_types::truncate(text.trim(), LABEL_MAX_CHARS));
        }
    }
    None
}

fn extract_text(raw: &Value) -> Option<String> {
    let message = raw.get("message")?;
    if let Some(text) = message.get("content").and_then(Value::as_str) {
        return Some(text.to_string());
    }
    message
        .get("content")
        .and_then(Value::as_array)?
        .iter()
        .find_map(|block| {
            if block.get("type").and_then(Value::as_str) == Some("text") {
                block.get("text").and_then(Value::as_str).map(String::from)
            } else {
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_substring_with_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.jsonl");
        std::fs::write(&path, "the quick brown fox jumps over the lazy dog\n").unwrap();
        let hits = substring_search(&path, "brown", 10);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].snippet.contains("brown"));
    }

    #[test]
    fn extracts_first_user_message_label() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.jsonl");
        std::fs::write(
            &path,
            "{\"type\":\"system\"}\n{\"type\":\"user\",\"message\":{\"content\":\"fix the bug\"}}\n",
        )
        .unwrap();
        assert_eq!(first_user_message_label(&path), Some("fix the bug".to_string()));
    }
}
