use std::collections::{BTreeMap, HashSet};

use agentlens_types::{MessageInfo, SessionEvent, SessionEventKind, Usage};
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::embedded_db::query::{run_readonly_query, DbHandle};
use crate::traits::{Reader, ReaderCursor};
use crate::Result;

/// Time-cursor poll reader for the embedded-database source.
///
/// Unlike the byte-offset reader, `was_truncated` is always false and
/// `exists` is always true: a database row is durable once committed.
pub struct TimeCursorReader {
    db: DbHandle,
    session_id: String,
    last_time_updated: i64,
    has_read_once: bool,
}

impl TimeCursorReader {
    pub fn new(db: DbHandle, session_id: impl Into<String>) -> Self {
        Self {
            db,
            session_id: session_id.into(),
            last_time_updated: 0,
            has_read_once: false,
        }
    }

    fn full_history_load(&mut self) -> Result<Vec<SessionEvent>> {
        let messages = run_readonly_query(
            &self.db,
            &format!(
                "select * from message where session_id = '{}' order by time_created asc",
                escape(&self.session_id)
            ),
        )?;
        let parts = run_readonly_query(
            &self.db,
            &format!(
                "select * from part where session_id = '{}' order by time_created asc",
                escape(&self.session_id)
            ),
        )?;

        let grouped = group_parts_by_message(&parts);
        let events = messages_to_events(&messages, &grouped, true);

        self.last_time_updated = max_time_updated(&messages, &parts).unwrap_or(0);
        self.has_read_once = true;
        Ok(events)
    }

    fn incremental_load(&mut self) -> Result<Vec<SessionEvent>> {
        let changed_messages = run_readonly_query(
            &self.db,
            &format!(
                "select * from message where session_id = '{}' and time_updated > {}",
                escape(&self.session_id),
                self.last_time_updated
            ),
        )?;
        let changed_parts = run_readonly_query(
            &self.db,
            &format!(
                "select * from part where session_id = '{}' and time_updated > {}",
                escape(&self.session_id),
                self.last_time_updated
            ),
        )?;

        let mut affected: HashSet<String> = changed_messages
            .iter()
            .filter_map(|m| m.get("id").and_then(Value::as_str).map(String::from))
            .collect();
        affected.extend(
            changed_parts
                .iter()
                .filter_map(|p| p.get("message_id").and_then(Value::as_str).map(String::from)),
        );

        if affected.is_empty() {
            return Ok(Vec::new());
        }

        // "Refetch the whole message when any of its parts change" — parts
        // arrive out of order and a tool call may become a tool-result in
        // place, so partial updates would desync the reconstructed message.
        let ids = affected
            .iter()
            .map(|id| format!("'{}'", escape(id)))
            .collect::<Vec<_>>()
            .join(",");
        let messages = run_readonly_query(
            &self.db,
            &format!("select * from message where id in ({})", ids),
        )?;
        let parts = run_readonly_query(
            &self.db,
            &format!("select * from part where message_id in ({}) order by time_created asc", ids),
        )?;

        let grouped = group_parts_by_message(&parts);
        let events = messages_to_events(&messages, &grouped, false);

        if let Some(max) = max_time_updated(&changed_messages, &changed_parts) {
            self.last_time_updated = self.last_time_updated.max(max);
        }
        Ok(events)
    }
}

impl Reader for TimeCursorReader {
    fn read_new(&mut self) -> Result<Vec<SessionEvent>> {
        if !self.has_read_once {
            self.full_history_load()
        } else {
            self.incremental_load()
        }
    }

    fn read_all(&mut self) -> Result<Vec<SessionEvent>> {
        self.has_read_once = false;
        self.last_time_updated = 0;
        self.read_new()
    }

    fn reset(&mut self) {
        self.has_read_once = false;
        self.last_time_updated = 0;
    }

    fn exists(&self) -> bool {
        true
    }

    fn flush(&mut self) {}

    fn position(&self) -> ReaderCursor {
        ReaderCursor::TimeUpdated(self.last_time_updated)
    }

    fn seek_to(&mut self, cursor: ReaderCursor) {
        if let Some(t) = cursor.as_time_updated() {
            self.last_time_updated = t;
            self.has_read_once = true;
        }
    }

    fn was_truncated(&self) -> bool {
        false
    }
}

fn escape(s: &str) -> String {
    s.replace('\'', "''")
}

fn group_parts_by_message(parts: &[Value]) -> BTreeMap<String, Vec<Value>> {
    let mut grouped: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for part in parts {
        if let Some(message_id) = part.get("message_id").and_then(Value::as_str) {
            grouped.entry(message_id.to_string()).or_default().push(part.clone());
        }
    }
    grouped
}

fn max_time_updated(messages: &[Value], parts: &[Value]) -> Option<i64> {
    messages
        .iter()
        .chain(parts.iter())
        .filter_map(|row| row.get("time_updated").and_then(Value::as_i64))
        .max()
}

/// Convert message rows (with their grouped parts) to `SessionEvent`s.
///
/// `filter_unanswered_user` implements the first-load rule: user messages
/// that have not yet been followed by an assistant reply (per `parentID`)
/// are withheld until that reply exists, to avoid showing a dangling prompt.
fn messages_to_events(
    messages: &[Value],
    parts_by_message: &BTreeMap<String, Vec<Value>>,
    filter_unanswered_user: bool,
) -> Vec<SessionEvent> {
    let mut answered_parents: HashSet<String> = HashSet::new();
    if filter_unanswered_user {
        for m in messages {
            if m.get("data").and_then(|d| d.get("role")).and_then(Value::as_str) == Some("assistant")
                && let Some(parent) = m.get("data").and_then(|d| d.get("parentID")).and_then(Value::as_str)
            {
                answered_parents.insert(parent.to_string());
            }
        }
    }

    let mut out = Vec::new();
    for m in messages {
        let Some(id) = m.get("id").and_then(Value::as_str) else {
            continue;
        };
        let data = m.get("data").cloned().unwrap_or(Value::Null);
        let role = data.get("role").and_then(Value::as_str).unwrap_or("user");

        if filter_unanswered_user && role == "user" && !answered_parents.contains(id) {
            continue;
        }

        let timestamp = m
            .get("time_created")
            .and_then(Value::as_i64)
            .and_then(|ms| DateTime::from_timestamp_millis(ms))
            .unwrap_or_else(Utc::now);

        let model = data.get("modelID").and_then(Value::as_str).map(String::from);
        let usage = data.get("tokens").map(|t| Usage {
            input_tokens: t.get("input").and_then(Value::as_u64).unwrap_or(0),
            output_tokens: t.get("output").and_then(Value::as_u64).unwrap_or(0),
            cache_creation_input_tokens: t
                .pointer("/cache/write")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            cache_read_input_tokens: t
                .pointer("/cache/read")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            reasoning_tokens: t.get("reasoning").and_then(Value::as_u64).unwrap_or(0),
            reported_cost: data.get("cost").and_then(Value::as_f64).unwrap_or(0.0),
        });

        let empty = Vec::new();
        let parts = parts_by_message.get(id).unwrap_or(&empty);
        let text = parts
            .iter()
            .find(|p| p.get("data").and_then(|d| d.get("type")).and_then(Value::as_str) == Some("text"))
            .and_then(|p| p.pointer("/data/text"))
            .and_then(Value::as_str)
            .map(String::from);

        let kind = if role == "assistant" {
            SessionEventKind::Assistant
        } else {
            SessionEventKind::User
        };

        out.push(SessionEvent {
            kind,
            timestamp,
            message: Some(MessageInfo {
                role: Some(role.to_string()),
                id: Some(id.to_string()),
                model,
                usage,
                content: Vec::new(),
                text,
            }),
            tool: None,
            result: None,
            is_sidechain: false,
            permission_mode: None,
        });
    }
    out
}
