use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// One element of `message.content`.
///
/// Kept duck-typed rather than fully schema'd: the `Unknown` variant preserves
/// the raw object so callers that only care about `Text`/`ToolUse`/`ToolResult`
/// aren't forced to round-trip every provider's content shape through one
/// exhaustive match.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: Value,
        is_error: bool,
    },
    /// Anything this crate doesn't interpret, with the original object intact.
    Unknown(Value),
}

impl ContentBlock {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn type_tag(&self) -> &str {
        match self {
            ContentBlock::Text { .. } => "text",
            ContentBlock::Thinking { .. } => "thinking",
            ContentBlock::ToolUse { .. } => "tool_use",
            ContentBlock::ToolResult { .. } => "tool_result",
            ContentBlock::Unknown(v) => v
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown"),
        }
    }
}

impl<'de> Deserialize<'de> for ContentBlock {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let ty = value.get("type").and_then(Value::as_str).unwrap_or("");
        let block = match ty {
            "text" => value
                .get("text")
                .and_then(Value::as_str)
                .map(|t| ContentBlock::Text { text: t.to_string() }),
            "thinking" => value
                .get("thinking")
                .and_then(Value::as_str)
                .map(|t| ContentBlock::Thinking { thinking: t.to_string() }),
            "tool_use" => {
                let id = value.get("id").and_then(Value::as_str);
                let name = value.get("name").and_then(Value::as_str);
                match (id, name) {
                    (Some(id), Some(name)) => Some(ContentBlock::ToolUse {
                        id: id.to_string(),
                        name: name.to_string(),
                        input: value.get("input").cloned().unwrap_or(Value::Null),
                    }),
                    _ => None,
                }
            }
            "tool_result" => value
                .get("tool_use_id")
                .and_then(Value::as_str)
                .map(|id| ContentBlock::ToolResult {
                    tool_use_id: id.to_string(),
                    content: value.get("content").cloned().unwrap_or(Value::Null),
                    is_error: value
                        .get("is_error")
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                }),
            _ => None,
        };
        Ok(block.unwrap_or(ContentBlock::Unknown(value)))
    }
}

impl Serialize for ContentBlock {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            ContentBlock::Text { text } => {
                let mut m = serializer.serialize_map(Some(2))?;
                m.serialize_entry("type", "text")?;
                m.serialize_entry("text", text)?;
                m.end()
            }
            ContentBlock::Thinking { thinking } => {
                let mut m = serializer.serialize_map(Some(2))?;
                m.serialize_entry("type", "thinking")?;
                m.serialize_entry("thinking", thinking)?;
                m.end()
            }
            ContentBlock::ToolUse { id, name, input } => {
                let mut m = serializer.serialize_map(Some(4))?;
                m.serialize_entry("type", "tool_use")?;
                m.serialize_entry("id", id)?;
                m.serialize_entry("name", name)?;
                m.serialize_entry("input", input)?;
                m.end()
            }
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => {
                let mut m = serializer.serialize_map(Some(4))?;
                m.serialize_entry("type", "tool_result")?;
                m.serialize_entry("tool_use_id", tool_use_id)?;
                m.serialize_entry("content", content)?;
                m.serialize_entry("is_error", is_error)?;
                m.end()
            }
            ContentBlock::Unknown(value) => value.serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_variants() {
        let v: ContentBlock = serde_json::from_value(serde_json::json!({
            "type": "tool_use", "id": "t1", "name": "Read", "input": {"path": "a.rs"}
        }))
        .unwrap();
        assert!(matches!(v, ContentBlock::ToolUse { .. }));
    }

    #[test]
    fn preserves_unknown_raw_object() {
        let raw = serde_json::json!({"type": "redacted_thinking", "data": "xyz"});
        let v: ContentBlock = serde_json::from_value(raw.clone()).unwrap();
        match &v {
            ContentBlock::Unknown(inner) => assert_eq!(inner, &raw),
            _ => panic!("expected Unknown"),
        }
        assert_eq!(v.type_tag(), "redacted_thinking");
    }
}
