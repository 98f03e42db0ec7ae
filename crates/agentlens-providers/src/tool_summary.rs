//! Registry of per-tool one-liner formatters for `FollowEvent.summary`.
//! Keyed by normalized tool name; `prefix__name` forms (MCP-style) match on
//! the trailing segment.

use serde_json::Value;

use agentlens_types::truncate;

const PREVIEW_LEN: usize = 80;

pub fn format_tool_input(tool_name: &str, input: &Value) -> String {
    let key = normalize_name(tool_name);
    match key.as_str() {
        "read" => field_str(input, "file_path").unwrap_or_else(|| generic(input)),
        "write" => field_str(input, "file_path").unwrap_or_else(|| generic(input)),
        "edit" => field_str(input, "file_path").unwrap_or_else(|| generic(input)),
        "bash" => field_str(input, "command")
            .map(|c| truncate(&c, PREVIEW_LEN))
            .unwrap_or_else(|| generic(input)),
        "grep" => {
            let pattern = field_str(input, "pattern").unwrap_or_default();
            let path = field_str(input, "path");
            match path {
                Some(p) => format!("{pattern} in {p}"),
                None => pattern,
            }
        }
        "glob" => field_str(input, "pattern").unwrap_or_else(|| generic(input)),
        "task" => field_str(input, "description")
            .or_else(|| field_str(input, "prompt"))
            .unwrap_or_else(|| generic(input)),
        "webfetch" => field_str(input, "url").unwrap_or_else(|| generic(input)),
        "websearch" => field_str(input, "query").unwrap_or_else(|| generic(input)),
        "notebookedit" => field_str(input, "notebook_path").unwrap_or_else(|| generic(input)),
        "taskcreate" => field_str(input, "subject").unwrap_or_else(|| generic(input)),
        "taskupdate" => field_str(input, "subject")
            .or_else(|| field_str(input, "status"))
            .unwrap_or_else(|| generic(input)),
        _ => generic(input),
    }
}

fn normalize_name(tool_name: &str) -> String {
    let trailing = tool_name.rsplit("__").next().unwrap_or(tool_name);
    trailing.to_lowercase()
}

fn field_str(input: &Value, field: &str) -> Option<String> {
    input.get(field).and_then(Value::as_str).map(String::from)
}

/// Fallback: the first non-empty string field, in object key order.
fn generic(input: &Value) -> String {
    let Some(obj) = input.as_object() else {
        return String::new();
    };
    obj.values()
        .find_map(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| truncate(s, PREVIEW_LEN))
        .unwrap_or_default()
}
