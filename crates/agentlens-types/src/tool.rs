use serde::{Deserialize, Serialize};

/// Tool classification by semantic purpose, used to drive the tool-summary
/// formatter registry (`agentlens-providers::normalize::tool_summary`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Read,
    Write,
    Execute,
    Plan,
    Search,
    Ask,
    Other,
}

/// Distinguishes provider-native tools from MCP-protocol tools (usually
/// prefixed `mcp__`). Informational only; does not affect aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolOrigin {
    System,
    Mcp,
}
