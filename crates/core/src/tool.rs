// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool definitions surfaced by an MCP server and adapted to the
//! workflow tool surface as `"<server>.<name>"`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single tool advertised by a connected MCP server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// Opaque JSON Schema bytes describing the tool's input.
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// The qualified name under which this tool is exposed to workflows.
    pub fn qualified_name(&self, server: &str) -> String {
        format!("{server}.{}", self.name)
    }
}

#[cfg(test)]
#[path = "tool_tests.rs"]
mod tests;
