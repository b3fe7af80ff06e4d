// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle events emitted by the monitor, supervisor, and registry
//! delivered through an injected [`EventEmitter`].

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Started { server: String },
    Stopped { server: String },
    Failed { server: String, error: String },
    Restarting { server: String },
    ToolsChanged { server: String, tool_count: usize },
    Healthy { server: String },
    Unhealthy { server: String, error: String },
}

impl ServerEvent {
    pub fn server_name(&self) -> &str {
        match self {
            ServerEvent::Started { server }
            | ServerEvent::Stopped { server }
            | ServerEvent::Failed { server, .. }
            | ServerEvent::Restarting { server }
            | ServerEvent::ToolsChanged { server, .. }
            | ServerEvent::Healthy { server }
            | ServerEvent::Unhealthy { server, .. } => server,
        }
    }
}

#[async_trait]
pub trait EventEmitter: Send + Sync {
    async fn emit(&self, event: ServerEvent);
}

/// Default emitter: structured-logs every event.
pub struct LoggingEmitter;

#[async_trait]
impl EventEmitter for LoggingEmitter {
    async fn emit(&self, event: ServerEvent) {
        match event {
            ServerEvent::Started { server } => tracing::info!(server, "mcp server started"),
            ServerEvent::Stopped { server } => tracing::info!(server, "mcp server stopped"),
            ServerEvent::Failed { server, error } => tracing::warn!(server, error, "mcp server failed"),
            ServerEvent::Restarting { server } => tracing::info!(server, "mcp server restarting"),
            ServerEvent::ToolsChanged { server, tool_count } => {
                tracing::debug!(server, tool_count, "mcp server tool list changed")
            }
            ServerEvent::Healthy { server } => tracing::debug!(server, "mcp server healthy"),
            ServerEvent::Unhealthy { server, error } => {
                tracing::warn!(server, error, "mcp server unhealthy")
            }
        }
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
