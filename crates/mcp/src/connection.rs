// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transport-agnostic seam between the lifecycle monitor and a live
//! MCP connection, so the monitor's state machine can be
//! exercised against a stub without spawning a real subprocess.

use std::sync::Arc;

use async_trait::async_trait;
use conductor_core::error::ConductorError;
use conductor_core::server_config::ServerConfig;
use conductor_core::tool::ToolDefinition;
use conductor_core::RingBuffer;
use serde_json::Value;

use crate::client::ToolCallResponse;
use crate::process_handle::ProcessHandle;

/// Flags and sub-capabilities the server declared during `initialize`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerCapabilities {
    pub tools: bool,
    pub resources: bool,
    pub prompts: bool,
}

/// A live connection to one MCP server, however it was established.
#[async_trait]
pub trait McpConnection: Send + Sync {
    async fn ping(&self) -> Result<(), ConductorError>;
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ConductorError>;
    async fn call_tool(&self, name: &str, args: Value) -> Result<ToolCallResponse, ConductorError>;
    async fn list_resources(&self) -> Result<Vec<Value>, ConductorError>;
    async fn read_resource(&self, uri: &str) -> Result<Value, ConductorError>;
    async fn close(&self);
    fn process_handle(&self) -> ProcessHandle;
    fn capabilities(&self) -> ServerCapabilities;
}

/// Establishes a [`McpConnection`] for a given server config. Production
/// code uses [`crate::client::StdioConnector`]; tests use a stub.
///
/// `logs` is the server's own log ring buffer, owned by the
/// monitor and passed down so it survives reconnects across restarts;
/// a stdio connection feeds its child's stderr lines into it.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        config: &ServerConfig,
        logs: Arc<RingBuffer>,
    ) -> Result<Arc<dyn McpConnection>, ConductorError>;
}
