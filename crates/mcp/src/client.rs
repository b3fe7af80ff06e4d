// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stdio-transport MCP client: owns one child process and
//! speaks line-delimited JSON-RPC over its stdio pipes.

use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use conductor_core::error::{ConductorError, ErrorKind};
use conductor_core::log_entry::{LogEntry, LogSource};
use conductor_core::server_config::ServerConfig;
use conductor_core::tool::ToolDefinition;
use conductor_core::RingBuffer;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

use crate::connection::{Connector, McpConnection, ServerCapabilities};
use crate::process_handle::ProcessHandle;

const PROTOCOL_VERSION: &str = "2024-11-05";
const CLIENT_NAME: &str = "conductor";
const LIST_TOOLS_TIMEOUT: Duration = Duration::from_secs(2);

/// A single content item in a tool-call result, discriminated by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentItem {
    Text { text: String },
    Image { data: String, #[serde(rename = "mimeType")] mime_type: String },
    Resource { resource: Value },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolCallResponse {
    #[serde(default)]
    pub content: Vec<ContentItem>,
    #[serde(default, rename = "isError")]
    pub is_error: bool,
}

struct Pipes {
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// Owns one MCP server's child process and stdio pipes.
pub struct Client {
    child: Arc<Mutex<Option<Child>>>,
    pipes: Mutex<Option<Pipes>>,
    next_id: AtomicU64,
    timeout: Duration,
    capabilities: ServerCapabilities,
}

impl Client {
    /// Spawns the process and performs the `initialize` handshake;
    /// closes the pipes and reaps the process on failure. `logs`
    /// receives every stderr line the child prints, tagged
    /// [`LogSource::Stderr`] - stdout is reserved for the JSON-RPC
    /// stream and isn't captured as a log source.
    pub async fn new(config: &ServerConfig, logs: Arc<RingBuffer>) -> Result<Self, ConductorError> {
        let mut command = Command::new(&config.command);
        command
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for pair in &config.env {
            if let Some((key, value)) = pair.split_once('=') {
                command.env(key, value);
            }
        }

        let mut child = command.spawn().map_err(|e| {
            ConductorError::new(
                ErrorKind::CommandNotFound,
                format!("failed to spawn '{}': {e}", config.command),
            )
            .retryable(false)
        })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            ConductorError::new(ErrorKind::StartFailed, "child process has no stdin")
                .retryable(false)
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            ConductorError::new(ErrorKind::StartFailed, "child process has no stdout")
                .retryable(false)
        })?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(capture_stderr(stderr, logs));
        }

        let mut client = Self {
            child: Arc::new(Mutex::new(Some(child))),
            pipes: Mutex::new(Some(Pipes { stdin, stdout: BufReader::new(stdout) })),
            next_id: AtomicU64::new(1),
            timeout: config.timeout_secs,
            capabilities: ServerCapabilities::default(),
        };

        match client.initialize().await {
            Ok(capabilities) => {
                client.capabilities = capabilities;
                Ok(client)
            }
            Err(e) => {
                client.close().await;
                Err(e)
            }
        }
    }

    async fn initialize(&self) -> Result<ServerCapabilities, ConductorError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": { "name": CLIENT_NAME, "version": env!("CARGO_PKG_VERSION") },
        });
        let result = self.request("initialize", params, self.timeout).await?;
        let caps = result.get("capabilities").cloned().unwrap_or(Value::Null);
        Ok(ServerCapabilities {
            tools: caps.get("tools").is_some(),
            resources: caps.get("resources").is_some(),
            prompts: caps.get("prompts").is_some(),
        })
    }

    async fn request(&self, method: &str, params: Value, timeout: Duration) -> Result<Value, ConductorError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let mut line = serde_json::to_string(&request).map_err(|e| {
            ConductorError::new(ErrorKind::Client, format!("failed to encode request: {e}"))
        })?;
        line.push('\n');

        let response = tokio::time::timeout(timeout, self.send_and_receive(&line))
            .await
            .map_err(|_| {
                ConductorError::new(ErrorKind::Timeout, format!("{method} timed out after {timeout:?}"))
            })??;

        if let Some(error) = response.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("mcp server error");
            return Err(ConductorError::new(ErrorKind::Server, message.to_string()));
        }
        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    }

    async fn send_and_receive(&self, line: &str) -> Result<Value, ConductorError> {
        let mut guard = self.pipes.lock().await;
        let pipes = guard.as_mut().ok_or_else(|| {
            ConductorError::new(ErrorKind::ConnectionClosed, "mcp client is closed").retryable(false)
        })?;

        pipes.stdin.write_all(line.as_bytes()).await.map_err(classify_io_error)?;
        pipes.stdin.flush().await.map_err(classify_io_error)?;

        let mut response_line = String::new();
        let bytes_read = pipes
            .stdout
            .read_line(&mut response_line)
            .await
            .map_err(classify_io_error)?;
        if bytes_read == 0 {
            return Err(
                ConductorError::new(ErrorKind::ConnectionClosed, "mcp server closed stdout").retryable(false),
            );
        }

        serde_json::from_str(&response_line).map_err(|e| {
            ConductorError::new(ErrorKind::Client, format!("invalid json-rpc response: {e}"))
        })
    }
}

/// Drains the child's stderr into its log ring buffer, one line per
/// entry, until the pipe closes.
async fn capture_stderr(stderr: ChildStderr, logs: Arc<RingBuffer>) {
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => logs.add(LogEntry::new("info", line, LogSource::Stderr)),
            Ok(None) | Err(_) => break,
        }
    }
}

fn classify_io_error(e: std::io::Error) -> ConductorError {
    if matches!(e.kind(), std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::BrokenPipe) {
        ConductorError::new(ErrorKind::ConnectionClosed, format!("mcp connection closed: {e}"))
            .retryable(false)
    } else {
        ConductorError::new(ErrorKind::Network, format!("mcp io error: {e}"))
    }
}

#[async_trait]
impl McpConnection for Client {
    async fn ping(&self) -> Result<(), ConductorError> {
        self.request("ping", Value::Object(Default::default()), self.timeout)
            .await
            .map_err(|e| {
                if e.kind == ErrorKind::ConnectionClosed {
                    e
                } else {
                    ConductorError::new(ErrorKind::PingFailed, e.message.clone())
                }
            })
            .map(|_| ())
    }

    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ConductorError> {
        let result = self
            .request("tools/list", Value::Object(Default::default()), LIST_TOOLS_TIMEOUT)
            .await?;
        let raw_tools = result.get("tools").and_then(Value::as_array).cloned().unwrap_or_default();
        Ok(raw_tools
            .into_iter()
            .map(|tool| {
                let name = tool.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
                let description = tool
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let input_schema = tool.get("inputSchema").cloned().unwrap_or(Value::Null);
                ToolDefinition::new(name, description, input_schema)
            })
            .collect())
    }

    async fn call_tool(&self, name: &str, args: Value) -> Result<ToolCallResponse, ConductorError> {
        let params = json!({ "name": name, "arguments": args });
        let result = self.request("tools/call", params, self.timeout).await?;
        serde_json::from_value(result).map_err(|e| {
            ConductorError::new(ErrorKind::Client, format!("invalid tool call response: {e}"))
        })
    }

    async fn list_resources(&self) -> Result<Vec<Value>, ConductorError> {
        if !self.capabilities.resources {
            return Err(
                ConductorError::new(ErrorKind::Client, "server does not support resources").retryable(false),
            );
        }
        let result = self
            .request("resources/list", Value::Object(Default::default()), self.timeout)
            .await?;
        Ok(result.get("resources").and_then(Value::as_array).cloned().unwrap_or_default())
    }

    async fn read_resource(&self, uri: &str) -> Result<Value, ConductorError> {
        if !self.capabilities.resources {
            return Err(
                ConductorError::new(ErrorKind::Client, "server does not support resources").retryable(false),
            );
        }
        self.request("resources/read", json!({ "uri": uri }), self.timeout).await
    }

    async fn close(&self) {
        *self.pipes.lock().await = None;
        let mut guard = self.child.lock().await;
        if let Some(mut child) = guard.take() {
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
    }

    fn process_handle(&self) -> ProcessHandle {
        ProcessHandle::new(self.child.clone())
    }

    fn capabilities(&self) -> ServerCapabilities {
        self.capabilities
    }
}

/// Production [`Connector`]: spawns a real subprocess per server.
pub struct StdioConnector;

#[async_trait]
impl Connector for StdioConnector {
    async fn connect(
        &self,
        config: &ServerConfig,
        logs: Arc<RingBuffer>,
    ) -> Result<Arc<dyn McpConnection>, ConductorError> {
        let client = Client::new(config, logs).await?;
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
