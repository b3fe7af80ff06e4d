// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! conductor-mcp: subprocess-backed MCP server supervision — the
//! stdio client, per-server lifecycle monitor, supervisor, persistent
//! registry, and source-change watcher.

pub mod client;
pub mod connection;
pub mod events;
pub mod log_ring;
pub mod monitor;
pub mod process_handle;
pub mod registry;
pub mod source_watcher;
pub mod supervisor;

pub use client::{Client, ContentItem, StdioConnector, ToolCallResponse};
pub use connection::{Connector, McpConnection, ServerCapabilities};
pub use events::{EventEmitter, LoggingEmitter, ServerEvent};
pub use log_ring::{LogEntry, LogSource, RingBuffer};
pub use monitor::MonitorHandles;
pub use process_handle::ProcessHandle;
pub use registry::{RegisteredServer, Registry};
pub use source_watcher::SourceWatcher;
pub use supervisor::Supervisor;
