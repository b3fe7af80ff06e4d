// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime state and read-only status snapshot for a supervised server.
//! The client/process handles themselves live in `conductor-mcp`
//! since `conductor-core` has no process-management dependency; this
//! module owns the state machine's *data*, not its transport.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::server_config::ServerConfig;

/// Lifecycle state of a supervised server's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorState {
    Stopped,
    Starting,
    Running,
    Restarting,
    Error,
}

/// Mutable runtime metadata owned by a server's monitor routine.
///
/// Only the monitor routine mutates `state`/`last_error`/etc.; external
/// readers obtain a [`ServerStatus`] snapshot instead of touching this
/// directly.
#[derive(Debug, Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub state: SupervisorState,
    pub last_error: Option<String>,
    /// Consecutive startup failures since the last successful `Running`.
    pub failure_count: u32,
    pub last_failure: Option<DateTime<Utc>>,
    /// Reset to 0 on successful transition to `Running`.
    pub restart_count: u32,
    pub started_at: Option<DateTime<Utc>>,
    /// `None` means unknown (not yet queried or query failed).
    pub tool_count: Option<usize>,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            state: SupervisorState::Stopped,
            last_error: None,
            failure_count: 0,
            last_failure: None,
            restart_count: 0,
            started_at: None,
            tool_count: None,
        }
    }

    /// Transition to `Running`, resetting failure/restart counters.
    pub fn mark_running(&mut self) {
        self.state = SupervisorState::Running;
        self.started_at = Some(Utc::now());
        self.failure_count = 0;
        self.restart_count = 0;
        self.last_error = None;
    }

    pub fn mark_error(&mut self, message: String) {
        self.state = SupervisorState::Error;
        self.failure_count += 1;
        self.restart_count += 1;
        self.last_failure = Some(Utc::now());
        self.last_error = Some(message);
    }

    pub fn mark_stopped(&mut self) {
        self.state = SupervisorState::Stopped;
        self.started_at = None;
        self.tool_count = None;
    }

    pub fn mark_restarting(&mut self) {
        self.state = SupervisorState::Restarting;
        self.tool_count = None;
    }

    pub fn snapshot(&self) -> ServerStatus {
        ServerStatus {
            name: self.config.name.clone(),
            state: self.state,
            started_at: self.started_at,
            last_error: self.last_error.clone(),
            failure_count: self.failure_count,
            restart_count: self.restart_count,
            tool_count: self.tool_count,
        }
    }
}

/// Read-only projection emitted by the registry; never shares mutable
/// state with the monitor routine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub name: String,
    pub state: SupervisorState,
    pub started_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub failure_count: u32,
    pub restart_count: u32,
    pub tool_count: Option<usize>,
}

#[cfg(test)]
#[path = "server_state_tests.rs"]
mod tests;
