// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Name-keyed collection of lifecycle monitors. Owns no process
//! state directly; each server's monitor task owns its own
//! `ServerState`/`MonitorHandles`, reached here only through their
//! shared `Arc`s so the supervisor's own map lock is never held across
//! an await into a monitor.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use conductor_core::error::{ConductorError, ErrorKind};
use conductor_core::log_entry::LogEntry;
use conductor_core::server_config::ServerConfig;
use conductor_core::server_state::{ServerState, ServerStatus};
use conductor_core::RingBuffer;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::connection::{Connector, McpConnection};
use crate::events::EventEmitter;
use crate::monitor::{self, MonitorHandles};

const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(30);

struct Entry {
    state: Arc<Mutex<ServerState>>,
    handles: Arc<Mutex<MonitorHandles>>,
    logs: Arc<RingBuffer>,
    restart_tx: mpsc::Sender<()>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Manages the running set of MCP server monitors.
pub struct Supervisor {
    entries: Mutex<HashMap<String, Entry>>,
    connector: Arc<dyn Connector>,
    emitter: Arc<dyn EventEmitter>,
    stop_timeout: Duration,
}

impl Supervisor {
    pub fn new(connector: Arc<dyn Connector>, emitter: Arc<dyn EventEmitter>) -> Self {
        Self::with_stop_timeout(connector, emitter, DEFAULT_STOP_TIMEOUT)
    }

    /// Same as [`Supervisor::new`], but with a non-default `StopAll`
    /// grace period before force-killing stragglers.
    pub fn with_stop_timeout(connector: Arc<dyn Connector>, emitter: Arc<dyn EventEmitter>, stop_timeout: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            connector,
            emitter,
            stop_timeout,
        }
    }

    /// Validates and registers `config`, spawning its monitor task.
    /// Fails if a server with this name is already running.
    pub fn start(&self, config: ServerConfig) -> Result<(), ConductorError> {
        config.validate()?;
        let name = config.name.clone();

        let mut entries = self.entries.lock();
        if entries.contains_key(&name) {
            return Err(ConductorError::new(
                ErrorKind::AlreadyExists,
                format!("server '{name}' is already running"),
            )
            .retryable(false));
        }

        let state = Arc::new(Mutex::new(ServerState::new(config.clone())));
        let handles = Arc::new(Mutex::new(MonitorHandles::default()));
        let logs = Arc::new(RingBuffer::new(config.log_buffer_capacity));
        let (restart_tx, restart_rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(monitor::run(
            config,
            state.clone(),
            handles.clone(),
            logs.clone(),
            self.connector.clone(),
            self.emitter.clone(),
            restart_rx,
            cancel.clone(),
        ));

        entries.insert(name, Entry { state, handles, logs, restart_tx, cancel, task });
        Ok(())
    }

    /// Stops and removes a server's monitor, waiting for it to exit.
    pub async fn stop(&self, name: &str) -> Result<(), ConductorError> {
        let entry = self.entries.lock().remove(name);
        let Some(entry) = entry else {
            return Err(
                ConductorError::new(ErrorKind::Validation, format!("server '{name}' is not running"))
                    .retryable(false),
            );
        };
        entry.cancel.cancel();
        let _ = entry.task.await;
        Ok(())
    }

    /// Requests that a running server's monitor cycle through a
    /// restart. Fails if a restart is already pending.
    pub fn restart(&self, name: &str) -> Result<(), ConductorError> {
        let entries = self.entries.lock();
        let entry = entries.get(name).ok_or_else(|| {
            ConductorError::new(ErrorKind::Validation, format!("server '{name}' is not running")).retryable(false)
        })?;
        entry.restart_tx.try_send(()).map_err(|_| {
            ConductorError::new(
                ErrorKind::Validation,
                format!("restart already pending for server '{name}'"),
            )
            .retryable(true)
        })
    }

    /// The server's live connection, if currently running.
    pub fn get_client(&self, name: &str) -> Option<Arc<dyn McpConnection>> {
        let handles = self.entries.lock().get(name)?.handles.clone();
        let handles = handles.lock();
        handles.connection()
    }

    pub fn get_status(&self, name: &str) -> Option<ServerStatus> {
        let state = self.entries.lock().get(name)?.state.clone();
        let state = state.lock();
        Some(state.snapshot())
    }

    /// The last `n` captured log lines for this server, oldest first.
    /// Persists across this server's internal restarts, reset only when
    /// it's `stop`ped and later `start`ed again.
    pub fn get_logs(&self, name: &str, n: usize) -> Option<Vec<LogEntry>> {
        Some(self.entries.lock().get(name)?.logs.last(n))
    }

    pub fn list_all_status(&self) -> Vec<ServerStatus> {
        self.entries.lock().values().map(|entry| entry.state.lock().snapshot()).collect()
    }

    pub fn running_names(&self) -> Vec<String> {
        // Names aren't stored on `Entry` directly; recovered from each
        // state snapshot instead of duplicating the key.
        self.entries.lock().values().map(|entry| entry.state.lock().config.name.clone()).collect()
    }

    /// Stops every running server. Cancels all of them up front, then
    /// waits on every monitor concurrently under one shared stop
    /// timeout rather than one timeout per server; servers that haven't
    /// exited by then are force-killed and their names returned.
    pub async fn stop_all(&self) -> Result<(), ConductorError> {
        let names = self.running_names();
        let mut removed = Vec::new();
        for name in &names {
            if let Some(entry) = self.entries.lock().remove(name) {
                entry.cancel.cancel();
                removed.push((name.clone(), entry));
            }
        }

        let stop_timeout = self.stop_timeout;
        let waiters: Vec<JoinHandle<(String, bool)>> = removed
            .into_iter()
            .map(|(name, entry)| {
                tokio::spawn(async move {
                    let handles = entry.handles.clone();
                    let timed_out = tokio::time::timeout(stop_timeout, entry.task).await.is_err();
                    if timed_out {
                        if let Some(process_handle) = handles.lock().process_handle() {
                            process_handle.kill().await;
                        }
                    }
                    (name, timed_out)
                })
            })
            .collect();

        let mut force_killed = Vec::new();
        for waiter in waiters {
            if let Ok((name, true)) = waiter.await {
                force_killed.push(name);
            }
        }

        if force_killed.is_empty() {
            Ok(())
        } else {
            Err(ConductorError::new(
                ErrorKind::Timeout,
                format!("force-killed servers that did not stop in time: {}", force_killed.join(", ")),
            ))
        }
    }

    /// Cancels everything and waits for all monitors to exit. Shares
    /// `stop_all`'s force-kill behavior.
    pub async fn close(&self) -> Result<(), ConductorError> {
        self.stop_all().await
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
