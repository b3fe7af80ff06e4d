// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One long-running routine per registered server, implementing the
//! state machine: Stopped → Starting → Running ⇄ Restarting, with
//! a capped exponential backoff on repeated failures.

use std::sync::Arc;
use std::time::Duration;

use conductor_core::error::ConductorError;
use conductor_core::server_config::{RestartPolicy, ServerConfig};
use conductor_core::server_state::ServerState;
use conductor_core::RingBuffer;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::connection::{Connector, McpConnection};
use crate::events::{EventEmitter, ServerEvent};
use crate::process_handle::ProcessHandle;

const PING_TIMEOUT: Duration = Duration::from_secs(5);
const BACKOFF_CAP: Duration = Duration::from_secs(30);

/// Shared slot through which the Supervisor reaches a running monitor's
/// live connection and process handle without holding the monitor's
/// own state lock.
#[derive(Default)]
pub struct MonitorHandles {
    connection: Option<Arc<dyn McpConnection>>,
    process_handle: Option<ProcessHandle>,
}

impl MonitorHandles {
    pub fn connection(&self) -> Option<Arc<dyn McpConnection>> {
        self.connection.clone()
    }

    pub fn process_handle(&self) -> Option<ProcessHandle> {
        self.process_handle.clone()
    }
}

/// Backoff for the `n`th consecutive failure (1-indexed): `min(2^(n-1), 30s)`.
fn backoff_for(failure_count: u32) -> Duration {
    if failure_count == 0 {
        return Duration::ZERO;
    }
    let secs = 1u64.checked_shl(failure_count - 1).unwrap_or(u64::MAX);
    Duration::from_secs(secs).min(BACKOFF_CAP)
}

/// Interruptible sleep; returns `false` if cancelled before the delay
/// elapsed.
async fn interruptible_sleep(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = cancel.cancelled() => false,
    }
}

/// Runs the monitor loop for one server until stopped or cancelled.
/// Spawned once per `Supervisor::start`.
pub async fn run(
    config: ServerConfig,
    state: Arc<Mutex<ServerState>>,
    handles: Arc<Mutex<MonitorHandles>>,
    logs: Arc<RingBuffer>,
    connector: Arc<dyn Connector>,
    emitter: Arc<dyn EventEmitter>,
    mut restart_rx: mpsc::Receiver<()>,
    cancel: CancellationToken,
) {
    let name = config.name.clone();

    'lifecycle: loop {
        state.lock().state = conductor_core::server_state::SupervisorState::Starting;

        let connection = match connector.connect(&config, logs.clone()).await {
            Ok(connection) => connection,
            Err(e) => {
                if handle_failure(&config, &state, &emitter, &cancel, e).await.is_break() {
                    break 'lifecycle;
                }
                continue 'lifecycle;
            }
        };

        if let Err(e) = ping_with_timeout(&connection).await {
            connection.close().await;
            if handle_failure(&config, &state, &emitter, &cancel, e).await.is_break() {
                break 'lifecycle;
            }
            continue 'lifecycle;
        }

        let tool_count = match tokio::time::timeout(Duration::from_secs(2), connection.list_tools()).await {
            Ok(Ok(tools)) => Some(tools.len()),
            Ok(Err(e)) => {
                tracing::warn!(server = %name, error = %e.message, "listTools failed during startup");
                None
            }
            Err(_) => {
                tracing::warn!(server = %name, "listTools timed out during startup");
                None
            }
        };

        {
            let mut guard = handles.lock();
            guard.connection = Some(connection.clone());
            guard.process_handle = Some(connection.process_handle());
        }
        {
            let mut guard = state.lock();
            guard.mark_running();
            guard.tool_count = tool_count;
        }
        emitter.emit(ServerEvent::Started { server: name.clone() }).await;

        tokio::select! {
            _ = restart_rx.recv() => {
                connection.close().await;
                {
                    let mut guard = handles.lock();
                    guard.connection = None;
                    guard.process_handle = None;
                }
                state.lock().mark_restarting();
                emitter.emit(ServerEvent::Restarting { server: name.clone() }).await;
                continue 'lifecycle;
            }
            _ = cancel.cancelled() => {
                connection.close().await;
                {
                    let mut guard = handles.lock();
                    guard.connection = None;
                    guard.process_handle = None;
                }
                state.lock().mark_stopped();
                emitter.emit(ServerEvent::Stopped { server: name.clone() }).await;
                break 'lifecycle;
            }
        }
    }
}

enum LoopControl {
    Continue,
    Break,
}

impl LoopControl {
    fn is_break(&self) -> bool {
        matches!(self, LoopControl::Break)
    }
}

/// Applies the restart policy on a startup/ping failure: records the
/// failure, decides whether the monitor should terminate, and sleeps
/// the backoff interval when it should retry.
async fn handle_failure(
    config: &ServerConfig,
    state: &Arc<Mutex<ServerState>>,
    emitter: &Arc<dyn EventEmitter>,
    cancel: &CancellationToken,
    error: ConductorError,
) -> LoopControl {
    let failure_count = {
        let mut guard = state.lock();
        guard.mark_error(error.message.clone());
        guard.failure_count
    };
    emitter
        .emit(ServerEvent::Failed { server: config.name.clone(), error: error.message.clone() })
        .await;

    if config.restart_policy == RestartPolicy::Never {
        state.lock().mark_stopped();
        return LoopControl::Break;
    }

    if config.max_restart_attempts > 0 && failure_count >= config.max_restart_attempts {
        state.lock().mark_stopped();
        return LoopControl::Break;
    }

    let delay = backoff_for(failure_count);
    if !interruptible_sleep(delay, cancel).await {
        state.lock().mark_stopped();
        return LoopControl::Break;
    }
    LoopControl::Continue
}

async fn ping_with_timeout(connection: &Arc<dyn McpConnection>) -> Result<(), ConductorError> {
    match tokio::time::timeout(PING_TIMEOUT, connection.ping()).await {
        Ok(result) => result,
        Err(_) => Err(ConductorError::new(
            conductor_core::error::ErrorKind::Timeout,
            "ping timed out",
        )),
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
