// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-server source file watching, independent of the main
//! file-event pipeline: when a watched path changes, the owning
//! server(s) are debounced-restarted rather than force-killed.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use conductor_core::error::{ConductorError, ErrorKind};
use conductor_fs::sandbox::PathSandbox;
use conductor_fs::{DebounceMode, Debouncer};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::supervisor::Supervisor;

const DEFAULT_RESTART_DEBOUNCE: Duration = Duration::from_millis(200);

struct WatchedPath {
    _notifier: RecommendedWatcher,
    servers: HashSet<String>,
}

struct Inner {
    paths: HashMap<PathBuf, WatchedPath>,
}

/// Watches each server's source path(s), ref-counted so multiple
/// servers sharing a path share one underlying notifier, and restarts
/// the owning server(s) on a debounced timer after a change. Dropping
/// the last watched path's notifier stops its forwarding task; no
/// separate shutdown signal is needed per-path.
pub struct SourceWatcher {
    inner: Arc<Mutex<Inner>>,
    debouncer: Arc<Debouncer<String, ()>>,
}

impl SourceWatcher {
    pub fn new(supervisor: Arc<Supervisor>) -> Self {
        Self::with_debounce(supervisor, DEFAULT_RESTART_DEBOUNCE)
    }

    pub fn with_debounce(supervisor: Arc<Supervisor>, window: Duration) -> Self {
        let debouncer = Arc::new(Debouncer::new(DebounceMode::LastWins, window, move |server: String, _events: Vec<()>| {
            let supervisor = supervisor.clone();
            tokio::spawn(async move {
                if let Err(e) = supervisor.restart(&server) {
                    tracing::debug!(server = %server, error = %e.message, "source-triggered restart not issued");
                }
            });
        }));

        Self { inner: Arc::new(Mutex::new(Inner { paths: HashMap::new() })), debouncer }
    }

    /// Registers `server` as interested in changes under `path`.
    /// Reuses an existing notifier for `path` if another server is
    /// already watching it.
    pub fn watch(&self, server: &str, path: &str) -> Result<(), ConductorError> {
        let resolved = PathSandbox::normalize(path)?;
        let mut inner = self.inner.lock();

        if let Some(entry) = inner.paths.get_mut(&resolved) {
            entry.servers.insert(server.to_string());
            return Ok(());
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut notifier = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = tx.send(res);
            },
            notify::Config::default(),
        )
        .map_err(|e| ConductorError::new(ErrorKind::Config, format!("failed to start source notifier: {e}")))?;
        notifier
            .watch(&resolved, RecursiveMode::NonRecursive)
            .map_err(|e| ConductorError::new(ErrorKind::Config, format!("failed to watch {}: {e}", resolved.display())))?;

        let forward_inner = self.inner.clone();
        let forward_debouncer = self.debouncer.clone();
        let forward_path = resolved.clone();
        tokio::spawn(async move {
            while let Some(result) = rx.recv().await {
                match result {
                    Ok(event) => handle_event(&forward_inner, &forward_debouncer, &forward_path, &event),
                    Err(e) => tracing::warn!(path = %forward_path.display(), error = %e, "source watcher notify error"),
                }
            }
        });

        let mut servers = HashSet::new();
        servers.insert(server.to_string());
        inner.paths.insert(resolved, WatchedPath { _notifier: notifier, servers });
        Ok(())
    }

    /// Removes `server`'s interest in `path`. The underlying notifier,
    /// and the forwarding task reading from it, are dropped once no
    /// server is left watching it.
    pub fn unwatch(&self, server: &str, path: &str) {
        let Ok(resolved) = PathSandbox::normalize(path) else { return };
        let mut inner = self.inner.lock();
        let Some(entry) = inner.paths.get_mut(&resolved) else { return };
        entry.servers.remove(server);
        if entry.servers.is_empty() {
            inner.paths.remove(&resolved);
        }
    }

    pub fn watched_paths(&self) -> Vec<String> {
        self.inner.lock().paths.keys().map(|p| p.display().to_string()).collect()
    }

    /// Drops every watched path (stopping all notifiers and forwarding
    /// tasks) and flushes the restart debouncer.
    pub fn close(&self) {
        self.inner.lock().paths.clear();
        self.debouncer.stop();
    }
}

fn handle_event(inner: &Arc<Mutex<Inner>>, debouncer: &Arc<Debouncer<String, ()>>, watched_path: &Path, event: &Event) {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return;
    }
    let servers: Vec<String> = {
        let guard = inner.lock();
        match guard.paths.get(watched_path) {
            Some(entry) => entry.servers.iter().cloned().collect(),
            None => return,
        }
    };
    for server in servers {
        let _ = debouncer.add(server, ());
    }
}

#[cfg(test)]
#[path = "source_watcher_tests.rs"]
mod tests;
