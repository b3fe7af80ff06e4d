// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wraps the [`Supervisor`] with the persistent `mcp.yaml` config and a
//! small `resume.yaml` tracking which servers were running at last
//! shutdown, so a restart brings back the same set.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use conductor_config::{read_tolerant, write_atomic, McpConfig, ServerEntry};
use conductor_core::error::{ConductorError, ErrorKind};
use conductor_core::server_config::ServerConfig;
use conductor_core::server_state::{ServerStatus, SupervisorState};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::connection::McpConnection;
use crate::events::{EventEmitter, ServerEvent};
use crate::supervisor::Supervisor;

/// Which servers were running when the registry was last closed,
/// persisted so a fresh process can resume the same set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ResumeState {
    running: HashSet<String>,
}

impl ResumeState {
    fn load(path: &Path) -> Self {
        read_tolerant(path, |s| serde_yaml::from_str(s)).unwrap_or_default()
    }

    fn save(&self, path: &Path) -> Result<(), ConductorError> {
        let yaml = serde_yaml::to_string(self)
            .map_err(|e| ConductorError::new(ErrorKind::Config, e.to_string()))?;
        write_atomic(path, yaml.as_bytes())
    }
}

/// A server known to the registry, whether or not it's currently
/// running.
#[derive(Debug, Clone)]
pub struct RegisteredServer {
    pub config: ServerConfig,
    pub status: Option<ServerStatus>,
}

/// Counts of registered servers by coarse status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySummary {
    pub total: usize,
    pub running: usize,
    pub stopped: usize,
    pub error: usize,
}

/// Config-and-resume-state-aware front for the [`Supervisor`].
pub struct Registry {
    supervisor: Supervisor,
    emitter: Arc<dyn EventEmitter>,
    resume_path: PathBuf,
    config: Mutex<McpConfig>,
    resume: Mutex<ResumeState>,
}

impl Registry {
    pub fn new(supervisor: Supervisor, emitter: Arc<dyn EventEmitter>, config: McpConfig, resume_path: PathBuf) -> Self {
        let resume = ResumeState::load(&resume_path);
        Self {
            supervisor,
            emitter,
            resume_path,
            config: Mutex::new(config),
            resume: Mutex::new(resume),
        }
    }

    /// Starts every server marked `auto_start` in the config, plus any
    /// server the resume state says was running at last shutdown.
    /// Individual start failures are logged and skipped rather than
    /// aborting the whole startup.
    pub async fn start(&self) -> Result<(), ConductorError> {
        let resolved = self.config.lock().resolve_all()?;
        let resume_names: HashSet<String> = self.resume.lock().running.clone();

        let mut to_start: Vec<String> = resolved
            .keys()
            .filter(|name| resolved[*name].auto_start || resume_names.contains(*name))
            .cloned()
            .collect();
        to_start.sort();

        for name in to_start {
            let config = resolved[&name].clone();
            if let Err(e) = self.supervisor.start(config) {
                tracing::warn!(server = %name, error = %e.message, "failed to start server during registry startup");
                continue;
            }
            self.mark_resume(&name, true);
        }
        self.persist_resume()
    }

    /// Marks every server as not-running and stops them all.
    pub async fn stop(&self) -> Result<(), ConductorError> {
        for name in self.supervisor.running_names() {
            self.mark_resume(&name, false);
        }
        self.persist_resume()?;
        self.supervisor.close().await
    }

    /// Adds or replaces a server's config entry without starting it.
    pub fn register_global(&self, name: &str, entry: ServerEntry) {
        self.config.lock().servers.insert(name.to_string(), entry);
    }

    pub fn unregister_global(&self, name: &str) {
        self.config.lock().servers.remove(name);
    }

    pub fn update_global(&self, name: &str, entry: ServerEntry) -> Result<(), ConductorError> {
        let mut config = self.config.lock();
        if !config.servers.contains_key(name) {
            return Err(
                ConductorError::new(ErrorKind::Validation, format!("server '{name}' is not registered")).retryable(false),
            );
        }
        config.servers.insert(name.to_string(), entry);
        Ok(())
    }

    /// Replaces the in-memory config wholesale, e.g. after an external
    /// edit to `mcp.yaml`.
    pub fn reload(&self, config: McpConfig) {
        *self.config.lock() = config;
    }

    pub async fn start_server(&self, name: &str) -> Result<(), ConductorError> {
        let config = self.resolve_one(name)?;
        self.supervisor.start(config)?;
        self.mark_resume(name, true);
        self.persist_resume()?;
        self.emitter.emit(ServerEvent::Started { server: name.to_string() }).await;
        Ok(())
    }

    pub async fn stop_server(&self, name: &str) -> Result<(), ConductorError> {
        self.supervisor.stop(name).await?;
        self.mark_resume(name, false);
        self.persist_resume()
    }

    pub async fn restart_server(&self, name: &str) -> Result<(), ConductorError> {
        self.supervisor.restart(name)
    }

    pub fn get_client(&self, name: &str) -> Option<Arc<dyn McpConnection>> {
        self.supervisor.get_client(name)
    }

    /// The last `n` captured stdout/stderr log lines for a server.
    pub fn get_logs(&self, name: &str, n: usize) -> Option<Vec<conductor_core::log_entry::LogEntry>> {
        self.supervisor.get_logs(name, n)
    }

    /// Counts of total/running/stopped/error servers. `Starting` and
    /// `Restarting` count as `running`: neither stopped nor errored.
    pub fn get_summary(&self) -> RegistrySummary {
        let servers = self.list_all_servers();
        let mut summary = RegistrySummary { total: servers.len(), ..Default::default() };
        for server in &servers {
            match server.status.as_ref().map(|s| s.state) {
                Some(SupervisorState::Running) | Some(SupervisorState::Starting) | Some(SupervisorState::Restarting) => {
                    summary.running += 1
                }
                Some(SupervisorState::Error) => summary.error += 1,
                Some(SupervisorState::Stopped) | None => summary.stopped += 1,
            }
        }
        summary
    }

    /// Every registered server, running or not, merged with its live
    /// status when available.
    pub fn list_all_servers(&self) -> Vec<RegisteredServer> {
        let config = self.config.lock();
        let statuses: HashMap<String, ServerStatus> = self
            .supervisor
            .list_all_status()
            .into_iter()
            .map(|s| (s.name.clone(), s))
            .collect();

        config
            .servers
            .iter()
            .filter_map(|(name, entry)| {
                let server_config = entry.resolve(name, &config.defaults).ok()?;
                Some(RegisteredServer { status: statuses.get(name).cloned(), config: server_config })
            })
            .collect()
    }

    fn resolve_one(&self, name: &str) -> Result<ServerConfig, ConductorError> {
        let config = self.config.lock();
        let entry = config.servers.get(name).ok_or_else(|| {
            ConductorError::new(ErrorKind::Validation, format!("server '{name}' is not registered")).retryable(false)
        })?;
        entry.resolve(name, &config.defaults)
    }

    fn mark_resume(&self, name: &str, running: bool) {
        let mut resume = self.resume.lock();
        if running {
            resume.running.insert(name.to_string());
        } else {
            resume.running.remove(name);
        }
    }

    fn persist_resume(&self) -> Result<(), ConductorError> {
        self.resume.lock().save(&self.resume_path)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
