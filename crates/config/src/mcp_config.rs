// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `mcp.yaml` configuration schema and its merge with
//! per-entry overrides into a [`ServerConfig`].

use std::collections::HashMap;
use std::time::Duration;

use conductor_core::error::ConductorError;
use conductor_core::server_config::{RestartPolicy, ServerConfig};
use serde::{Deserialize, Serialize};

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_restart_attempts() -> u32 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub auto_start: bool,
    pub restart_policy: RestartPolicy,
    pub max_restart_attempts: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            auto_start: false,
            restart_policy: RestartPolicy::Always,
            max_restart_attempts: default_max_restart_attempts(),
        }
    }
}

/// One server's entry in the YAML `servers:` map. Every field besides
/// `command` is optional and falls back to [`Defaults`] when absent.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerEntry {
    pub command: String,
    pub args: Vec<String>,
    pub env: Vec<String>,
    #[serde(with = "humantime_serde::option")]
    pub timeout: Option<Duration>,
    pub auto_start: Option<bool>,
    pub restart_policy: Option<RestartPolicy>,
    pub max_restart_attempts: Option<u32>,
    pub source: Option<String>,
    pub version: Option<String>,
}

impl ServerEntry {
    /// Merges this entry with `name` and the config's `defaults` block
    /// into a fully-resolved, validated [`ServerConfig`].
    pub fn resolve(&self, name: &str, defaults: &Defaults) -> Result<ServerConfig, ConductorError> {
        let config = ServerConfig {
            name: name.to_string(),
            command: self.command.clone(),
            args: self.args.clone(),
            env: self.env.clone(),
            timeout_secs: self.timeout.unwrap_or(defaults.timeout),
            restart_policy: self.restart_policy.unwrap_or(defaults.restart_policy),
            max_restart_attempts: self.max_restart_attempts.unwrap_or(defaults.max_restart_attempts),
            source: self.source.clone(),
            version: self.version.clone(),
            auto_start: self.auto_start.unwrap_or(defaults.auto_start),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Root of `${XDG_CONFIG_HOME}/conductor/mcp.yaml`. An absent file is
/// treated as `McpConfig::default()`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct McpConfig {
    pub servers: HashMap<String, ServerEntry>,
    pub defaults: Defaults,
}

impl McpConfig {
    /// Resolves every registered server entry into a validated
    /// [`ServerConfig`]. Entries that fail validation are reported with
    /// their name attached so callers can surface a useful message.
    pub fn resolve_all(&self) -> Result<HashMap<String, ServerConfig>, ConductorError> {
        let mut resolved = HashMap::with_capacity(self.servers.len());
        for (name, entry) in &self.servers {
            let config = entry
                .resolve(name, &self.defaults)
                .map_err(|e| e.with_operation(&format!("resolving server '{name}'")))?;
            resolved.insert(name.clone(), config);
        }
        Ok(resolved)
    }
}

#[cfg(test)]
#[path = "mcp_config_tests.rs"]
mod tests;
