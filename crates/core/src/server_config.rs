// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Immutable, per-server configuration.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ConductorError, ErrorKind};

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]{0,63}$").expect("valid regex"));

/// Shell metacharacter sequences forbidden in command arguments. `${`
/// is included here; env *values* relax this one case to permit
/// `${VAR}` substitution (see [`ServerConfig::validate`]).
const FORBIDDEN_SEQUENCES: &[&str] = &[";", "&&", "||", "|", "`", "$(", "${", "\n", "\r"];

/// Restart behavior for a supervised server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    #[default]
    Always,
    OnFailure,
    Never,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_restart_attempts() -> u32 {
    5
}

fn default_log_buffer_capacity() -> usize {
    1000
}

/// Immutable per-server configuration, validated once at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    /// `KEY=VALUE` pairs; `${VAR}`/`$VAR` substitution is resolved by
    /// the caller before spawning, not by this type.
    pub env: Vec<String>,
    #[serde(with = "humantime_serde", rename = "timeout")]
    pub timeout_secs: std::time::Duration,
    pub restart_policy: RestartPolicy,
    pub max_restart_attempts: u32,
    pub source: Option<String>,
    pub version: Option<String>,
    pub auto_start: bool,
    /// Capacity of this server's per-process stdout/stderr log ring
    /// buffer.
    pub log_buffer_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            command: String::new(),
            args: Vec::new(),
            env: Vec::new(),
            timeout_secs: std::time::Duration::from_secs(default_timeout_secs()),
            restart_policy: RestartPolicy::default(),
            max_restart_attempts: default_max_restart_attempts(),
            source: None,
            version: None,
            auto_start: false,
            log_buffer_capacity: default_log_buffer_capacity(),
        }
    }
}

impl ServerConfig {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            ..Default::default()
        }
    }

    /// Validate name/command/args invariants.
    pub fn validate(&self) -> Result<(), ConductorError> {
        if !NAME_RE.is_match(&self.name) {
            return Err(ConductorError::new(
                ErrorKind::Validation,
                format!("invalid server name: {:?}", self.name),
            )
            .retryable(false)
            .suggest("names must match ^[A-Za-z][A-Za-z0-9_-]{0,63}$"));
        }

        if self.command.trim().is_empty() {
            return Err(
                ConductorError::new(ErrorKind::Validation, "command must not be empty")
                    .retryable(false),
            );
        }

        for arg in &self.args {
            if let Some(seq) = find_forbidden_sequence(arg) {
                return Err(ConductorError::new(
                    ErrorKind::Validation,
                    format!("argument contains forbidden sequence {seq:?}: {arg:?}"),
                )
                .retryable(false));
            }
        }

        for pair in &self.env {
            if let Some((_, value)) = pair.split_once('=') {
                if let Some(seq) = find_forbidden_sequence_allowing_var_sub(value) {
                    return Err(ConductorError::new(
                        ErrorKind::Validation,
                        format!("env value contains forbidden sequence {seq:?}: {pair:?}"),
                    )
                    .retryable(false));
                }
            }
        }

        Ok(())
    }
}

fn find_forbidden_sequence(s: &str) -> Option<&'static str> {
    FORBIDDEN_SEQUENCES.iter().find(|seq| s.contains(*seq)).copied()
}

fn find_forbidden_sequence_allowing_var_sub(s: &str) -> Option<&'static str> {
    FORBIDDEN_SEQUENCES
        .iter()
        .filter(|seq| **seq != "${")
        .find(|seq| s.contains(*seq))
        .copied()
}

#[cfg(test)]
#[path = "server_config_tests.rs"]
mod tests;
