// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `mcp-lock.yaml` schema and its atomic persistence.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use conductor_core::error::ConductorError;
use serde::{Deserialize, Serialize};

use crate::atomic_write::{read_tolerant, write_atomic};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockedServer {
    pub source: String,
    pub constraint: String,
    pub resolved: String,
    pub integrity: String,
    pub command: String,
    pub args: Vec<String>,
    pub locked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lockfile {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub servers: HashMap<String, LockedServer>,
}

impl Default for Lockfile {
    fn default() -> Self {
        Self {
            version: 1,
            generated_at: Utc::now(),
            servers: HashMap::new(),
        }
    }
}

impl Lockfile {
    /// Loads the lockfile, treating a missing or corrupt file as an
    /// empty lockfile.
    pub fn load(path: &Path) -> Self {
        read_tolerant(path, |s| serde_yaml::from_str(s)).unwrap_or_default()
    }

    pub fn save(&self, path: &Path) -> Result<(), ConductorError> {
        let yaml = serde_yaml::to_string(self)
            .map_err(|e| ConductorError::new(conductor_core::error::ErrorKind::Config, e.to_string()))?;
        write_atomic(path, yaml.as_bytes())
    }
}

#[cfg(test)]
#[path = "lockfile_tests.rs"]
mod tests;
