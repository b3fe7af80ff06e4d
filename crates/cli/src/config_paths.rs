// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolves where `mcp.yaml` and the supervisor's resume-state file
//! live, defaulting to the platform config directory.

use std::path::PathBuf;

use anyhow::{Context, Result};

pub struct ConfigPaths {
    pub mcp_config: PathBuf,
    pub resume_state: PathBuf,
}

/// `override_path` takes precedence over `CONDUCTOR_CONFIG_DIR`, which
/// takes precedence over `dirs::config_dir()/conductor`.
pub fn resolve(override_path: Option<PathBuf>) -> Result<ConfigPaths> {
    if let Some(mcp_config) = override_path {
        let resume_state = mcp_config.with_file_name("resume.yaml");
        return Ok(ConfigPaths { mcp_config, resume_state });
    }

    let base = match std::env::var_os("CONDUCTOR_CONFIG_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => dirs::config_dir().context("could not determine a platform config directory")?.join("conductor"),
    };

    Ok(ConfigPaths { mcp_config: base.join("mcp.yaml"), resume_state: base.join("resume.yaml") })
}
