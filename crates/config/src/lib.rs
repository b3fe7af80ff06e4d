// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! conductor-config: the `mcp.yaml` configuration schema, the
//! `mcp-lock.yaml` lockfile, the semver constraint grammar, and atomic
//! file persistence.

pub mod atomic_write;
pub mod lockfile;
pub mod mcp_config;
pub mod semver;

pub use atomic_write::{read_tolerant, write_atomic};
pub use lockfile::{Lockfile, LockedServer};
pub use mcp_config::{Defaults, McpConfig, ServerEntry};
pub use semver::{Constraint, Version};
