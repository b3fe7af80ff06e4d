// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic write-temp-and-rename persistence for config and lockfiles.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use conductor_core::error::{ConductorError, ErrorKind};

#[cfg(unix)]
fn set_owner_only_permissions(file: &File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn set_owner_only_permissions(_file: &File) -> std::io::Result<()> {
    Ok(())
}

/// Writes `contents` to `path` by writing to a sibling `.tmp` file,
/// syncing, and renaming over the destination. Creates parent
/// directories as needed. Mode 0600 on unix.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ConductorError> {
    let parent = path.parent().ok_or_else(|| {
        ConductorError::new(ErrorKind::Config, format!("path has no parent directory: {}", path.display()))
    })?;
    fs::create_dir_all(parent).map_err(|e| io_error(path, e))?;

    let tmp_path = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp_path).map_err(|e| io_error(&tmp_path, e))?;
        set_owner_only_permissions(&file).map_err(|e| io_error(&tmp_path, e))?;
        file.write_all(contents).map_err(|e| io_error(&tmp_path, e))?;
        file.sync_all().map_err(|e| io_error(&tmp_path, e))?;
    }
    fs::rename(&tmp_path, path).map_err(|e| io_error(path, e))?;
    Ok(())
}

/// Reads `path`, treating a missing or unparseable file as `None`
/// rather than an error.
pub fn read_tolerant<T, F>(path: &Path, parse: F) -> Option<T>
where
    F: FnOnce(&str) -> Result<T, serde_yaml::Error>,
{
    let text = fs::read_to_string(path).ok()?;
    parse(&text).ok()
}

fn io_error(path: &Path, err: std::io::Error) -> ConductorError {
    ConductorError::new(ErrorKind::Config, format!("{}: {err}", path.display()))
}

#[cfg(test)]
#[path = "atomic_write_tests.rs"]
mod tests;
