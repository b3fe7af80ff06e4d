// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-event context passed through the file-event pipeline and
//! JSON-serialized into workflow inputs as `trigger.file`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Normalized filesystem event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileEvent {
    Created,
    Modified,
    Deleted,
    Renamed,
}

/// Snapshot of a filesystem change, created on each raw notification
/// and passed by value through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileContext {
    pub path: String,
    pub name: String,
    pub dir: String,
    pub ext: String,
    pub event: FileEvent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
    pub size: u64,
    pub mtime: DateTime<Utc>,
    pub is_dir: bool,
}

impl FileContext {
    /// Build a context for a `deleted` event, where size/mtime are
    /// zeroed since the file can no longer be stat'd.
    pub fn deleted(path: &std::path::Path) -> Self {
        Self::from_parts(path, FileEvent::Deleted, None, 0, DateTime::<Utc>::UNIX_EPOCH, false)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        path: &std::path::Path,
        event: FileEvent,
        old_path: Option<String>,
        size: u64,
        mtime: DateTime<Utc>,
        is_dir: bool,
    ) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dir = path
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            path: path.to_string_lossy().into_owned(),
            name,
            dir,
            ext,
            event,
            old_path,
            size,
            mtime,
            is_dir,
        }
    }

    /// The file's basename, used by the pattern matcher's basename pass.
    pub fn basename(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
#[path = "file_context_tests.rs"]
mod tests;
