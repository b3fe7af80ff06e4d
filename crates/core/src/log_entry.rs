// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log entry type stored by the per-server ring buffer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which stream a [`LogEntry`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSource {
    Stdout,
    Stderr,
}

/// A single log line captured from a supervised child process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub message: String,
    pub source: LogSource,
}

impl LogEntry {
    pub fn new(level: impl Into<String>, message: impl Into<String>, source: LogSource) -> Self {
        Self {
            timestamp: Utc::now(),
            level: level.into(),
            message: crate::redact::redact_text(&message.into()),
            source,
        }
    }

    /// Approximate byte cost of serving this entry: a fixed overhead plus message length.
    pub fn estimated_bytes(&self) -> usize {
        50 + self.message.len()
    }
}
