// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared by the transport, MCP, and file-event
//! subsystems.
//!
//! Every error carries a [`ErrorKind`] and a `retryable` flag computed
//! at construction time and never re-derived by callers.

use std::collections::HashMap;
use thiserror::Error;

use crate::redact::redact_text;

/// Classification of a [`ConductorError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Timeout,
    Network,
    Auth,
    Client,
    Server,
    RateLimit,
    Cancelled,
    Validation,
    Config,
    NotFound,
    AlreadyExists,
    AlreadyRunning,
    NotRunning,
    CommandNotFound,
    StartFailed,
    PingFailed,
    ConnectionClosed,
    Unknown,
}

impl ErrorKind {
    /// Whether this kind is retried by the retry engine in the absence
    /// of a more specific status-code-driven decision.
    pub fn default_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::Timeout | ErrorKind::RateLimit | ErrorKind::Server | ErrorKind::Network
        )
    }
}

/// A user-visible error shape: `{code, message, detail?, suggestions[]}`
/// so CLI/API layers can render actionable help.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ConductorError {
    pub kind: ErrorKind,
    pub message: String,
    pub detail: Option<String>,
    pub suggestions: Vec<String>,
    pub retryable: bool,
    pub metadata: HashMap<String, String>,
}

impl ConductorError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = redact_text(&message.into());
        let retryable = kind.default_retryable();
        Self {
            kind,
            message,
            detail: None,
            suggestions: Vec::new(),
            retryable,
            metadata: HashMap::new(),
        }
    }

    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(redact_text(&detail.into()));
        self
    }

    pub fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), redact_text(&value.into()));
        self
    }

    /// Prefixes the message with an operation name for easier tracing.
    pub fn with_operation(mut self, operation: &str) -> Self {
        self.message = format!("{operation}: {}", self.message);
        self
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "operation cancelled").retryable(false)
    }

    pub fn command_not_found(command: &str) -> Self {
        Self::new(
            ErrorKind::CommandNotFound,
            format!("command '{command}' not found"),
        )
        .retryable(false)
        .suggest(format!(
            "install '{command}' and ensure it is on PATH"
        ))
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
