// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Transport` trait, its plug-in registry, and the request/response
//! shapes shared by every transport implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use conductor_core::error::{ConductorError, ErrorKind};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::rate_limiter::RateLimiter;

#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Request {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub metadata: HashMap<String, String>,
}

/// Validated configuration for constructing a transport via the
/// registry. Implementors correspond one-to-one with a transport type
/// name (e.g. `"aws-sigv4"`, `"http"`).
pub trait TransportConfig: Send + Sync {
    fn validate(&self) -> Result<(), ConductorError>;
    fn transport_type(&self) -> &str;
}

/// A pluggable outbound transport.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(
        &self,
        cancel: &CancellationToken,
        request: &Request,
    ) -> Result<Response, ConductorError>;

    fn name(&self) -> &str;

    fn set_rate_limiter(&self, limiter: Arc<dyn RateLimiter>);
}

type Factory = Box<dyn Fn(&dyn TransportConfig) -> Result<Box<dyn Transport>, ConductorError> + Send + Sync>;

/// Maps transport type names to factory functions.
#[derive(Default)]
pub struct TransportRegistry {
    factories: Mutex<HashMap<String, Factory>>,
}

impl TransportRegistry {
    pub fn new() -> Self {
        Self {
            factories: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a factory under `name`. Fails on double-registration.
    pub fn register(
        &self,
        name: impl Into<String>,
        factory: impl Fn(&dyn TransportConfig) -> Result<Box<dyn Transport>, ConductorError>
            + Send
            + Sync
            + 'static,
    ) -> Result<(), ConductorError> {
        let name = name.into();
        let mut factories = self.factories.lock();
        if factories.contains_key(&name) {
            return Err(ConductorError::new(
                ErrorKind::AlreadyExists,
                format!("transport '{name}' already registered"),
            ));
        }
        factories.insert(name, Box::new(factory));
        Ok(())
    }

    /// Creates a transport instance. Validation order: name
    /// non-empty, config non-nil (callers pass a reference so this is
    /// structural), `config.validate()` succeeds, `config.transport_type()
    /// == name`, a factory is registered under `name`.
    pub fn create(
        &self,
        name: &str,
        config: &dyn TransportConfig,
    ) -> Result<Box<dyn Transport>, ConductorError> {
        if name.is_empty() {
            return Err(ConductorError::new(
                ErrorKind::Validation,
                "transport name must not be empty",
            ));
        }
        config.validate()?;
        if config.transport_type() != name {
            return Err(ConductorError::new(
                ErrorKind::Validation,
                format!(
                    "config transport_type '{}' does not match requested '{name}'",
                    config.transport_type()
                ),
            ));
        }
        let factories = self.factories.lock();
        let factory = factories.get(name).ok_or_else(|| {
            ConductorError::new(ErrorKind::NotFound, format!("no transport registered for '{name}'"))
        })?;
        factory(config)
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
