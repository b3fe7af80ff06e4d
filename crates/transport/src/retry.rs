// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic retry engine: exponential backoff with jitter, `Retry-After`
//! honoring, and cancellation-aware sleeps.

use std::future::Future;
use std::time::Duration;

use conductor_core::error::{ConductorError, ErrorKind};
use rand::Rng;
use tokio_util::sync::CancellationToken;

/// Default retryable HTTP status codes.
pub const DEFAULT_RETRYABLE_STATUS_CODES: &[u16] = &[408, 429, 500, 502, 503, 504];

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_factor: f64,
    pub retryable_status_codes: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            backoff_factor: 2.0,
            retryable_status_codes: DEFAULT_RETRYABLE_STATUS_CODES.to_vec(),
        }
    }
}

impl RetryConfig {
    /// Validates the invariants: `maxAttempts >= 1`,
    /// `initialBackoff > 0`, `maxBackoff >= initialBackoff`,
    /// `backoffFactor >= 1.0`.
    pub fn validate(&self) -> Result<(), ConductorError> {
        if self.max_attempts < 1 {
            return Err(ConductorError::new(
                ErrorKind::Validation,
                "max_attempts must be >= 1",
            ));
        }
        if self.initial_backoff.is_zero() {
            return Err(ConductorError::new(
                ErrorKind::Validation,
                "initial_backoff must be > 0",
            ));
        }
        if self.max_backoff < self.initial_backoff {
            return Err(ConductorError::new(
                ErrorKind::Validation,
                "max_backoff must be >= initial_backoff",
            ));
        }
        if self.backoff_factor < 1.0 {
            return Err(ConductorError::new(
                ErrorKind::Validation,
                "backoff_factor must be >= 1.0",
            ));
        }
        Ok(())
    }

    fn is_retryable(&self, err: &ConductorError) -> bool {
        if err.kind == ErrorKind::Cancelled {
            return false;
        }
        err.retryable
    }

    fn retry_after(&self, err: &ConductorError) -> Option<Duration> {
        err.metadata
            .get("retry_after_secs")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
    }
}

fn backoff_delay(config: &RetryConfig, attempt: u32, retry_after: Option<Duration>) -> Duration {
    let exp = config.backoff_factor.powi((attempt - 1) as i32);
    let scaled = (config.initial_backoff.as_secs_f64() * exp).min(config.max_backoff.as_secs_f64());
    let mut base = Duration::from_secs_f64(scaled.max(0.0));
    if let Some(retry_after) = retry_after {
        base = base.max(retry_after).min(config.max_backoff);
    }
    let jitter_ms = rand::thread_rng().gen_range(0..=100);
    base + Duration::from_millis(jitter_ms)
}

/// Runs `thunk` with retry. `thunk` receives the 1-indexed
/// attempt number. On success, `retry_count` (`attempts - 1`) is
/// returned alongside the value so callers can stamp response metadata.
pub async fn retry<T, F, Fut>(
    cancel: &CancellationToken,
    config: &RetryConfig,
    mut thunk: F,
) -> Result<(T, u32), ConductorError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ConductorError>>,
{
    config.validate()?;
    let mut attempt = 1u32;
    loop {
        if cancel.is_cancelled() {
            return Err(ConductorError::cancelled());
        }
        match thunk(attempt).await {
            Ok(value) => return Ok((value, attempt - 1)),
            Err(err) => {
                if !config.is_retryable(&err) || err.kind == ErrorKind::Cancelled {
                    return Err(err);
                }
                let retry_after = config.retry_after(&err);
                let delay = backoff_delay(config, attempt, retry_after);
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => return Err(ConductorError::cancelled()),
                }
                attempt += 1;
                if attempt > config.max_attempts {
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
