// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rate limiter seam shared by transports and the file-event pipeline.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use conductor_core::error::ConductorError;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// A rate limiter that transports/watchers acquire a permit from before
/// doing work. Must honor cancellation.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn wait(&self, cancel: &CancellationToken) -> Result<(), ConductorError>;
}

/// Token-bucket limiter: `rate` tokens refill per `per`, capped at
/// `burst`. Used both for outbound transport throttling and the
/// file-event pipeline's per-watcher trigger cap.
pub struct TokenBucket {
    inner: Mutex<BucketState>,
    rate: f64,
    burst: f64,
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// `rate_per_period` tokens become available every `period`;
    /// `burst` is the maximum tokens the bucket can hold.
    pub fn new(rate_per_period: u32, period: Duration, burst: u32) -> Self {
        let rate = rate_per_period as f64 / period.as_secs_f64().max(f64::EPSILON);
        Self {
            inner: Mutex::new(BucketState {
                tokens: burst as f64,
                last_refill: Instant::now(),
            }),
            rate,
            burst: burst as f64,
        }
    }

    /// Attempts to take one token without blocking. Returns `false` if
    /// the bucket is empty (caller should treat this as starvation).
    pub fn try_acquire(&self) -> bool {
        let mut state = self.inner.lock();
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate).min(self.burst);
        state.last_refill = now;
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl RateLimiter for TokenBucket {
    async fn wait(&self, cancel: &CancellationToken) -> Result<(), ConductorError> {
        loop {
            if cancel.is_cancelled() {
                return Err(ConductorError::cancelled());
            }
            if self.try_acquire() {
                return Ok(());
            }
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(25)) => {}
                _ = cancel.cancelled() => return Err(ConductorError::cancelled()),
            }
        }
    }
}

/// A limiter that never blocks; the default for transports/watchers
/// with no configured limit.
pub struct NoopLimiter;

#[async_trait]
impl RateLimiter for NoopLimiter {
    async fn wait(&self, _cancel: &CancellationToken) -> Result<(), ConductorError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "rate_limiter_tests.rs"]
mod tests;
