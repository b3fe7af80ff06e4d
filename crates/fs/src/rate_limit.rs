// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-watcher trigger rate limiting, built on the shared
//! token-bucket limiter from `conductor-transport`.

use std::time::Duration;

use conductor_transport::rate_limiter::TokenBucket;

/// Builds the watcher's trigger limiter: `max_per_minute` tokens refill
/// per minute, bucket size 1 (non-blocking acquire; starvation drops
/// the batch rather than waiting).
pub fn build(max_per_minute: u32) -> TokenBucket {
    TokenBucket::new(max_per_minute, Duration::from_secs(60), 1)
}

#[cfg(test)]
#[path = "rate_limit_tests.rs"]
mod tests;
