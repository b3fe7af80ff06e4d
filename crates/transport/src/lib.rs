// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! conductor-transport: the outbound transport abstraction, its retry
//! engine, rate limiting, and a plain HTTP implementation.

pub mod http;
pub mod rate_limiter;
pub mod retry;
pub mod transport;

pub use http::{HttpTransport, HttpTransportConfig};
pub use rate_limiter::{NoopLimiter, RateLimiter, TokenBucket};
pub use retry::{retry, RetryConfig, DEFAULT_RETRYABLE_STATUS_CODES};
pub use transport::{Request, Response, Transport, TransportConfig, TransportRegistry};
