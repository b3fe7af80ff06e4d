// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A plain bearer-token HTTP transport, registered as `"http"`. Simpler
//! sibling of the AWS SigV4 transport in `conductor-aws`, for admin
//! surfaces or servers that need no request signing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use conductor_core::error::{ConductorError, ErrorKind};
use parking_lot::Mutex;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::rate_limiter::{NoopLimiter, RateLimiter};
use crate::transport::{Request, Response, Transport, TransportConfig};

#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    pub base_url: String,
    pub bearer_token: Option<String>,
    pub timeout: Duration,
}

impl TransportConfig for HttpTransportConfig {
    fn validate(&self) -> Result<(), ConductorError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConductorError::new(
                ErrorKind::Validation,
                "base_url must start with http:// or https://",
            ));
        }
        Ok(())
    }

    fn transport_type(&self) -> &str {
        "http"
    }
}

pub struct HttpTransport {
    client: Client,
    config: HttpTransportConfig,
    limiter: Mutex<Arc<dyn RateLimiter>>,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Result<Self, ConductorError> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConductorError::new(ErrorKind::Config, format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            config,
            limiter: Mutex::new(Arc::new(NoopLimiter)),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, cancel: &CancellationToken, request: &Request) -> Result<Response, ConductorError> {
        let limiter = self.limiter.lock().clone();
        limiter.wait(cancel).await?;

        let method: reqwest::Method = request
            .method
            .parse()
            .map_err(|_| ConductorError::new(ErrorKind::Validation, format!("unsupported method {}", request.method)))?;

        let url = if request.url.starts_with("http://") || request.url.starts_with("https://") {
            request.url.clone()
        } else {
            format!("{}{}", self.config.base_url.trim_end_matches('/'), request.url)
        };

        let mut builder = self.client.request(method, url);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if let Some(token) = &self.config.bearer_token {
            builder = builder.bearer_auth(token);
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let send = builder.send();
        let response = tokio::select! {
            result = send => result.map_err(classify_reqwest_error)?,
            _ = cancel.cancelled() => return Err(ConductorError::cancelled()),
        };

        let status = response.status().as_u16();
        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.to_string(), value.to_string());
            }
        }
        let body = response
            .bytes()
            .await
            .map_err(classify_reqwest_error)?
            .to_vec();

        Ok(Response {
            status,
            headers,
            body,
            metadata: HashMap::new(),
        })
    }

    fn name(&self) -> &str {
        "http"
    }

    fn set_rate_limiter(&self, limiter: Arc<dyn RateLimiter>) {
        *self.limiter.lock() = limiter;
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> ConductorError {
    if err.is_timeout() {
        ConductorError::new(ErrorKind::Timeout, err.to_string())
    } else {
        ConductorError::new(ErrorKind::Network, err.to_string())
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
