// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The AWS SigV4 transport: signs every outgoing request and classifies
//! non-2xx responses.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use conductor_core::error::{ConductorError, ErrorKind};
use conductor_transport::rate_limiter::{NoopLimiter, RateLimiter};
use conductor_transport::transport::{Request, Response, Transport, TransportConfig};
use parking_lot::Mutex;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::credentials::CredentialProvider;
use crate::error_decode;
use crate::sigv4::{self, SigningInputs};

const STANDARD_METHODS: &[&str] = &["GET", "HEAD", "POST", "PUT", "DELETE", "OPTIONS", "PATCH"];

#[derive(Debug, Clone)]
pub struct AwsSigV4Config {
    pub base_url: String,
    pub service: String,
    pub region: String,
    pub timeout: Duration,
}

impl TransportConfig for AwsSigV4Config {
    fn validate(&self) -> Result<(), ConductorError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConductorError::new(
                ErrorKind::Validation,
                "base_url must start with http:// or https://",
            ));
        }
        if self.service.is_empty() {
            return Err(ConductorError::new(ErrorKind::Validation, "service must not be empty"));
        }
        if self.region.is_empty() {
            return Err(ConductorError::new(ErrorKind::Validation, "region must not be empty"));
        }
        Ok(())
    }

    fn transport_type(&self) -> &str {
        "aws-sigv4"
    }
}

pub struct AwsSigV4Transport {
    client: Client,
    config: AwsSigV4Config,
    credentials: Arc<CredentialProvider>,
    limiter: Mutex<Arc<dyn RateLimiter>>,
}

impl AwsSigV4Transport {
    pub fn new(config: AwsSigV4Config, credentials: Arc<CredentialProvider>) -> Result<Self, ConductorError> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConductorError::new(ErrorKind::Config, format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            config,
            credentials,
            limiter: Mutex::new(Arc::new(NoopLimiter)),
        })
    }
}

#[async_trait]
impl Transport for AwsSigV4Transport {
    async fn execute(&self, cancel: &CancellationToken, request: &Request) -> Result<Response, ConductorError> {
        let limiter = self.limiter.lock().clone();
        limiter.wait(cancel).await?;

        if request.method.is_empty() || !STANDARD_METHODS.contains(&request.method.to_uppercase().as_str()) {
            return Err(ConductorError::new(
                ErrorKind::Validation,
                format!("unsupported HTTP method '{}'", request.method),
            ));
        }
        if request.url.is_empty() {
            return Err(ConductorError::new(ErrorKind::Validation, "url must not be empty"));
        }

        let url = if request.url.starts_with("http://") || request.url.starts_with("https://") {
            request.url.clone()
        } else {
            format!("{}{}", self.config.base_url.trim_end_matches('/'), request.url)
        };

        let credentials = self.credentials.get().await?;
        let extra_headers: Vec<(String, String)> = request.headers.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        let signed = sigv4::sign(
            &SigningInputs {
                method: &request.method,
                url: &url,
                headers: &extra_headers,
                body: &request.body,
                service: &self.config.service,
                region: &self.config.region,
            },
            &credentials,
        )?;

        let method: reqwest::Method = request
            .method
            .parse()
            .map_err(|_| ConductorError::new(ErrorKind::Validation, "unparseable HTTP method"))?;
        let mut builder = self
            .client
            .request(method, &url)
            .header("Authorization", &signed.authorization)
            .header("x-amz-date", &signed.x_amz_date)
            .header("x-amz-content-sha256", &signed.x_amz_content_sha256);
        if let Some(token) = &signed.x_amz_security_token {
            builder = builder.header("x-amz-security-token", token);
        }
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
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
        let body = response.bytes().await.map_err(classify_reqwest_error)?.to_vec();

        if !(200..300).contains(&status) {
            let body_text = String::from_utf8_lossy(&body);
            return Err(error_decode::classify(status, &body_text));
        }

        Ok(Response {
            status,
            headers,
            body,
            metadata: HashMap::new(),
        })
    }

    fn name(&self) -> &str {
        "aws-sigv4"
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
#[path = "transport_tests.rs"]
mod tests;
