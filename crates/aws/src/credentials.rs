// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential resolution and caching for the SigV4 transport.
//!
//! Credentials may be supplied explicitly or discovered from the
//! environment (`AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`,
//! `AWS_SESSION_TOKEN`). Resolved credentials are cached with an expiry;
//! a read-preferring lock means concurrent signers see the cached value
//! without contending on every request, and only a cache miss takes the
//! write path.

use std::env;
use std::time::{Duration, Instant};

use conductor_core::error::{ConductorError, ErrorKind};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

/// How long a discovered (non-explicit) credential set is trusted
/// before re-resolution is attempted.
const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

struct Cached {
    credentials: AwsCredentials,
    expires_at: Instant,
}

/// Resolves and caches AWS credentials. Explicit credentials never
/// expire; environment-discovered credentials are re-read after
/// [`DEFAULT_TTL`].
pub struct CredentialProvider {
    explicit: Option<AwsCredentials>,
    cache: RwLock<Option<Cached>>,
}

impl CredentialProvider {
    pub fn explicit(credentials: AwsCredentials) -> Self {
        Self {
            explicit: Some(credentials),
            cache: RwLock::new(None),
        }
    }

    pub fn from_environment() -> Self {
        Self {
            explicit: None,
            cache: RwLock::new(None),
        }
    }

    /// Returns the current credentials, refreshing from the environment
    /// if the cache is empty or expired.
    pub async fn get(&self) -> Result<AwsCredentials, ConductorError> {
        if let Some(explicit) = &self.explicit {
            return Ok(explicit.clone());
        }

        {
            let guard = self.cache.read().await;
            if let Some(cached) = guard.as_ref() {
                if cached.expires_at > Instant::now() {
                    return Ok(cached.credentials.clone());
                }
            }
        }

        let mut guard = self.cache.write().await;
        if let Some(cached) = guard.as_ref() {
            if cached.expires_at > Instant::now() {
                return Ok(cached.credentials.clone());
            }
        }
        let credentials = resolve_from_environment()?;
        *guard = Some(Cached {
            credentials: credentials.clone(),
            expires_at: Instant::now() + DEFAULT_TTL,
        });
        Ok(credentials)
    }
}

fn resolve_from_environment() -> Result<AwsCredentials, ConductorError> {
    let access_key_id = env::var("AWS_ACCESS_KEY_ID").map_err(|_| {
        ConductorError::new(ErrorKind::Auth, "AWS_ACCESS_KEY_ID not set")
            .suggest("set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY or pass explicit credentials")
    })?;
    let secret_access_key = env::var("AWS_SECRET_ACCESS_KEY")
        .map_err(|_| ConductorError::new(ErrorKind::Auth, "AWS_SECRET_ACCESS_KEY not set"))?;
    let session_token = env::var("AWS_SESSION_TOKEN").ok();
    Ok(AwsCredentials {
        access_key_id,
        secret_access_key,
        session_token,
    })
}

#[cfg(test)]
#[path = "credentials_tests.rs"]
mod tests;
