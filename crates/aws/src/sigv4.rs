// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! AWS Signature Version 4 request signing.

use chrono::Utc;
use conductor_core::error::ConductorError;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::credentials::AwsCredentials;

type HmacSha256 = Hmac<Sha256>;

/// SHA256 of an empty payload; the fixed constant used when a request
/// has no body.
pub const EMPTY_BODY_HASH: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

pub struct SigningInputs<'a> {
    pub method: &'a str,
    pub url: &'a str,
    pub headers: &'a [(String, String)],
    pub body: &'a [u8],
    pub service: &'a str,
    pub region: &'a str,
}

pub struct SignedHeaders {
    pub authorization: String,
    pub x_amz_date: String,
    pub x_amz_content_sha256: String,
    pub x_amz_security_token: Option<String>,
}

fn sha256_hex(data: &[u8]) -> String {
    if data.is_empty() {
        return EMPTY_BODY_HASH.to_string();
    }
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts a key of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Builds the canonical request, signs it, and returns the headers to
/// attach to the outgoing HTTP request.
pub fn sign(
    inputs: &SigningInputs<'_>,
    credentials: &AwsCredentials,
) -> Result<SignedHeaders, ConductorError> {
    let now = Utc::now();
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = now.format("%Y%m%d").to_string();

    let url = url::Url::parse(inputs.url)
        .map_err(|e| ConductorError::new(conductor_core::error::ErrorKind::Validation, format!("invalid URL: {e}")))?;
    let canonical_uri = if url.path().is_empty() { "/" } else { url.path() };
    let canonical_querystring = canonical_query_string(&url);

    let payload_hash = sha256_hex(inputs.body);

    let mut all_headers: Vec<(String, String)> = inputs.headers.to_vec();
    all_headers.push(("host".to_string(), url.host_str().unwrap_or_default().to_string()));
    all_headers.push(("x-amz-date".to_string(), amz_date.clone()));
    all_headers.push(("x-amz-content-sha256".to_string(), payload_hash.clone()));
    if let Some(token) = &credentials.session_token {
        all_headers.push(("x-amz-security-token".to_string(), token.clone()));
    }
    all_headers.sort_by(|a, b| a.0.to_lowercase().cmp(&b.0.to_lowercase()));

    let canonical_headers: String = all_headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k.to_lowercase(), v.trim()))
        .collect();
    let signed_headers: String = all_headers
        .iter()
        .map(|(k, _)| k.to_lowercase())
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        inputs.method.to_uppercase(),
        canonical_uri,
        canonical_querystring,
        canonical_headers,
        signed_headers,
        payload_hash
    );

    let credential_scope = format!("{date_stamp}/{}/{}/aws4_request", inputs.region, inputs.service);
    let canonical_request_hash = sha256_hex(canonical_request.as_bytes());
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{amz_date}\n{credential_scope}\n{canonical_request_hash}"
    );

    let k_date = hmac_sha256(format!("AWS4{}", credentials.secret_access_key).as_bytes(), date_stamp.as_bytes());
    let k_region = hmac_sha256(&k_date, inputs.region.as_bytes());
    let k_service = hmac_sha256(&k_region, inputs.service.as_bytes());
    let k_signing = hmac_sha256(&k_service, b"aws4_request");
    let signature = hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes()));

    let authorization = format!(
        "AWS4-HMAC-SHA256 Credential={}/{credential_scope}, SignedHeaders={signed_headers}, Signature={signature}",
        credentials.access_key_id
    );

    Ok(SignedHeaders {
        authorization,
        x_amz_date: amz_date,
        x_amz_content_sha256: payload_hash,
        x_amz_security_token: credentials.session_token.clone(),
    })
}

fn canonical_query_string(url: &url::Url) -> String {
    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencode(k), urlencode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn urlencode(s: &str) -> String {
    let mut out = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
#[path = "sigv4_tests.rs"]
mod tests;
