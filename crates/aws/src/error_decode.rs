// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Decodes AWS error response bodies (XML or JSON) and classifies them
//! into a [`ConductorError`].

use conductor_core::error::{ConductorError, ErrorKind};
use conductor_core::redact::sanitize_aws_access_key;
use regex::Regex;
use std::sync::LazyLock;

static XML_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<Code>([^<]*)</Code>").expect("valid regex"));
static XML_MESSAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<Message>([^<]*)</Message>").expect("valid regex"));

struct DecodedError {
    code: String,
    message: String,
}

fn decode_body(body: &str) -> DecodedError {
    if let (Some(code), Some(message)) = (
        XML_CODE_RE.captures(body).and_then(|c| c.get(1)),
        XML_MESSAGE_RE.captures(body).and_then(|c| c.get(1)),
    ) {
        return DecodedError {
            code: code.as_str().to_string(),
            message: message.as_str().to_string(),
        };
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let code = value
            .get("__type")
            .and_then(|v| v.as_str())
            .map(|s| s.rsplit('#').next().unwrap_or(s).to_string());
        let message = value
            .get("message")
            .or_else(|| value.get("Message"))
            .and_then(|v| v.as_str())
            .map(str::to_string);
        if code.is_some() || message.is_some() {
            return DecodedError {
                code: code.unwrap_or_else(|| "Unknown".to_string()),
                message: message.unwrap_or_default(),
            };
        }
    }

    DecodedError {
        code: "Unknown".to_string(),
        message: body.chars().take(200).collect(),
    }
}

/// Pulls the corrected cursor out of an `InvalidSequenceTokenException`
/// message (CloudWatch Logs `PutLogEvents` embeds it as free text rather
/// than a structured field: `"The next expected sequenceToken is: {token}"`).
fn extract_sequence_token(message: &str) -> Option<String> {
    const MARKER: &str = "The next expected sequenceToken is: ";
    let start = message.find(MARKER)? + MARKER.len();
    let rest = &message[start..];
    let end = rest.find(|c: char| c.is_whitespace()).unwrap_or(rest.len());
    Some(rest[..end].to_string())
}

/// Classifies a non-2xx AWS response into a [`ConductorError`].
/// `AKIA…` substrings in the message are redacted.
pub fn classify(status: u16, body: &str) -> ConductorError {
    let decoded = decode_body(body);
    let message = sanitize_aws_access_key(&decoded.message);

    let (kind, retryable) = match (decoded.code.as_str(), status) {
        ("SignatureDoesNotMatch", _) | ("InvalidAccessKeyId", _) => (ErrorKind::Auth, false),
        (_, 403) => (ErrorKind::Auth, false),
        ("RequestLimitExceeded", _) | ("Throttling", _) | (_, 429) => (ErrorKind::RateLimit, true),
        ("RequestTimeout", _) | (_, 408) => (ErrorKind::Timeout, true),
        ("InvalidSequenceTokenException", _) => (ErrorKind::Client, true),
        _ if (500..600).contains(&status) => (ErrorKind::Server, true),
        (_, 404) => (ErrorKind::NotFound, false),
        _ => (ErrorKind::Client, false),
    };

    let mut error = ConductorError::new(kind, format!("{}: {}", decoded.code, message))
        .retryable(retryable)
        .with_metadata("status", status.to_string())
        .with_metadata("aws_code", decoded.code.clone());

    if decoded.code == "InvalidSequenceTokenException" {
        if let Some(token) = extract_sequence_token(&message) {
            error = error.with_metadata("next_sequence_token", token);
        }
    }

    error
}

#[cfg(test)]
#[path = "error_decode_tests.rs"]
mod tests;
