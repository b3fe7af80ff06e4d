// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Secret redaction applied at every error, status, and log boundary.

use regex::Regex;
use std::sync::LazyLock;

/// Matches AWS access key IDs (`AKIA` + 16 uppercase alphanumerics).
pub static AWS_ACCESS_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"AKIA[A-Z0-9]{16}").expect("valid regex"));

/// Matches `KEY=VALUE` pairs whose key looks sensitive.
static ENV_PAIR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b([A-Za-z0-9_]*(?:SECRET|TOKEN|KEY|PASSWORD|CREDENTIAL|AUTH|API_KEY)[A-Za-z0-9_]*)=([^\s]+)",
    )
    .expect("valid regex")
});

/// Environment variable key patterns that must be redacted wherever
/// their value appears.
pub static SENSITIVE_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)SECRET|TOKEN|KEY|PASSWORD|CREDENTIAL|AUTH|API_KEY").expect("valid regex")
});

/// Redact a single environment value given its key, returning
/// `"***REDACTED***"` if the key matches a sensitive pattern.
pub fn redact_env_value(key: &str, value: &str) -> String {
    if SENSITIVE_KEY_RE.is_match(key) {
        "***REDACTED***".to_string()
    } else {
        value.to_string()
    }
}

/// Replace any `AKIA…` access-key-shaped substring with `AKIA****`.
pub fn sanitize_aws_access_key(text: &str) -> String {
    AWS_ACCESS_KEY_RE.replace_all(text, "AKIA****").into_owned()
}

/// Redact sensitive `KEY=VALUE` pairs and AWS access keys from free-form
/// text such as error messages, command lines, and log lines.
pub fn redact_text(text: &str) -> String {
    let text = sanitize_aws_access_key(text);
    ENV_PAIR_RE
        .replace_all(&text, |caps: &regex::Captures| {
            format!("{}=***REDACTED***", &caps[1])
        })
        .into_owned()
}

#[cfg(test)]
#[path = "redact_tests.rs"]
mod tests;
