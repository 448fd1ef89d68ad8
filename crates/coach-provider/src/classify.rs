//! Mapping of upstream failures onto the error taxonomy.

use coach_core::error::CoachError;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

static QUOTA_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"insufficient_quota|rate_limit_exceeded|\b429\b").expect("static regex")
});

static CREDENTIAL_MARKERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"invalid_api_key|\b401\b").expect("static regex"));

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Human-readable upstream message: `error.message` for OpenAI-shaped bodies, else the raw body.
pub fn upstream_message(status: Option<u16>, body: &str) -> String {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error.message)
        .filter(|m| !m.is_empty());
    let text = parsed.unwrap_or_else(|| body.trim().to_string());
    match (status, text.is_empty()) {
        (Some(code), true) => format!("HTTP {code}"),
        (Some(code), false) => format!("HTTP {code}: {text}"),
        (None, _) => text,
    }
}

/// Classify an upstream failure by status code first, then by body markers.
pub fn classify_upstream(status: Option<u16>, body: &str) -> CoachError {
    let message = upstream_message(status, body);
    if status == Some(429) || QUOTA_MARKERS.is_match(body) {
        return CoachError::QuotaExceeded(message);
    }
    if status == Some(401) || CREDENTIAL_MARKERS.is_match(body) {
        return CoachError::InvalidCredential(message);
    }
    CoachError::Provider(message)
}
