//! JSON error responses for the HTTP API.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use coach_core::error::CoachError;
use serde_json::json;

/// API error with status code and message.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self { status: StatusCode::NOT_FOUND, code: "not_found", message: msg.into() }
    }
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, code: "bad_request", message: msg.into() }
    }

    /// Map a chat failure, naming the upstream `provider` in the detail text.
    pub fn from_chat_error(err: CoachError, provider: &str) -> Self {
        let code = err.code();
        let (status, message) = match err {
            CoachError::Configuration(var) => {
                (StatusCode::INTERNAL_SERVER_ERROR, format!("{var} not configured"))
            }
            CoachError::QuotaExceeded(_) => {
                (StatusCode::TOO_MANY_REQUESTS, format!("{provider} API quota exceeded."))
            }
            CoachError::InvalidCredential(_) => {
                (StatusCode::UNAUTHORIZED, format!("Invalid {provider} API key."))
            }
            CoachError::Provider(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, format!("{provider} error: {msg}"))
            }
            other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        };
        Self { status, code, message }
    }
}

/// Malformed, mistyped, or non-JSON bodies all surface as 400 with a `detail`.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "detail": self.message,
            "error": {
                "code": self.code,
                "message": self.message,
            }
        });
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_statuses() {
        let cases = [
            (CoachError::Configuration("OPENAI_API_KEY".into()), 500, "OPENAI_API_KEY not configured"),
            (CoachError::QuotaExceeded("HTTP 429".into()), 429, "OpenAI API quota exceeded."),
            (CoachError::InvalidCredential("HTTP 401".into()), 401, "Invalid OpenAI API key."),
            (CoachError::Provider("HTTP 503: overloaded".into()), 500, "OpenAI error: HTTP 503: overloaded"),
        ];
        for (err, status, detail) in cases {
            let api = ApiError::from_chat_error(err, "OpenAI");
            assert_eq!(api.status.as_u16(), status);
            assert_eq!(api.message, detail);
        }
    }

    #[test]
    fn test_codes_follow_variant() {
        let api = ApiError::from_chat_error(CoachError::QuotaExceeded(String::new()), "OpenAI");
        assert_eq!(api.code, "quota_exceeded");
        assert_eq!(ApiError::bad_request("x").code, "bad_request");
    }
}
