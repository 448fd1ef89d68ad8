use crate::{app_with_state, state::AppState};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use coach_core::config::CoachConfig;
use coach_core::error::{CoachError, Result};
use coach_core::provider::CompletionProvider;
use coach_core::types::ChatMessage;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

enum Behavior {
    Echo,
    Unconfigured,
    Fail(fn() -> CoachError),
}

struct StubProvider(Behavior);

#[async_trait]
impl CompletionProvider for StubProvider {
    fn name(&self) -> &str {
        "OpenAI"
    }

    fn ensure_configured(&self) -> Result<()> {
        match self.0 {
            Behavior::Unconfigured => Err(CoachError::Configuration("OPENAI_API_KEY".into())),
            _ => Ok(()),
        }
    }

    async fn complete(&self, _model: &str, messages: &[ChatMessage]) -> Result<String> {
        match self.0 {
            Behavior::Fail(f) => Err(f()),
            _ => Ok(format!(
                "heard {} after {} messages",
                messages.last().map(|m| m.content.as_str()).unwrap_or(""),
                messages.len()
            )),
        }
    }
}

fn state(behavior: Behavior) -> AppState {
    AppState::with_provider(&CoachConfig::default(), Arc::new(StubProvider(behavior)))
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_chat(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

// ========== Health ==========

#[tokio::test]
async fn test_root_ok() {
    let (status, body) = send(app_with_state(state(Behavior::Echo)), get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_app_from_config() {
    let (status, _) = send(crate::app(&CoachConfig::default()), get("/")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_root_ok_without_credential() {
    let (status, body) = send(app_with_state(state(Behavior::Unconfigured)), get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_time_format() {
    let (status, body) = send(app_with_state(state(Behavior::Echo)), get("/time")).await;
    assert_eq!(status, StatusCode::OK);
    let time = body["time"].as_str().unwrap();
    let re = regex::Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$").unwrap();
    assert!(re.is_match(time), "{time}");
}

// ========== Chat ==========

#[tokio::test]
async fn test_chat_success_records_transcript() {
    let st = state(Behavior::Echo);
    let (status, body) = send(
        app_with_state(st.clone()),
        post_chat("/chat?session_id=abc", json!({ "message": "I feel anxious" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "reply": "heard I feel anxious after 2 messages" }));

    let turns = st.sessions().snapshot("abc").await.unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].content, "I feel anxious");
    assert_eq!(turns[1].content, "heard I feel anxious after 2 messages");
}

#[tokio::test]
async fn test_chat_history_grows_per_session() {
    let st = state(Behavior::Echo);
    send(app_with_state(st.clone()), post_chat("/chat?session_id=s", json!({ "message": "one" }))).await;
    let (_, body) = send(
        app_with_state(st.clone()),
        post_chat("/chat?session_id=s", json!({ "message": "two" })),
    )
    .await;
    // system + user + assistant + user
    assert_eq!(body["reply"], "heard two after 4 messages");
    assert_eq!(st.sessions().snapshot("s").await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_chat_session_id_in_body() {
    let st = state(Behavior::Echo);
    let (status, _) = send(
        app_with_state(st.clone()),
        post_chat("/chat", json!({ "message": "hi", "session_id": "from-body" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(st.sessions().contains("from-body"));
}

#[tokio::test]
async fn test_chat_requires_session_id() {
    let st = state(Behavior::Echo);
    let (status, body) = send(app_with_state(st.clone()), post_chat("/chat", json!({ "message": "hi" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "session_id is required");
    assert!(st.sessions().is_empty());

    let (status, _) = send(
        app_with_state(st),
        post_chat("/chat?session_id=", json!({ "message": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_chat_empty_query_session_id_falls_back_to_body() {
    let st = state(Behavior::Echo);
    let (status, _) = send(
        app_with_state(st.clone()),
        post_chat("/chat?session_id=", json!({ "message": "hi", "session_id": "body-id" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(st.sessions().contains("body-id"));
    assert!(!st.sessions().contains(""));
}

#[tokio::test]
async fn test_chat_rejects_missing_message() {
    let st = state(Behavior::Echo);
    let (status, body) = send(app_with_state(st.clone()), post_chat("/chat?session_id=s", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("message"), "{body}");
    assert_eq!(body["error"]["code"], "bad_request");
    assert!(st.sessions().is_empty());
}

#[tokio::test]
async fn test_chat_rejects_malformed_json() {
    let req = Request::builder()
        .method("POST")
        .uri("/chat?session_id=s")
        .header("content-type", "application/json")
        .body(Body::from("not json"))
        .unwrap();
    let (status, body) = send(app_with_state(state(Behavior::Echo)), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string(), "{body}");
}

#[tokio::test]
async fn test_chat_rejects_missing_content_type() {
    let req = Request::builder()
        .method("POST")
        .uri("/chat?session_id=s")
        .body(Body::from(r#"{"message":"hi"}"#))
        .unwrap();
    let (status, body) = send(app_with_state(state(Behavior::Echo)), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("Content-Type"), "{body}");
}

#[tokio::test]
async fn test_chat_missing_credential_is_500_and_untouched() {
    let st = state(Behavior::Unconfigured);
    let (status, body) = send(
        app_with_state(st.clone()),
        post_chat("/chat?session_id=abc", json!({ "message": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], "OPENAI_API_KEY not configured");
    assert_eq!(body["error"]["code"], "configuration_error");
    assert!(st.sessions().snapshot("abc").await.is_none());
}

#[tokio::test]
async fn test_chat_quota_is_429() {
    let st = state(Behavior::Fail(|| CoachError::QuotaExceeded("insufficient_quota".into())));
    let (status, body) = send(
        app_with_state(st),
        post_chat("/chat?session_id=s", json!({ "message": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["detail"].as_str().unwrap().contains("quota exceeded"));
}

#[tokio::test]
async fn test_chat_invalid_credential_is_401() {
    let st = state(Behavior::Fail(|| CoachError::InvalidCredential("invalid_api_key".into())));
    let (status, body) = send(
        app_with_state(st),
        post_chat("/chat?session_id=s", json!({ "message": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Invalid OpenAI API key.");
}

#[tokio::test]
async fn test_chat_provider_error_is_500_with_upstream_message() {
    let st = state(Behavior::Fail(|| CoachError::Provider("HTTP 503: overloaded".into())));
    let (status, body) = send(
        app_with_state(st.clone()),
        post_chat("/chat?session_id=s", json!({ "message": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], "OpenAI error: HTTP 503: overloaded");
    // No partial reply: only the user turn was recorded.
    assert_eq!(st.sessions().snapshot("s").await.unwrap().len(), 1);
}

// ========== Sessions ==========

#[tokio::test]
async fn test_list_and_get_sessions() {
    let st = state(Behavior::Echo);
    for id in ["a", "b"] {
        send(
            app_with_state(st.clone()),
            post_chat(&format!("/chat?session_id={id}"), json!({ "message": "hello" })),
        )
        .await;
    }

    let (status, body) = send(app_with_state(st.clone()), get("/sessions")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    let sessions = body["sessions"].as_array().unwrap();
    assert!(sessions.iter().all(|s| s["turns"] == 2));

    let (status, body) = send(app_with_state(st.clone()), get("/sessions/a")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session_id"], "a");
    assert_eq!(body["turns"][0]["role"], "user");
    assert_eq!(body["turns"][1]["role"], "assistant");
}

#[tokio::test]
async fn test_get_unknown_session_404() {
    let (status, body) = send(app_with_state(state(Behavior::Echo)), get("/sessions/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_cors_preflight() {
    let req = Request::builder()
        .method("OPTIONS")
        .uri("/chat")
        .header("origin", "http://localhost:3000")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();
    let resp = app_with_state(state(Behavior::Echo)).oneshot(req).await.unwrap();
    assert!(resp.status().is_success());
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
}
