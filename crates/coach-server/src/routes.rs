use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use serde::Deserialize;
use serde_json::{json, Value};

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/time", get(time))
}

pub fn chat_routes() -> Router<AppState> {
    Router::new().route("/chat", post(chat))
}

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", get(list_sessions))
        .route("/sessions/{session_id}", get(get_session))
}

#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Accepted when the query string has no non-empty `session_id`.
    #[serde(default)]
    pub session_id: Option<String>,
}

async fn root() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn time() -> Json<Value> {
    let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    Json(json!({ "time": now }))
}

async fn chat(
    State(state): State<AppState>,
    query: Result<Query<ChatQuery>, QueryRejection>,
    req: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query?;
    let Json(req) = req?;
    let non_empty = |id: Option<String>| id.filter(|id| !id.is_empty());
    let session_id = non_empty(query.session_id)
        .or_else(|| non_empty(req.session_id))
        .ok_or_else(|| ApiError::bad_request("session_id is required"))?;

    let reply = state
        .chat
        .send_message(&session_id, &req.message)
        .await
        .map_err(|e| ApiError::from_chat_error(e, state.chat.provider_name()))?;

    Ok(Json(json!({ "reply": reply })))
}

async fn list_sessions(State(state): State<AppState>) -> Json<Value> {
    let sessions = state.sessions().list();
    Json(json!({ "count": sessions.len(), "sessions": sessions }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let turns = state
        .sessions()
        .snapshot(&session_id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Session not found: {session_id}")))?;
    Ok(Json(json!({ "session_id": session_id, "turns": turns })))
}
