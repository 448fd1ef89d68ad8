//! Coach HTTP API server (Axum).
//!
//! Provides the chat relay endpoint, health/time probes, and read-only
//! session inspection.

pub mod error;
pub mod routes;
pub mod state;

use axum::Router;
use coach_core::config::CoachConfig;
use state::AppState;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the application router from configuration.
pub fn app(cfg: &CoachConfig) -> Router {
    app_with_state(AppState::from_config(cfg))
}

/// Build the application router with a custom state.
pub fn app_with_state(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::health_routes())
        .merge(routes::chat_routes())
        .merge(routes::session_routes())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests;
