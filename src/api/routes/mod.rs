//! API routes module

pub mod chat;

use axum::{Json, Router, extract::State, routing::get};
use serde_json::{Value, json};

use crate::api::SharedState;

async fn health(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "provider": state.config.provider.to_string(),
        "model": state.sessions.model().model(),
        "sessions": state.sessions.len(),
    }))
}

/// Create the combined API router
pub fn router() -> Router<SharedState> {
    Router::new()
        // Chat routes
        .nest("/chat", chat::router())
        .route("/health", get(health))
}
