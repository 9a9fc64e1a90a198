//! Router for the chat API

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};

use super::public;
use crate::api::SharedState;
use crate::api::public::ApiError;
use crate::chat::handle_user_message;

/// Start a new, empty chat session
async fn create_session(
    State(state): State<SharedState>,
) -> (StatusCode, Json<public::NewSessionResponse>) {
    let handle = state.sessions.get_or_create_session(None);
    (
        StatusCode::CREATED,
        Json(public::NewSessionResponse {
            session_id: handle.id().to_string(),
        }),
    )
}

/// Get the transcript of a single chat session by ID
async fn chat_session(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<public::ChatTranscriptResponse>, ApiError> {
    let handle = state
        .sessions
        .get(&id)
        .ok_or_else(|| ApiError::not_found(format!("Chat session {} not found", id)))?;
    let session = handle.lock().await;

    Ok(Json(public::ChatTranscriptResponse {
        session_id: id,
        transcript: session.transcript().turns().to_vec(),
    }))
}

/// Add a message to a chat session, creating the session if needed,
/// and wait for the reply
async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<public::ChatRequest>,
) -> Result<Json<public::ChatResponse>, ApiError> {
    let handle = state
        .sessions
        .get_or_create_session(Some(&payload.session_id));
    let mut session = handle.try_lock()?;

    let outcome = handle_user_message(&mut session, &payload.message).await?;

    // The caller gets the notice in the response, so it shouldn't
    // also show up on the next page render
    session.take_notice();

    Ok(Json(public::ChatResponse {
        session_id: handle.id().to_string(),
        reply: outcome.reply().map(String::from),
        error: outcome.notice().map(String::from),
        transcript: session.transcript().turns().to_vec(),
    }))
}

/// Create the chat router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", post(chat_handler))
        .route("/sessions", post(create_session))
        .route("/{id}", get(chat_session))
}
