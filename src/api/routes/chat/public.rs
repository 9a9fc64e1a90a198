//! Public types for the chat API
use serde::{Deserialize, Serialize};

use crate::chat::Turn;

#[derive(Serialize, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
}

#[derive(Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    /// Set when the model replied
    pub reply: Option<String>,
    /// Set when the exchange failed; the transcript then ends on the
    /// unanswered message
    pub error: Option<String>,
    pub transcript: Vec<Turn>,
}

#[derive(Serialize, Deserialize)]
pub struct NewSessionResponse {
    pub session_id: String,
}

#[derive(Serialize, Deserialize)]
pub struct ChatTranscriptResponse {
    pub session_id: String,
    pub transcript: Vec<Turn>,
}
