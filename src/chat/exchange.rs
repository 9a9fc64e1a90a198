//! One request/response cycle per user message.
//!
//! The user turn is recorded before the model is called so a failed
//! exchange still shows what the user said. A reply is only appended
//! once it has arrived; a failure appends nothing and leaves a notice
//! on the session instead, so the transcript may end on an unanswered
//! user turn and the next message simply follows it.

use thiserror::Error;

use super::models::Role;
use super::session::Session;

/// Refusals that happen before the model is ever called.
#[derive(Debug, Error, PartialEq)]
pub enum ExchangeError {
    #[error("Message is empty")]
    EmptyMessage,
    #[error("A reply is still being generated for this session")]
    Busy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeOutcome {
    Replied(String),
    Failed { notice: String },
}

impl ExchangeOutcome {
    pub fn reply(&self) -> Option<&str> {
        match self {
            ExchangeOutcome::Replied(reply) => Some(reply),
            ExchangeOutcome::Failed { .. } => None,
        }
    }

    pub fn notice(&self) -> Option<&str> {
        match self {
            ExchangeOutcome::Replied(_) => None,
            ExchangeOutcome::Failed { notice } => Some(notice),
        }
    }
}

/// Run one exchange on a session the caller already holds exclusively.
pub async fn handle_user_message(
    session: &mut Session,
    text: &str,
) -> Result<ExchangeOutcome, ExchangeError> {
    if text.trim().is_empty() {
        return Err(ExchangeError::EmptyMessage);
    }

    // A notice only describes the exchange right before it
    session.take_notice();
    session.append_turn(Role::User, text);

    match session.conversation.send(text).await {
        Ok(reply) => {
            session.append_turn(Role::Assistant, &reply);
            tracing::debug!(
                session_id = %session.id(),
                turns = session.transcript().len(),
                "Exchange complete"
            );
            Ok(ExchangeOutcome::Replied(reply))
        }
        Err(e) => {
            tracing::error!(session_id = %session.id(), "Exchange failed: {}", e);
            let notice = format!("An error occurred while generating a reply: {}", e);
            session.set_notice(&notice);
            Ok(ExchangeOutcome::Failed { notice })
        }
    }
}
