//! Conversation state: turns, sessions, and the exchange that ties a
//! user message to a model reply.

pub mod exchange;
pub mod models;
pub mod session;

pub use exchange::{ExchangeError, ExchangeOutcome, handle_user_message};
pub use models::{Role, Transcript, Turn};
pub use session::{Session, SessionHandle, SessionStore};
