//! Server rendered chat page. Every input event is a form post that
//! runs one exchange and redirects back to a fresh render of the
//! whole transcript.

pub mod render;
pub mod router;

pub use render::{ChatPage, render_chat_page, templates};
pub use router::{SESSION_COOKIE, router};
