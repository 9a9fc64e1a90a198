//! Router for the browser chat page

use axum::{
    Form, Router,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;

use super::render::render_chat_page;
use crate::api::SharedState;
use crate::api::public::ApiError;
use crate::chat::{SessionHandle, handle_user_message};

/// Cookie that keys the browser to its session
pub const SESSION_COOKIE: &str = "chatbot_session";

#[derive(Deserialize)]
pub struct MessageForm {
    #[serde(default)]
    pub message: String,
}

fn session_for(state: &SharedState, jar: &CookieJar) -> SessionHandle {
    let id = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    state.sessions.get_or_create_session(id.as_deref())
}

fn session_cookie(id: &str) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Render the transcript, plus the notice from the last exchange if
/// it failed
async fn chat_page(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), ApiError> {
    let handle = session_for(&state, &jar);

    let html = {
        let mut session = handle.lock().await;
        let notice = session.take_notice();
        render_chat_page(
            &state.templates,
            &state.config,
            session.transcript(),
            notice.as_deref(),
        )?
    };

    Ok((jar.add(session_cookie(handle.id())), Html(html)))
}

/// Run one exchange for the submitted message and send the browser
/// back to the page
async fn submit_message(
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(form): Form<MessageForm>,
) -> Result<Response, ApiError> {
    let handle = session_for(&state, &jar);
    let jar = jar.add(session_cookie(handle.id()));

    // A blank submission yields no input at all
    if form.message.trim().is_empty() {
        return Ok((jar, Redirect::to("/")).into_response());
    }

    // Refused with a 409 while another reply is being generated
    let mut session = handle.try_lock()?;
    handle_user_message(&mut session, &form.message).await?;

    Ok((jar, Redirect::to("/")).into_response())
}

/// Create the chat page router
pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(chat_page).post(submit_message))
}
