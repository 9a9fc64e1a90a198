//! Integration tests for the browser chat page

mod test_utils;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header},
    };
    use tower::util::ServiceExt;

    use chatbot::chat::session::MAX_SESSION_ID_LEN;
    use chatbot::llm::ExchangeFailure;
    use chatbot::ui::SESSION_COOKIE;

    use crate::test_utils::{ScriptedModel, body_to_string, test_app, test_app_with};

    /// Load the page and return the session cookie it set plus the body
    async fn get_page(app: &Router, cookie: Option<&str>) -> (StatusCode, String, String) {
        let mut request = Request::builder().uri("/");
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let response = app
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("Session cookie should always be set")
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();
        let body = body_to_string(response.into_body()).await;
        (status, set_cookie, body)
    }

    async fn submit(app: &Router, cookie: &str, message: &str) -> StatusCode {
        let form = format!("message={}", message.replace(' ', "+"));
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .method("POST")
                    .header(header::COOKIE, cookie)
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(form))
                    .unwrap(),
            )
            .await
            .unwrap();

        if response.status() == StatusCode::SEE_OTHER {
            assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
        }
        response.status()
    }

    /// Tests the first visit creates a session and shows an empty chat
    #[tokio::test]
    async fn it_renders_an_empty_chat() {
        let app = test_app();
        let (status, cookie, body) = get_page(&app, None).await;

        assert_eq!(status, StatusCode::OK);
        assert!(cookie.starts_with(&format!("{}=", SESSION_COOKIE)));
        assert!(body.contains("No conversation yet."));
        assert!(body.contains("id=\"chat-form\""));
    }

    /// Tests the same cookie always gets the same session back
    #[tokio::test]
    async fn it_keeps_the_session_across_renders() {
        let app = test_app();
        let (_, cookie, _) = get_page(&app, None).await;

        let (_, again, _) = get_page(&app, Some(&cookie)).await;
        assert_eq!(cookie, again);
    }

    /// Tests submitting a message renders both turns afterwards
    #[tokio::test]
    async fn it_renders_the_exchange() {
        let app = test_app_with(ScriptedModel::new(vec![Ok("Hi there".to_string())]));
        let (_, cookie, _) = get_page(&app, None).await;

        assert_eq!(submit(&app, &cookie, "Hello").await, StatusCode::SEE_OTHER);

        let (_, _, body) = get_page(&app, Some(&cookie)).await;
        assert!(body.contains("<strong>User 1</strong>: Hello"));
        assert!(body.contains("<strong>Gemini 1</strong>: Hi there"));
        assert!(!body.contains("role=\"alert\""));
    }

    /// Tests a failure shows a notice once and keeps the message
    #[tokio::test]
    async fn it_shows_failures_once() {
        let app = test_app_with(ScriptedModel::new(vec![
            Ok("Hi there".to_string()),
            Err(ExchangeFailure::Network("timed out".to_string())),
        ]));
        let (_, cookie, _) = get_page(&app, None).await;

        submit(&app, &cookie, "Hello").await;
        assert_eq!(
            submit(&app, &cookie, "How are you?").await,
            StatusCode::SEE_OTHER
        );

        let (_, _, body) = get_page(&app, Some(&cookie)).await;
        assert!(body.contains("role=\"alert\""));
        assert!(body.contains("timed out"));
        assert!(body.contains("<strong>User 2</strong>: How are you?"));
        assert!(!body.contains("Gemini 2"));

        // The notice is transient
        let (_, _, body) = get_page(&app, Some(&cookie)).await;
        assert!(!body.contains("role=\"alert\""));
        assert!(body.contains("How are you?"));

        // And the chat is still usable
        submit(&app, &cookie, "Retry").await;
        let (_, _, body) = get_page(&app, Some(&cookie)).await;
        assert!(body.contains("<strong>User 3</strong>: Retry"));
        assert!(body.contains("echo: Retry"));
    }

    /// Tests a blank submission doesn't start an exchange
    #[tokio::test]
    async fn it_ignores_blank_submissions() {
        let app = test_app();
        let (_, cookie, _) = get_page(&app, None).await;

        assert_eq!(submit(&app, &cookie, "   ").await, StatusCode::SEE_OTHER);

        let (_, _, body) = get_page(&app, Some(&cookie)).await;
        assert!(body.contains("No conversation yet."));
    }

    /// Tests two browsers never share a transcript
    #[tokio::test]
    async fn it_isolates_browsers() {
        let app = test_app();
        let (_, first, _) = get_page(&app, None).await;
        let (_, second, _) = get_page(&app, None).await;
        assert_ne!(first, second);

        submit(&app, &first, "only for the first").await;

        let (_, _, body) = get_page(&app, Some(&second)).await;
        assert!(!body.contains("only for the first"));
    }

    /// Tests a second submission while a reply is pending is refused
    #[tokio::test]
    async fn it_refuses_concurrent_submissions() {
        let model = ScriptedModel::default().with_delay(Duration::from_millis(300));
        let app = test_app_with(model);
        let (_, cookie, _) = get_page(&app, None).await;

        let (first, second) = tokio::join!(
            submit(&app, &cookie, "first"),
            submit(&app, &cookie, "second")
        );
        let mut statuses = vec![first.as_u16(), second.as_u16()];
        statuses.sort();
        assert_eq!(
            statuses,
            vec![StatusCode::SEE_OTHER.as_u16(), StatusCode::CONFLICT.as_u16()]
        );

        // Only the accepted message made it into the transcript
        let (_, _, body) = get_page(&app, Some(&cookie)).await;
        assert!(body.contains("<strong>User 1</strong>"));
        assert!(!body.contains("User 2"));
        assert!(body.contains("<strong>Gemini 1</strong>: echo: "));
    }

    /// Tests an oversized session cookie is not adopted
    #[tokio::test]
    async fn it_replaces_oversized_session_ids() {
        let app = test_app();
        let forged = format!(
            "{}={}",
            SESSION_COOKIE,
            "a".repeat(MAX_SESSION_ID_LEN + 1)
        );

        let (status, cookie, _) = get_page(&app, Some(&forged)).await;
        assert_eq!(status, StatusCode::OK);
        assert_ne!(cookie, forged);
        assert!(cookie.len() < forged.len());
    }
}
