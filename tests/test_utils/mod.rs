//! Test utilities for integration tests
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{Router, body::Body};

use chatbot::api::{AppState, app};
use chatbot::chat::Turn;
use chatbot::core::{AppConfig, Provider};
use chatbot::llm::{BoxedConversation, Conversation, ExchangeFailure, ModelClient};

type Script = Arc<Mutex<VecDeque<Result<String, ExchangeFailure>>>>;

/// Model that plays back scripted results across all of its
/// conversations and echoes the message once the script runs out.
#[derive(Clone, Default)]
pub struct ScriptedModel {
    script: Script,
    delay: Option<Duration>,
}

impl ScriptedModel {
    pub fn new(script: Vec<Result<String, ExchangeFailure>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            delay: None,
        }
    }

    /// Take `delay` to answer every message, long enough for another
    /// request to arrive while a reply is pending.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

struct ScriptedConversation {
    script: Script,
    delay: Option<Duration>,
    history: Vec<Turn>,
}

#[async_trait]
impl Conversation for ScriptedConversation {
    async fn send(&mut self, text: &str) -> Result<String, ExchangeFailure> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        let reply = next.unwrap_or_else(|| Ok(format!("echo: {text}")))?;
        self.history.push(Turn::user(text));
        self.history.push(Turn::assistant(&reply));
        Ok(reply)
    }

    fn history(&self) -> &[Turn] {
        &self.history
    }
}

impl ModelClient for ScriptedModel {
    fn open_conversation(&self, prior_history: &[Turn]) -> BoxedConversation {
        Box::new(ScriptedConversation {
            script: Arc::clone(&self.script),
            delay: self.delay,
            history: prior_history.to_vec(),
        })
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        provider: Provider::Gemini,
        api_key: String::from("test-api-key"),
        api_hostname: String::from("http://localhost:1"),
        model: String::from("gemini-1.5-flash"),
        system_message: None,
        page_title: String::from("Gemini Chatbot"),
        assistant_label: String::from("Gemini"),
        session_ttl: Duration::from_secs(3600),
    }
}

/// Creates a test application router backed by `model`.
pub fn test_app_with(model: ScriptedModel) -> Router {
    let app_state = AppState::new(test_config(), Arc::new(model));
    app(Arc::new(app_state))
}

/// Creates a test application router whose model echoes every message.
pub fn test_app() -> Router {
    test_app_with(ScriptedModel::default())
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("Body is not UTF-8")
}
