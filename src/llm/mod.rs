//! Clients for hosted model APIs.
//!
//! The rest of the crate only sees two capabilities: open a
//! conversation, and send one message on it to get one complete
//! reply. Each provider implements [`Completion`], which turns a
//! history into the next assistant message; [`CompletionClient`]
//! wraps any of them into a [`ModelClient`].

pub mod gemini;
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::chat::Turn;
use crate::core::{AppConfig, ConfigError, Provider};

pub use gemini::{GeminiClient, GeminiConfig};
pub use openai::{OpenAiClient, OpenAiConfig};

/// Any failure of a single `send`. The coordinator treats every
/// variant alike; the split only matters for logs.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExchangeFailure {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Rate limited by the model API")]
    RateLimited,
    #[error("HTTP {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Malformed response: {0}")]
    Malformed(String),
    #[error("No reply was generated: {0}")]
    Blocked(String),
}

/// A stateful conversation with a model. Holds whatever history the
/// provider needs to answer the next message.
#[async_trait]
pub trait Conversation: Send {
    async fn send(&mut self, text: &str) -> Result<String, ExchangeFailure>;

    /// The history that will be sent as context with the next message.
    fn history(&self) -> &[Turn];
}

pub type BoxedConversation = Box<dyn Conversation + 'static>;

pub trait ModelClient: Send + Sync {
    fn open_conversation(&self, prior_history: &[Turn]) -> BoxedConversation;

    fn model(&self) -> &str;
}

pub type SharedModelClient = Arc<dyn ModelClient>;

/// One request, one complete reply for the given history. The last
/// turn of `history` is always the new user message.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, history: &[Turn]) -> Result<String, ExchangeFailure>;

    fn model(&self) -> &str;
}

/// Adapts a [`Completion`] provider into a [`ModelClient`] whose
/// conversations keep their own history.
pub struct CompletionClient {
    backend: Arc<dyn Completion>,
}

impl CompletionClient {
    pub fn new<C: Completion + 'static>(backend: C) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }
}

impl ModelClient for CompletionClient {
    fn open_conversation(&self, prior_history: &[Turn]) -> BoxedConversation {
        Box::new(ChatConversation {
            backend: Arc::clone(&self.backend),
            history: prior_history.to_vec(),
        })
    }

    fn model(&self) -> &str {
        self.backend.model()
    }
}

/// Conversation context kept on our side of the wire. A message and
/// its reply are only recorded once the reply arrives, so a failed
/// send is never replayed as context.
pub struct ChatConversation {
    backend: Arc<dyn Completion>,
    history: Vec<Turn>,
}

#[async_trait]
impl Conversation for ChatConversation {
    async fn send(&mut self, text: &str) -> Result<String, ExchangeFailure> {
        let user_turn = Turn::user(text);
        let mut request = self.history.clone();
        request.push(user_turn.clone());

        let reply = self.backend.complete(&request).await?;

        self.history.push(user_turn);
        self.history.push(Turn::assistant(&reply));
        Ok(reply)
    }

    fn history(&self) -> &[Turn] {
        &self.history
    }
}

/// Build the model client named by the configuration.
pub fn client_from_config(config: &AppConfig) -> Result<SharedModelClient, ConfigError> {
    let client: SharedModelClient = match config.provider {
        Provider::Gemini => Arc::new(CompletionClient::new(GeminiClient::new(
            GeminiConfig::from(config),
        )?)),
        Provider::OpenAi => Arc::new(CompletionClient::new(OpenAiClient::new(
            OpenAiConfig::from(config),
        )?)),
    };
    tracing::debug!(provider = %config.provider, model = %client.model(), "Model client ready");
    Ok(client)
}

/// HTTP client shared by the providers. Timeouts live here rather
/// than in the exchange.
pub(crate) fn http_client() -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .connect_timeout(std::time::Duration::from_secs(10))
        .timeout(std::time::Duration::from_secs(120))
        .build()
        .map_err(|e| ConfigError::ClientInit(e.to_string()))
}

/// Map a non-success status onto the failure kinds.
pub(crate) async fn failure_from_response(response: reqwest::Response) -> ExchangeFailure {
    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return ExchangeFailure::RateLimited;
    }
    let body = response.text().await.unwrap_or_default();
    ExchangeFailure::Api {
        status: status.as_u16(),
        body,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::chat::Role;

    /// Replies with the number of turns it was given, or fails when
    /// the message says so.
    struct CountingBackend {
        calls: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl Completion for CountingBackend {
        async fn complete(&self, history: &[Turn]) -> Result<String, ExchangeFailure> {
            self.calls.lock().unwrap().push(history.len());
            let last = history.last().expect("history always ends on the user turn");
            assert_eq!(last.role, Role::User);
            if last.content == "fail" {
                return Err(ExchangeFailure::Network("connection reset".to_string()));
            }
            Ok(format!("seen {}", history.len()))
        }

        fn model(&self) -> &str {
            "counting"
        }
    }

    fn client() -> CompletionClient {
        CompletionClient::new(CountingBackend {
            calls: Mutex::new(vec![]),
        })
    }

    #[tokio::test]
    async fn test_conversation_accumulates_history() {
        let client = client();
        let mut conversation = client.open_conversation(&[]);

        assert_eq!(conversation.send("Hello").await.unwrap(), "seen 1");
        assert_eq!(conversation.send("Again").await.unwrap(), "seen 3");
        assert_eq!(conversation.history().len(), 4);
        assert_eq!(conversation.history()[3].content, "seen 3");
    }

    #[tokio::test]
    async fn test_failed_send_leaves_history_untouched() {
        let client = client();
        let mut conversation = client.open_conversation(&[]);

        conversation.send("Hello").await.unwrap();
        let err = conversation.send("fail").await.unwrap_err();

        assert_eq!(err, ExchangeFailure::Network("connection reset".to_string()));
        assert_eq!(conversation.history().len(), 2);

        // The failed message is not part of the next request
        assert_eq!(conversation.send("Retry").await.unwrap(), "seen 3");
    }

    #[tokio::test]
    async fn test_open_conversation_with_prior_history() {
        let client = client();
        let prior = vec![Turn::user("earlier"), Turn::assistant("reply")];
        let mut conversation = client.open_conversation(&prior);

        assert_eq!(conversation.send("now").await.unwrap(), "seen 3");
        assert_eq!(client.model(), "counting");
    }

    #[test]
    fn test_failure_messages() {
        assert_eq!(
            ExchangeFailure::Api {
                status: 403,
                body: "denied".to_string()
            }
            .to_string(),
            "HTTP 403: denied"
        );
        assert_eq!(
            ExchangeFailure::RateLimited.to_string(),
            "Rate limited by the model API"
        );
    }
}
