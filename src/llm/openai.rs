//! Client for OpenAI compatible chat completion APIs. Works with
//! OpenAI itself or a local server exposing `/v1/chat/completions`.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{Completion, ExchangeFailure, failure_from_response, http_client};
use crate::chat::{Role, Turn};
use crate::core::{AppConfig, ConfigError};

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub enum MessageRole {
    #[serde(rename = "system")]
    System,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "user")]
    User,
}

impl From<Role> for MessageRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => MessageRole::User,
            Role::Assistant => MessageRole::Assistant,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn new(role: MessageRole, content: &str) -> Self {
        Message {
            role,
            content: content.to_string(),
        }
    }
}

impl From<&Turn> for Message {
    fn from(turn: &Turn) -> Self {
        Message::new(turn.role.into(), &turn.content)
    }
}

#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub api_hostname: String,
    pub model: String,
    pub system_message: Option<String>,
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"[REDACTED]")
            .field("api_hostname", &self.api_hostname)
            .field("model", &self.model)
            .field("system_message", &self.system_message)
            .finish()
    }
}

impl From<&AppConfig> for OpenAiConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            api_hostname: config.api_hostname.clone(),
            model: config.model.clone(),
            system_message: config.system_message.clone(),
        }
    }
}

pub struct OpenAiClient {
    config: OpenAiConfig,
    http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            config,
            http: http_client()?,
        })
    }

    /// The system message, when configured, always leads the history.
    fn messages(&self, history: &[Turn]) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        if let Some(system_message) = &self.config.system_message {
            messages.push(Message::new(MessageRole::System, system_message));
        }
        messages.extend(history.iter().map(Message::from));
        messages
    }

    fn parse_response(resp: &Value) -> Result<String, ExchangeFailure> {
        if let Some(msg) = resp["choices"][0]["message"]["content"].as_str() {
            return Ok(msg.to_string());
        }
        if let Some(refusal) = resp["choices"][0]["message"]["refusal"].as_str() {
            return Err(ExchangeFailure::Blocked(refusal.to_string()));
        }
        Err(ExchangeFailure::Malformed(format!(
            "No message received. Resp: {}",
            resp
        )))
    }
}

#[async_trait]
impl Completion for OpenAiClient {
    async fn complete(&self, history: &[Turn]) -> Result<String, ExchangeFailure> {
        let payload = json!({
            "model": self.config.model,
            "messages": self.messages(history),
        });
        let url = format!(
            "{}/v1/chat/completions",
            self.config.api_hostname.trim_end_matches("/")
        );

        tracing::debug!(model = %self.config.model, turns = history.len(), "Chat completion request");

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.config.api_key)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| ExchangeFailure::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(failure_from_response(response).await);
        }

        let resp: Value = response
            .json()
            .await
            .map_err(|e| ExchangeFailure::Malformed(e.to_string()))?;

        Self::parse_response(&resp)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
