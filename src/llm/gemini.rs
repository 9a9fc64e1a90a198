//! Google Gemini client for the Generative Language API.

use std::fmt;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{Completion, ExchangeFailure, failure_from_response, http_client};
use crate::chat::{Role, Turn};
use crate::core::{AppConfig, ConfigError};

#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub api_hostname: String,
    pub model: String,
    pub system_message: Option<String>,
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"[REDACTED]")
            .field("api_hostname", &self.api_hostname)
            .field("model", &self.model)
            .field("system_message", &self.system_message)
            .finish()
    }
}

impl From<&AppConfig> for GeminiConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            api_hostname: config.api_hostname.clone(),
            model: config.model.clone(),
            system_message: config.system_message.clone(),
        }
    }
}

pub struct GeminiClient {
    config: GeminiConfig,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            config,
            http: http_client()?,
        })
    }

    fn api_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.api_hostname.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Gemini calls the assistant `model` and takes the system prompt
    /// out of band as `systemInstruction`.
    fn build_request_body(&self, history: &[Turn]) -> Value {
        let contents: Vec<Value> = history
            .iter()
            .map(|turn| {
                let role = match turn.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                };
                json!({
                    "role": role,
                    "parts": [{ "text": turn.content }]
                })
            })
            .collect();

        let mut body = json!({ "contents": contents });
        if let Some(system_message) = &self.config.system_message {
            body["systemInstruction"] = json!({
                "parts": [{ "text": system_message }]
            });
        }
        body
    }

    fn parse_response(json: &Value) -> Result<String, ExchangeFailure> {
        if let Some(reason) = json["promptFeedback"]["blockReason"].as_str() {
            return Err(ExchangeFailure::Blocked(format!("prompt blocked ({reason})")));
        }

        let first = json["candidates"]
            .as_array()
            .and_then(|candidates| candidates.first())
            .ok_or_else(|| ExchangeFailure::Malformed("no candidates in response".to_string()))?;

        let text: String = first["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| part["text"].as_str())
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            let reason = first["finishReason"].as_str().unwrap_or("empty reply");
            return Err(ExchangeFailure::Blocked(reason.to_string()));
        }

        Ok(text)
    }
}

#[async_trait]
impl Completion for GeminiClient {
    async fn complete(&self, history: &[Turn]) -> Result<String, ExchangeFailure> {
        let body = self.build_request_body(history);

        tracing::debug!(model = %self.config.model, turns = history.len(), "Gemini API request");

        let response = self
            .http
            .post(self.api_url())
            .header("content-type", "application/json")
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExchangeFailure::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(failure_from_response(response).await);
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| ExchangeFailure::Malformed(e.to_string()))?;

        Self::parse_response(&json)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
