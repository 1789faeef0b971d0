//! OpenAI-compatible chat completions provider
//!
//! A reusable provider for any API that follows the OpenAI chat completions
//! format. Credentials are only sent to the configured endpoint.

#![allow(dead_code)]

use super::{BackendError, ChatProvider};
use crate::core::types::{ChatMessage, ChatRole};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Configuration for an OpenAI-compatible provider
#[derive(Debug, Clone)]
pub struct OpenAiCompatConfig {
    /// Provider name (e.g., "openai", "openrouter")
    pub name: String,
    /// Chat completions endpoint URL
    pub base_url: String,
    /// Bearer token, if the endpoint requires one
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
    /// Maximum output tokens
    pub max_tokens: usize,
}

impl OpenAiCompatConfig {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            api_key: None,
            model: String::new(),
            max_tokens: 4096,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    max_tokens: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
}

/// Chat provider speaking the OpenAI chat completions protocol
pub struct OpenAiCompatProvider {
    config: OpenAiCompatConfig,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(config: OpenAiCompatConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn wire_messages(system_message: &str, history: &[ChatMessage]) -> Vec<WireMessage> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        if !system_message.is_empty() {
            messages.push(WireMessage {
                role: "system".to_string(),
                content: system_message.to_string(),
            });
        }
        for msg in history {
            messages.push(WireMessage {
                role: match msg.role {
                    ChatRole::Human => "user".to_string(),
                    ChatRole::Assistant => "assistant".to_string(),
                },
                content: msg.text.clone(),
            });
        }
        messages
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn complete(
        &self,
        system_message: &str,
        history: &[ChatMessage],
    ) -> Result<String, BackendError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: Self::wire_messages(system_message, history),
            max_tokens: self.config.max_tokens,
        };

        let mut builder = self.client.post(&self.config.base_url).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(BackendError::from_network_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::from_http_status(status, body));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| BackendError::Malformed("response contained no choices".to_string()))
    }
}
