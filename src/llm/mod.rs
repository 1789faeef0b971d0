//! Chat backend: providers, sessions, and session factories
//!
//! A [`ChatProvider`] is the opaque request/response capability (one round
//! trip to a completion API). A [`Session`] owns a thread's conversational
//! state: the message history, the mutable system message, and the history
//! cap. [`SessionFactory`] implementations build sessions; the registry tries
//! the provider-backed factory first and falls back to the direct one.

mod error;
mod openai_compat;

#[cfg(feature = "test-sim")]
pub mod sim;
#[cfg(feature = "test-sim")]
pub use sim::SimProvider;

pub use error::BackendError;
pub use openai_compat::{OpenAiCompatConfig, OpenAiCompatProvider};

use crate::core::types::{ChatMessage, ChatRole};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Trait for chat completion providers
///
/// One call is one round trip: the provider receives the system message and
/// the full conversation so far, and returns the assistant's reply text.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Send the conversation and return the assistant's reply
    async fn complete(
        &self,
        system_message: &str,
        history: &[ChatMessage],
    ) -> Result<String, BackendError>;
}

/// Conversational state owned by exactly one thread
///
/// Messages are evicted oldest-first once the cap is exceeded; the system
/// message lives outside the capped sequence and is never evicted.
pub struct Session {
    provider: Arc<dyn ChatProvider>,
    system_message: String,
    messages: Vec<ChatMessage>,
    history_cap: usize,
    /// Degraded delivery: the system message is folded into the outgoing
    /// conversation instead of the provider's dedicated system slot.
    inline_system: bool,
}

impl Session {
    /// Create a session with full system-message support
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        system_message: impl Into<String>,
        history_cap: usize,
    ) -> Self {
        Self {
            provider,
            system_message: system_message.into(),
            messages: Vec::new(),
            history_cap,
            inline_system: false,
        }
    }

    /// Create a session that delivers the system message inline
    pub fn with_inline_system(
        provider: Arc<dyn ChatProvider>,
        system_message: impl Into<String>,
        history_cap: usize,
    ) -> Self {
        Self {
            inline_system: true,
            ..Self::new(provider, system_message, history_cap)
        }
    }

    /// Run one exchange: append the prompt, call the provider, append the reply
    ///
    /// A failed exchange leaves the history untouched.
    pub async fn chat(&mut self, prompt: &str) -> Result<String, BackendError> {
        self.messages.push(ChatMessage::human(prompt));
        self.enforce_cap();

        let result = if self.inline_system {
            let mut outgoing = Vec::with_capacity(self.messages.len() + 1);
            if !self.system_message.is_empty() {
                outgoing.push(ChatMessage {
                    role: ChatRole::Human,
                    text: self.system_message.clone(),
                    timestamp: chrono::Utc::now(),
                });
            }
            outgoing.extend(self.messages.iter().cloned());
            self.provider.complete("", &outgoing).await
        } else {
            self.provider
                .complete(&self.system_message, &self.messages)
                .await
        };

        match result {
            Ok(reply) => {
                self.messages.push(ChatMessage::assistant(reply.clone()));
                self.enforce_cap();
                Ok(reply)
            }
            Err(err) => {
                self.messages.pop();
                Err(err)
            }
        }
    }

    /// Get the message history
    pub fn history(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Replace the message history (the cap still applies)
    pub fn set_history(&mut self, messages: Vec<ChatMessage>) {
        self.messages = messages;
        self.enforce_cap();
    }

    /// Clear the message history; the system message is retained
    pub fn reset(&mut self) {
        self.messages.clear();
    }

    /// Replace the system message without touching the history
    pub fn set_system_message(&mut self, text: impl Into<String>) {
        self.system_message = text.into();
    }

    /// Get the current system message
    pub fn system_message(&self) -> &str {
        &self.system_message
    }

    fn enforce_cap(&mut self) {
        if self.messages.len() > self.history_cap {
            let overflow = self.messages.len() - self.history_cap;
            self.messages.drain(0..overflow);
        }
    }
}

/// Capability to build a [`Session`] from a system message
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn create_session(&self, system_message: &str) -> Result<Session, BackendError>;
}

/// Named provider lookup, configured once at startup
pub struct ProviderManager {
    providers: HashMap<String, Arc<dyn ChatProvider>>,
    default_name: String,
}

impl ProviderManager {
    pub fn new(default_name: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_name: default_name.into(),
        }
    }

    /// Register a provider under its own name
    pub fn register(&mut self, provider: Arc<dyn ChatProvider>) {
        self.providers
            .insert(provider.name().to_string(), provider);
    }

    /// Look up a provider by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn ChatProvider>> {
        self.providers.get(name).cloned()
    }

    /// The provider selected by configuration
    pub fn default_provider(&self) -> Option<Arc<dyn ChatProvider>> {
        self.get(&self.default_name)
    }
}

/// Primary factory: resolves the configured provider through the manager
pub struct ProviderSessionFactory {
    manager: Arc<ProviderManager>,
    history_cap: usize,
}

impl ProviderSessionFactory {
    pub fn new(manager: Arc<ProviderManager>, history_cap: usize) -> Self {
        Self {
            manager,
            history_cap,
        }
    }
}

#[async_trait]
impl SessionFactory for ProviderSessionFactory {
    async fn create_session(&self, system_message: &str) -> Result<Session, BackendError> {
        let provider = self.manager.default_provider().ok_or_else(|| {
            BackendError::Unavailable("no default provider configured".to_string())
        })?;
        Ok(Session::new(provider, system_message, self.history_cap))
    }
}

/// Fallback factory: talks to a fixed provider directly
///
/// The system message is delivered inline, which every completion endpoint
/// accepts even without a dedicated system slot.
pub struct DirectSessionFactory {
    provider: Arc<dyn ChatProvider>,
    history_cap: usize,
}

impl DirectSessionFactory {
    pub fn new(provider: Arc<dyn ChatProvider>, history_cap: usize) -> Self {
        Self {
            provider,
            history_cap,
        }
    }
}

#[async_trait]
impl SessionFactory for DirectSessionFactory {
    async fn create_session(&self, system_message: &str) -> Result<Session, BackendError> {
        Ok(Session::with_inline_system(
            self.provider.clone(),
            system_message,
            self.history_cap,
        ))
    }
}
