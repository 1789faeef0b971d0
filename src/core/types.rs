//! Canonical type definitions for the core domain
//!
//! This module contains the single source of truth for types used across
//! multiple modules (threads, llm, storage, suggest) to prevent type drift.
//!
//! All other modules should `pub use` these types rather than defining their own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reserved key for the general-purpose thread (not bound to any document)
pub const GENERAL_THREAD_KEY: &str = "general";

/// Display title for the general-purpose thread
pub const GENERAL_THREAD_TITLE: &str = "General";

/// Persona mode for a document thread determines how answers are phrased
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadMode {
    /// Developer mode: concise, technical answers
    #[default]
    Developer,
    /// Beginner mode: plain language, step-by-step explanations
    Beginner,
}

impl ThreadMode {
    /// Get display label for this mode
    pub fn label(&self) -> &'static str {
        match self {
            Self::Developer => "Developer",
            Self::Beginner => "Beginner",
        }
    }
}

impl From<&str> for ThreadMode {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "beginner" => Self::Beginner,
            _ => Self::Developer,
        }
    }
}

impl std::fmt::Display for ThreadMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Developer => write!(f, "developer"),
            Self::Beginner => write!(f, "beginner"),
        }
    }
}

/// Role of a chat message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Message written by the user
    Human,
    /// Message produced by the model
    Assistant,
}

/// One entry in a thread's conversation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn human(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Human,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Lightweight thread snapshot for listings and notifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadInfo {
    /// Thread key (document URI, or [`GENERAL_THREAD_KEY`])
    pub key: String,
    /// Display title
    pub title: String,
    /// Persona mode; `None` for the general thread
    pub mode: Option<ThreadMode>,
}

/// Notifications emitted to UI-facing subscribers
#[derive(Debug, Clone)]
pub enum AssistantEvent {
    /// The set of registered threads changed (created or removed)
    ThreadListChanged {
        threads: Vec<ThreadInfo>,
        active_key: String,
    },
    /// A different thread became the focused one
    ActiveThreadChanged { history: Vec<ChatMessage> },
    /// Thread state was torn down externally; observers should refresh
    StateReset,
}

/// Document lifecycle notifications consumed from the editor
#[derive(Debug, Clone)]
pub enum DocumentEvent {
    /// A document was opened; `text` is its current content
    Opened { uri: String, text: String },
    /// A document was closed and deleted from disk
    Deleted { uri: String },
}
