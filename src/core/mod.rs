//! Core domain types, errors, and prompt assembly

pub mod errors;
pub mod prompts;
pub mod types;

pub use errors::ThreadError;
pub use types::{
    AssistantEvent, ChatMessage, ChatRole, DocumentEvent, ThreadInfo, ThreadMode,
    GENERAL_THREAD_KEY, GENERAL_THREAD_TITLE,
};
