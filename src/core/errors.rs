//! Domain error types
//!
//! These errors represent business logic failures, distinct from infrastructure
//! errors. Using thiserror for ergonomic error handling with proper Display
//! implementations.

use crate::llm::BackendError;
use thiserror::Error;

/// Errors related to thread coordination
#[derive(Debug, Error)]
pub enum ThreadError {
    /// No thread is registered under the given key
    #[error("Thread not found: {0}")]
    NotFound(String),

    /// Both the primary and the fallback session factory failed
    #[error("Session creation failed for thread {key}: {reason}")]
    CreationFailed { key: String, reason: String },

    /// The chat backend rejected or failed an exchange
    ///
    /// This is the only failure surfaced to the user as-is; everything else
    /// degrades to a safe fallback.
    #[error("Chat backend error: {0}")]
    Backend(#[from] BackendError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ThreadError::NotFound("file:///a.md".to_string());
        assert_eq!(err.to_string(), "Thread not found: file:///a.md");

        let err = ThreadError::CreationFailed {
            key: "file:///a.md".to_string(),
            reason: "no provider".to_string(),
        };
        assert!(err.to_string().contains("file:///a.md"));
    }

    #[test]
    fn test_backend_error_conversion() {
        let backend = BackendError::Unavailable("no provider configured".to_string());
        let err: ThreadError = backend.into();
        assert!(matches!(err, ThreadError::Backend(_)));
    }
}
