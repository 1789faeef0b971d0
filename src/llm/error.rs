//! Typed errors for chat backend operations
//!
//! Provides structured error types so callers can distinguish common failure
//! modes without string matching.

use thiserror::Error;

/// Chat backend errors with typed variants
#[derive(Debug, Error)]
pub enum BackendError {
    /// No usable provider is configured or reachable
    ///
    /// Raised during session creation; the registry reacts by switching to
    /// the direct fallback factory.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// The API returned a non-success status
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Network connectivity issue (connection refused, timeout, etc.)
    #[error("Network error: {0}")]
    Network(String),

    /// The response body did not match the expected shape
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl BackendError {
    /// Convert an HTTP status code and error text into a typed error
    pub fn from_http_status(status: reqwest::StatusCode, message: String) -> Self {
        BackendError::Api {
            status: status.as_u16(),
            message,
        }
    }

    /// Convert network/connection errors into a typed error
    pub fn from_network_error(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            Self::from_http_status(status, e.to_string())
        } else {
            BackendError::Network(e.to_string())
        }
    }
}
