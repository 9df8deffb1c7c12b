//! Error types for the remote client crate.

use leirad_core::errors::classify_http_status;
use leirad_core::{RemoteError, RetryClass};
use thiserror::Error;

/// Result type alias for remote client operations.
pub type Result<T> = std::result::Result<T, RemoteApiError>;

/// Errors that can occur talking to the backend.
#[derive(Debug, Error)]
pub enum RemoteApiError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error response from the backend
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Request could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Successful status with a body we cannot use
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Missing or malformed client configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RemoteApiError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// HTTP status if this is an API error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classify error for retry policy.
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Api { status, .. } => classify_http_status(*status),
            Self::Http(_) => RetryClass::Retryable,
            Self::Json(_)
            | Self::InvalidRequest(_)
            | Self::UnexpectedResponse(_)
            | Self::Config(_) => RetryClass::Permanent,
        }
    }
}

impl From<RemoteApiError> for RemoteError {
    fn from(err: RemoteApiError) -> Self {
        RemoteError {
            status: err.status_code(),
            retry_class: err.retry_class(),
            message: err.to_string(),
        }
    }
}
