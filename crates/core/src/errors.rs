//! Error types for the offline data layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::EntityKind;

/// Result type alias for data layer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Retry policy class for remote failures.
///
/// The overlay queues every remote failure regardless of class; the class is
/// kept on the error so replay logs can tell a flaky network from a request
/// the backend will never accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryClass {
    Retryable,
    Permanent,
    ReauthRequired,
}

/// Classify an HTTP status into retry behavior.
pub fn classify_http_status(status: u16) -> RetryClass {
    match status {
        401 | 403 => RetryClass::ReauthRequired,
        408 | 409 | 423 | 425 | 429 => RetryClass::Retryable,
        500..=599 => RetryClass::Retryable,
        _ => RetryClass::Permanent,
    }
}

/// A failed call against the remote backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RemoteError {
    pub status: Option<u16>,
    pub message: String,
    pub retry_class: RetryClass,
}

impl RemoteError {
    /// Network-level failure: no response was received.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            retry_class: RetryClass::Retryable,
        }
    }

    /// The backend answered with a non-success status.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
            retry_class: classify_http_status(status),
        }
    }

    /// The request could not be built or the response could not be decoded.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            retry_class: RetryClass::Permanent,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.retry_class == RetryClass::Retryable
    }
}

/// Errors surfaced by the data layer.
#[derive(Debug, Error)]
pub enum Error {
    /// Remote call failed and no local fallback applied
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// The key-value medium under the local store failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A composite action referenced a record missing from the cache
    #[error("{entity} '{id}' not found")]
    NotFound { entity: EntityKind, id: String },
}

impl Error {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    pub fn not_found(entity: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// The remote error, when this error came from the backend.
    pub fn as_remote(&self) -> Option<&RemoteError> {
        match self {
            Self::Remote(err) => Some(err),
            _ => None,
        }
    }
}
