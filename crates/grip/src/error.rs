use std::collections::HashMap;
use thiserror::Error;

/// Error types for the GRIP control library
#[derive(Error, Debug)]
pub enum GripError {
    #[error("Invalid GRIP URI: {0}")]
    InvalidUri(String),

    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Duplicate format name in item: {0}")]
    DuplicateFormat(String),

    #[error("Invalid WebSocket event format")]
    BadEventFormat,

    #[error("Read past the end of the event queue")]
    ReadBeyondEnd,

    #[error("Client disconnected unexpectedly")]
    Disconnected,

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Failure of a publish POST to a GRIP control endpoint.
///
/// Carries enough context (status code, response headers, response body) for
/// the caller to log or retry at a higher layer. The library itself never
/// retries.
#[derive(Error, Debug)]
#[error("Publish failed: {message} (status {status_code})")]
pub struct PublishError {
    /// Human-readable description of the failure
    pub message: String,

    /// HTTP status code of the control endpoint response, or a sentinel:
    /// `-1` for a transport-level failure, `-2` for a malformed or
    /// unsupported control URI scheme
    pub status_code: i32,

    /// Response headers, when a response was received
    pub headers: Option<HashMap<String, String>>,

    /// Response body, when a response was received
    pub body: Option<String>,
}

impl PublishError {
    /// Transport-level failure (connection refused, premature close, ...)
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: -1,
            headers: None,
            body: None,
        }
    }

    /// Malformed or unsupported control URI scheme
    pub fn bad_uri(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: -2,
            headers: None,
            body: None,
        }
    }

    /// Non-2xx response from the control endpoint
    pub fn bad_status(
        status_code: u16,
        headers: HashMap<String, String>,
        body: String,
    ) -> Self {
        Self {
            message: format!("Unexpected status code: {}", status_code),
            status_code: i32::from(status_code),
            headers: Some(headers),
            body: Some(body),
        }
    }
}

/// Type alias for Results using GripError
pub type Result<T> = std::result::Result<T, GripError>;
