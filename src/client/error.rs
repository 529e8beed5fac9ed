//! Client Error Types
//!
//! The transport/service error taxonomy. Errors bubble unmodified from
//! the transport to the service client to the coordinator.

use thiserror::Error;

/// Client error types
///
/// Only `Network` and `Http` are retried by the transport; a `Conflict`
/// is surfaced immediately since retrying cannot resolve a duplicate
/// idempotency key.
#[derive(Error, Debug, Clone)]
pub enum ClientError {
    /// Transport-level failure (connect, timeout, body read)
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP response other than 409
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    /// 409 - a withdrawal with this idempotency key already exists
    #[error("Idempotency conflict: a withdrawal with this key already exists")]
    Conflict,

    /// 404 on a fetch - the server has no such withdrawal
    #[error("Withdrawal not found: {0}")]
    NotFound(String),

    /// Malformed response body
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Whether the transport retry policy applies to this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Network(_) | ClientError::Http { .. })
    }

    /// Get the error code for logs and structured UI handling
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::Network(_) => "NETWORK_ERROR",
            ClientError::Http { .. } => "HTTP_ERROR",
            ClientError::Conflict => "IDEMPOTENCY_CONFLICT",
            ClientError::NotFound(_) => "NOT_FOUND",
            ClientError::InvalidResponse(_) => "INVALID_RESPONSE",
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Network(e.to_string())
    }
}
