//! Coordinator Error Types

use crate::client::ClientError;
use crate::validation::ValidationError;
use thiserror::Error;

/// Coordinator-level error
///
/// Validation failures never reach the network; client errors arrive with
/// the transport retry policy already exhausted.
#[derive(Error, Debug, Clone)]
pub enum WithdrawError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Client(#[from] ClientError),
}

impl WithdrawError {
    /// Whether the failure is the user-facing idempotency conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, WithdrawError::Client(ClientError::Conflict))
    }
}
