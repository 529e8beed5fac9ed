//! Withdrawal Data Model
//!
//! Wire-compatible types for the withdrawals API: the withdrawal record,
//! its status lifecycle, and the request/response envelopes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Withdrawal lifecycle status
///
/// Transitions only move forward: PENDING -> PROCESSING -> COMPLETED,
/// or to FAILED from any non-terminal state.
/// Terminal states: COMPLETED, FAILED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawStatus {
    /// Accepted by the server, not yet picked up
    Pending,
    /// Being executed
    Processing,
    /// Terminal: funds sent
    Completed,
    /// Terminal: execution failed
    Failed,
}

impl WithdrawStatus {
    /// Check if this is a terminal status (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, WithdrawStatus::Completed | WithdrawStatus::Failed)
    }

    /// Check whether a server-reported transition is legal
    pub fn can_transition_to(&self, next: WithdrawStatus) -> bool {
        if *self == next {
            return true;
        }
        match self {
            WithdrawStatus::Pending => matches!(
                next,
                WithdrawStatus::Processing | WithdrawStatus::Completed | WithdrawStatus::Failed
            ),
            WithdrawStatus::Processing => {
                matches!(next, WithdrawStatus::Completed | WithdrawStatus::Failed)
            }
            WithdrawStatus::Completed | WithdrawStatus::Failed => false,
        }
    }

    /// Get the wire/display name
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawStatus::Pending => "pending",
            WithdrawStatus::Processing => "processing",
            WithdrawStatus::Completed => "completed",
            WithdrawStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for WithdrawStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WithdrawStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WithdrawStatus::Pending),
            "processing" => Ok(WithdrawStatus::Processing),
            "completed" => Ok(WithdrawStatus::Completed),
            "failed" => Ok(WithdrawStatus::Failed),
            _ => Err(format!("Invalid withdraw status: {}", s)),
        }
    }
}

/// A withdrawal request as acknowledged by the server
///
/// `updated_at` changes iff `status` changes; `updated_at >= created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawal {
    pub id: String,
    pub amount: Decimal,
    pub destination: String,
    pub status: WithdrawStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of POST /withdrawals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWithdrawalRequest {
    pub amount: Decimal,
    pub destination: String,
    pub idempotency_key: String,
}

/// Success envelope: `{"data": ...}`
#[derive(Debug, Serialize, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

/// Error envelope: `{"error": "..."}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
}

/// The single error shape the coordinator exposes to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub message: String,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
