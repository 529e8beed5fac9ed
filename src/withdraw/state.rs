//! Coordinator State Definitions
//!
//! `RequestState` describes the outcome of the most recent create/fetch
//! call. It is independent of `WithdrawStatus`: once a create succeeds the
//! request state stays SUCCESS while the underlying withdrawal status
//! keeps evolving via polling.

use crate::models::{ErrorInfo, Withdrawal};
use chrono::{DateTime, Utc};
use std::fmt;

/// Client-visible request state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RequestState {
    /// No request in flight and no result held
    #[default]
    Idle,
    /// A create/fetch call is in flight
    Loading,
    /// The most recent call resolved
    Success,
    /// The most recent call failed; the error is held alongside
    Error,
}

impl RequestState {
    #[inline]
    pub fn is_loading(&self) -> bool {
        matches!(self, RequestState::Loading)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestState::Idle => "idle",
            RequestState::Loading => "loading",
            RequestState::Success => "success",
            RequestState::Error => "error",
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The coordinator's full session state
///
/// Exclusively owned by the coordinator; the presentation layer only ever
/// sees a cloned snapshot of this.
#[derive(Debug, Clone, Default)]
pub struct CoordinatorState {
    pub current_withdrawal: Option<Withdrawal>,
    pub request_state: RequestState,
    pub error: Option<ErrorInfo>,
    pub last_updated: Option<DateTime<Utc>>,
    pub is_polling: bool,
}

impl CoordinatorState {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        let state = CoordinatorState::new();
        assert_eq!(state.request_state, RequestState::Idle);
        assert!(state.current_withdrawal.is_none());
        assert!(state.error.is_none());
        assert!(state.last_updated.is_none());
        assert!(!state.is_polling);
    }

    #[test]
    fn test_display() {
        assert_eq!(RequestState::Idle.to_string(), "idle");
        assert_eq!(RequestState::Loading.to_string(), "loading");
        assert_eq!(RequestState::Success.to_string(), "success");
        assert_eq!(RequestState::Error.to_string(), "error");
    }

    #[test]
    fn test_is_loading() {
        assert!(RequestState::Loading.is_loading());
        assert!(!RequestState::Success.is_loading());
    }
}
