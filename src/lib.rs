//! withdraw-flow - Withdrawal Lifecycle Client
//!
//! A client-side withdrawal request lifecycle: idempotent creation with
//! conflict detection, a retry-with-backoff HTTP transport, and a polling
//! coordinator that tracks server status until it turns terminal.
//!
//! # Modules
//!
//! - [`models`] - Withdrawal record, status lifecycle, wire envelopes
//! - [`validation`] - Client-side form rules (never reach the network)
//! - [`idempotency`] - One key per logical creation attempt
//! - [`client`] - Error taxonomy, retrying transport, service client
//! - [`withdraw`] - The lifecycle coordinator and snapshot persistence
//! - [`config`] / [`logging`] - Embedding-application plumbing
//! - [`mock_server`] - In-memory API double (feature `mock-api`)

pub mod client;
pub mod config;
pub mod idempotency;
pub mod logging;
pub mod models;
pub mod validation;
pub mod withdraw;

#[cfg(feature = "mock-api")]
pub mod mock_server;

// Convenient re-exports at crate root
pub use client::{ClientError, HttpTransport, RetryPolicy, WithdrawalApi, WithdrawalsClient};
pub use config::{AppConfig, ApiConfig, CoordinatorConfig};
pub use models::{CreateWithdrawalRequest, ErrorInfo, WithdrawStatus, Withdrawal};
pub use validation::{ValidationError, WithdrawForm};
pub use withdraw::{
    CoordinatorState, PersistedSnapshot, RequestState, SnapshotStore, WithdrawCoordinator,
    WithdrawError,
};
