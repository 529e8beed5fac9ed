//! Withdrawal lifecycle coordination
//!
//! The coordinator is the single source of truth consumed by the
//! presentation layer: it drives creation, status polling, snapshot
//! expiry and error recovery over the withdrawals API client.

pub mod coordinator;
pub mod error;
pub mod snapshot;
pub mod state;

pub use coordinator::WithdrawCoordinator;
pub use error::WithdrawError;
pub use snapshot::{
    FileSnapshotStore, MemorySnapshotStore, PersistedSnapshot, SnapshotError, SnapshotStore,
    STORAGE_KEY,
};
pub use state::{CoordinatorState, RequestState};
