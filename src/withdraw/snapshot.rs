//! Persisted snapshot store
//!
//! A single named blob written on every successful create/fetch and read
//! once at startup. The persistence mechanism is an opaque key-value
//! store behind [`SnapshotStore`]; everything else in the coordinator is
//! session-only.

use crate::models::Withdrawal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Fixed storage key the blob is written under
pub const STORAGE_KEY: &str = "withdraw-storage";

/// The persisted slice of coordinator state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSnapshot {
    pub current_withdrawal: Option<Withdrawal>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl PersistedSnapshot {
    /// A snapshot older than the expiration window is treated as absent.
    /// Snapshots without a timestamp are always expired.
    pub fn is_expired(&self, now: DateTime<Utc>, window: Duration) -> bool {
        match self.last_updated {
            Some(ts) => {
                let age = now.signed_duration_since(ts);
                age > chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX)
            }
            None => true,
        }
    }
}

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Snapshot IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Opaque blob store for the persisted snapshot
///
/// Writes are synchronous; a single coordinator instance is the only
/// writer per process/session.
pub trait SnapshotStore: Send + Sync {
    fn load(&self) -> Result<Option<PersistedSnapshot>, SnapshotError>;
    fn save(&self, snapshot: &PersistedSnapshot) -> Result<(), SnapshotError>;
}

/// JSON-file-backed store
pub struct FileSnapshotStore {
    path: PathBuf,
}

/// On-disk layout: the blob keyed under [`STORAGE_KEY`]
#[derive(Serialize, Deserialize)]
struct StoredBlob {
    #[serde(rename = "withdraw-storage")]
    state: PersistedSnapshot,
}

impl FileSnapshotStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Result<Option<PersistedSnapshot>, SnapshotError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let blob: StoredBlob = serde_json::from_str(&content)?;
        debug!(path = %self.path.display(), "Loaded persisted snapshot");
        Ok(Some(blob.state))
    }

    fn save(&self, snapshot: &PersistedSnapshot) -> Result<(), SnapshotError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let blob = StoredBlob {
            state: snapshot.clone(),
        };
        std::fs::write(&self.path, serde_json::to_vec(&blob)?)?;
        Ok(())
    }
}

/// In-memory store, for tests and embedders without durable storage
#[derive(Default)]
pub struct MemorySnapshotStore {
    inner: Mutex<Option<PersistedSnapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed the stored blob (restore-path tests)
    pub fn seed(&self, snapshot: PersistedSnapshot) {
        *self.inner.lock().unwrap() = Some(snapshot);
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Result<Option<PersistedSnapshot>, SnapshotError> {
        Ok(self.inner.lock().unwrap().clone())
    }

    fn save(&self, snapshot: &PersistedSnapshot) -> Result<(), SnapshotError> {
        *self.inner.lock().unwrap() = Some(snapshot.clone());
        Ok(())
    }
}
