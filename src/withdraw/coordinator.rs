//! Withdrawal Lifecycle Coordinator
//!
//! Owns the authoritative in-process withdrawal state and drives
//! creation, polling, expiry and error recovery. The presentation layer
//! only reads cloned snapshots and invokes the operations below.
//!
//! Concurrency model: state mutations happen in one critical section per
//! completed operation; the lock is never held across an await. At most
//! one poll task exists per coordinator, its handle owned here.

use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::error::WithdrawError;
use super::snapshot::{PersistedSnapshot, SnapshotStore};
use super::state::{CoordinatorState, RequestState};
use crate::client::WithdrawalApi;
use crate::config::CoordinatorConfig;
use crate::models::{ErrorInfo, Withdrawal};
use crate::validation;
use chrono::Utc;
use rust_decimal::Decimal;

/// Withdrawal lifecycle coordinator
///
/// Explicitly constructed with injected dependencies; use as
/// `Arc<WithdrawCoordinator>` so the poll task can be started. Call
/// [`dispose`](Self::dispose) from the owning scope; `Drop` also aborts
/// a live poll task.
pub struct WithdrawCoordinator {
    api: Arc<dyn WithdrawalApi>,
    store: Arc<dyn SnapshotStore>,
    config: CoordinatorConfig,
    state: Arc<Mutex<CoordinatorState>>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl WithdrawCoordinator {
    pub fn new(
        api: Arc<dyn WithdrawalApi>,
        store: Arc<dyn SnapshotStore>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            api,
            store,
            config,
            state: Arc::new(Mutex::new(CoordinatorState::new())),
            poll_task: Mutex::new(None),
        }
    }

    /// Restore the persisted snapshot, read once at startup
    ///
    /// An expired snapshot (older than the expiration window) is treated
    /// as absent. Restoring never resumes polling; a caller wanting
    /// continuity re-invokes [`start_polling`](Self::start_polling).
    pub fn init(&self) {
        let snapshot = match self.store.load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "Failed to load persisted snapshot, starting fresh");
                return;
            }
        };

        if snapshot.is_expired(Utc::now(), self.config.snapshot_expiration()) {
            info!("Persisted snapshot expired, discarding");
            return;
        }

        let mut state = self.state.lock().unwrap();
        state.current_withdrawal = snapshot.current_withdrawal;
        state.last_updated = snapshot.last_updated;
        if let Some(ref withdrawal) = state.current_withdrawal {
            info!(id = %withdrawal.id, status = %withdrawal.status, "Restored withdrawal from snapshot");
        }
    }

    /// Submit a new withdrawal: `idle`/`error` -> `loading` -> `success`
    /// (stores the withdrawal, stamps `last_updated`, persists, starts
    /// polling) or `error` (stores `{message}`, no polling).
    ///
    /// Re-validates amount and destination before any network call;
    /// validation failures leave the request state untouched.
    pub async fn create(
        self: &Arc<Self>,
        amount: Decimal,
        destination: &str,
    ) -> Result<Withdrawal, WithdrawError> {
        // Re-validation: internal callers must not bypass the form rules
        if amount <= Decimal::ZERO {
            return Err(validation::ValidationError::AmountNotPositive.into());
        }
        validation::validate_destination(destination)?;

        {
            let mut state = self.state.lock().unwrap();
            state.request_state = RequestState::Loading;
            state.error = None;
        }

        match self.api.create(amount, destination).await {
            Ok(withdrawal) => {
                {
                    let mut state = self.state.lock().unwrap();
                    state.current_withdrawal = Some(withdrawal.clone());
                    state.request_state = RequestState::Success;
                    state.last_updated = Some(Utc::now());
                }
                self.persist();
                self.start_polling(withdrawal.id.clone());
                Ok(withdrawal)
            }
            Err(e) => {
                warn!(error = %e, "Withdrawal creation failed");
                let mut state = self.state.lock().unwrap();
                state.request_state = RequestState::Error;
                state.error = Some(ErrorInfo::new(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Fetch a withdrawal by id into the coordinator state
    ///
    /// Does not start polling; after a restore, continuity is the
    /// caller's explicit choice.
    pub async fn fetch_withdrawal(&self, id: &str) -> Result<Withdrawal, WithdrawError> {
        {
            let mut state = self.state.lock().unwrap();
            state.request_state = RequestState::Loading;
            state.error = None;
        }

        match self.api.fetch_by_id(id).await {
            Ok(withdrawal) => {
                {
                    let mut state = self.state.lock().unwrap();
                    state.current_withdrawal = Some(withdrawal.clone());
                    state.request_state = RequestState::Success;
                    state.last_updated = Some(Utc::now());
                }
                self.persist();
                Ok(withdrawal)
            }
            Err(e) => {
                let mut state = self.state.lock().unwrap();
                state.request_state = RequestState::Error;
                state.error = Some(ErrorInfo::new(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Begin polling the withdrawal's status on a fixed interval
    ///
    /// Idempotent restart: any previous poll task is stopped first, so at
    /// most one timer is ever active. Each tick fetches the withdrawal;
    /// a status change replaces the stored record, refreshes
    /// `last_updated` and persists. Tick failures are logged and polling
    /// continues. Polling stops itself once the status is terminal.
    pub fn start_polling(self: &Arc<Self>, id: impl Into<String>) {
        let id = id.into();
        self.stop_polling();

        self.state.lock().unwrap().is_polling = true;
        debug!(%id, interval_ms = self.config.poll_interval_ms, "Polling started");

        // The task captures only what it needs, so dropping the
        // coordinator is not kept alive by its own poll loop.
        let api = self.api.clone();
        let store = self.store.clone();
        let state = self.state.clone();
        let interval = self.config.poll_interval();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // interval fires immediately; the first status check belongs
            // one full interval after create
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let fresh = match api.fetch_by_id(&id).await {
                    Ok(w) => w,
                    Err(e) => {
                        // Non-fatal: keep the timer alive
                        warn!(%id, error = %e, "Polling fetch failed, will retry on next tick");
                        continue;
                    }
                };

                let terminal = fresh.status.is_terminal();
                let mut persistable = None;
                {
                    let mut s = state.lock().unwrap();
                    let changed = s
                        .current_withdrawal
                        .as_ref()
                        .map(|w| w.status != fresh.status)
                        .unwrap_or(true);
                    if changed {
                        info!(%id, status = %fresh.status, "Withdrawal status changed");
                        s.current_withdrawal = Some(fresh);
                        s.last_updated = Some(Utc::now());
                        persistable = Some(PersistedSnapshot {
                            current_withdrawal: s.current_withdrawal.clone(),
                            last_updated: s.last_updated,
                        });
                    }
                    if terminal {
                        s.is_polling = false;
                    }
                }

                if let Some(snapshot) = persistable
                    && let Err(e) = store.save(&snapshot)
                {
                    warn!(error = %e, "Failed to persist snapshot");
                }

                if terminal {
                    info!(%id, "Terminal status reached, polling stopped");
                    break;
                }
            }
        });

        *self.poll_task.lock().unwrap() = Some(handle);
    }

    /// Cancel the poll timer if present; safe to call when not polling
    pub fn stop_polling(&self) {
        if let Some(handle) = self.poll_task.lock().unwrap().take() {
            handle.abort();
            debug!("Polling stopped");
        }
        self.state.lock().unwrap().is_polling = false;
    }

    /// Back to `idle`: stops polling first, clears the session state and
    /// persists the cleared snapshot so a reload cannot resurrect a
    /// superseded withdrawal.
    pub fn reset(&self) {
        self.stop_polling();
        {
            let mut state = self.state.lock().unwrap();
            *state = CoordinatorState::new();
        }
        self.persist();
        info!("Coordinator reset");
    }

    /// Clear only the stored error
    pub fn clear_error(&self) {
        self.state.lock().unwrap().error = None;
    }

    /// Teardown: must be called by the owning scope
    pub fn dispose(&self) {
        self.stop_polling();
    }

    /// Read a point-in-time copy of the coordinator state
    pub fn snapshot(&self) -> CoordinatorState {
        self.state.lock().unwrap().clone()
    }

    pub fn is_polling(&self) -> bool {
        self.state.lock().unwrap().is_polling
    }

    /// Write the persisted slice of the current state
    fn persist(&self) {
        let snapshot = {
            let state = self.state.lock().unwrap();
            PersistedSnapshot {
                current_withdrawal: state.current_withdrawal.clone(),
                last_updated: state.last_updated,
            }
        };
        if let Err(e) = self.store.save(&snapshot) {
            // Persistence is best-effort; the session state stays valid
            warn!(error = %e, "Failed to persist snapshot");
        }
    }
}

impl Drop for WithdrawCoordinator {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.poll_task.lock()
            && let Some(handle) = guard.take()
        {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;
    use crate::models::WithdrawStatus;
    use crate::withdraw::snapshot::MemorySnapshotStore;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn withdrawal(id: &str, status: WithdrawStatus) -> Withdrawal {
        let now = Utc::now();
        Withdrawal {
            id: id.to_string(),
            amount: dec("100.5"),
            destination: "0x12345678901234567890".to_string(),
            status,
            created_at: now,
            updated_at: now,
        }
    }

    /// Scripted API double: create results and fetch results are played
    /// back in order; the last fetch result repeats.
    struct ScriptedApi {
        create_results: Mutex<VecDeque<Result<Withdrawal, ClientError>>>,
        fetch_results: Mutex<VecDeque<Result<Withdrawal, ClientError>>>,
        create_calls: AtomicUsize,
        fetch_calls: AtomicUsize,
    }

    impl ScriptedApi {
        fn new(
            create: Vec<Result<Withdrawal, ClientError>>,
            fetch: Vec<Result<Withdrawal, ClientError>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                create_results: Mutex::new(create.into()),
                fetch_results: Mutex::new(fetch.into()),
                create_calls: AtomicUsize::new(0),
                fetch_calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl WithdrawalApi for ScriptedApi {
        async fn create(
            &self,
            _amount: Decimal,
            _destination: &str,
        ) -> Result<Withdrawal, ClientError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            self.create_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ClientError::Network("script exhausted".into())))
        }

        async fn fetch_by_id(&self, _id: &str) -> Result<Withdrawal, ClientError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            let mut results = self.fetch_results.lock().unwrap();
            if results.len() > 1 {
                results.pop_front().unwrap()
            } else {
                results
                    .front()
                    .cloned()
                    .unwrap_or_else(|| Err(ClientError::Network("script exhausted".into())))
            }
        }
    }

    fn fast_config() -> CoordinatorConfig {
        CoordinatorConfig {
            poll_interval_ms: 10,
            ..CoordinatorConfig::default()
        }
    }

    fn coordinator(api: Arc<ScriptedApi>) -> (Arc<WithdrawCoordinator>, Arc<MemorySnapshotStore>) {
        let store = Arc::new(MemorySnapshotStore::new());
        let coordinator = Arc::new(WithdrawCoordinator::new(
            api,
            store.clone(),
            fast_config(),
        ));
        (coordinator, store)
    }

    #[tokio::test]
    async fn test_create_success_stores_and_polls() {
        let api = ScriptedApi::new(
            vec![Ok(withdrawal("wd_1", WithdrawStatus::Pending))],
            vec![Ok(withdrawal("wd_1", WithdrawStatus::Pending))],
        );
        let (coordinator, store) = coordinator(api);

        let created = coordinator.create(dec("100.5"), "0x12345678901234567890").await.unwrap();
        assert_eq!(created.id, "wd_1");

        let state = coordinator.snapshot();
        assert_eq!(state.request_state, RequestState::Success);
        assert_eq!(state.current_withdrawal.as_ref().unwrap().id, "wd_1");
        assert!(state.last_updated.is_some());
        assert!(state.is_polling);
        assert!(state.error.is_none());

        // Snapshot persisted on success
        let persisted = store.load().unwrap().unwrap();
        assert_eq!(persisted.current_withdrawal.unwrap().id, "wd_1");

        coordinator.dispose();
    }

    #[tokio::test]
    async fn test_create_failure_sets_error_without_polling() {
        let api = ScriptedApi::new(vec![Err(ClientError::Http { status: 500 })], vec![]);
        let (coordinator, store) = coordinator(api);

        let result = coordinator.create(dec("1"), "0x12345678901234567890").await;
        assert!(result.is_err());

        let state = coordinator.snapshot();
        assert_eq!(state.request_state, RequestState::Error);
        assert!(state.current_withdrawal.is_none());
        assert!(!state.is_polling);
        assert_eq!(
            state.error.unwrap().message,
            ClientError::Http { status: 500 }.to_string()
        );
        assert!(store.load().unwrap().is_none(), "nothing persisted on failure");
    }

    #[tokio::test]
    async fn test_conflict_surfaced_distinctly() {
        let api = ScriptedApi::new(vec![Err(ClientError::Conflict)], vec![]);
        let (coordinator, _) = coordinator(api);

        let err = coordinator
            .create(dec("1"), "0x12345678901234567890")
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let state = coordinator.snapshot();
        assert!(state.error.unwrap().message.contains("Idempotency conflict"));
    }

    #[tokio::test]
    async fn test_validation_never_reaches_network() {
        let api = ScriptedApi::new(vec![], vec![]);
        let (coordinator, _) = coordinator(api.clone());

        let err = coordinator
            .create(dec("0"), "0x12345678901234567890")
            .await
            .unwrap_err();
        assert!(matches!(err, WithdrawError::Validation(_)));

        let err = coordinator.create(dec("1"), "short").await.unwrap_err();
        assert!(matches!(err, WithdrawError::Validation(_)));

        assert_eq!(api.create_calls.load(Ordering::SeqCst), 0);
        // Request state untouched by validation failures
        assert_eq!(coordinator.snapshot().request_state, RequestState::Idle);
    }

    #[tokio::test]
    async fn test_poll_updates_status_and_autostops_on_terminal() {
        let api = ScriptedApi::new(
            vec![Ok(withdrawal("wd_2", WithdrawStatus::Pending))],
            vec![
                Ok(withdrawal("wd_2", WithdrawStatus::Processing)),
                Ok(withdrawal("wd_2", WithdrawStatus::Completed)),
            ],
        );
        let (coordinator, store) = coordinator(api.clone());

        coordinator.create(dec("100.5"), "0x12345678901234567890").await.unwrap();

        // Give the poll loop time to play both ticks
        tokio::time::sleep(Duration::from_millis(100)).await;

        let state = coordinator.snapshot();
        assert_eq!(
            state.current_withdrawal.unwrap().status,
            WithdrawStatus::Completed
        );
        // RequestState unaffected by withdrawal status evolution
        assert_eq!(state.request_state, RequestState::Success);
        assert!(!state.is_polling, "polling auto-stops on terminal status");

        // No further fetches after auto-stop
        let calls_after_stop = api.fetch_calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(api.fetch_calls.load(Ordering::SeqCst), calls_after_stop);

        // Terminal status persisted
        let persisted = store.load().unwrap().unwrap();
        assert_eq!(
            persisted.current_withdrawal.unwrap().status,
            WithdrawStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_poll_failures_are_non_fatal() {
        let api = ScriptedApi::new(
            vec![Ok(withdrawal("wd_3", WithdrawStatus::Pending))],
            vec![
                Err(ClientError::NotFound("wd_3".into())),
                Ok(withdrawal("wd_3", WithdrawStatus::Completed)),
            ],
        );
        let (coordinator, _) = coordinator(api);

        coordinator.create(dec("1"), "0x12345678901234567890").await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let state = coordinator.snapshot();
        // The failed tick was swallowed; the next tick landed the update
        assert_eq!(
            state.current_withdrawal.unwrap().status,
            WithdrawStatus::Completed
        );
        assert_eq!(state.request_state, RequestState::Success);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_reset_stops_polling_and_clears() {
        let api = ScriptedApi::new(
            vec![Ok(withdrawal("wd_4", WithdrawStatus::Pending))],
            vec![Ok(withdrawal("wd_4", WithdrawStatus::Pending))],
        );
        let (coordinator, store) = coordinator(api.clone());

        coordinator.create(dec("1"), "0x12345678901234567890").await.unwrap();
        assert!(coordinator.is_polling());

        coordinator.reset();

        let state = coordinator.snapshot();
        assert_eq!(state.request_state, RequestState::Idle);
        assert!(state.current_withdrawal.is_none());
        assert!(state.last_updated.is_none());
        assert!(!state.is_polling);

        // No fetches occur after reset, even past another interval
        let calls = api.fetch_calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(api.fetch_calls.load(Ordering::SeqCst), calls);

        // The cleared snapshot is persisted
        let persisted = store.load().unwrap().unwrap();
        assert!(persisted.current_withdrawal.is_none());
        assert!(persisted.last_updated.is_none());
    }

    #[tokio::test]
    async fn test_stop_polling_is_idempotent() {
        let api = ScriptedApi::new(vec![], vec![]);
        let (coordinator, _) = coordinator(api);

        // Safe when no poll was ever started
        coordinator.stop_polling();
        coordinator.stop_polling();
        assert!(!coordinator.is_polling());
    }

    #[tokio::test]
    async fn test_restart_replaces_previous_timer() {
        let api = ScriptedApi::new(
            vec![],
            vec![Ok(withdrawal("wd_5", WithdrawStatus::Pending))],
        );
        let (coordinator, _) = coordinator(api.clone());

        coordinator.start_polling("wd_5");
        coordinator.start_polling("wd_5");
        assert!(coordinator.is_polling());

        // A doubled timer would produce ~2 fetches per interval
        tokio::time::sleep(Duration::from_millis(105)).await;
        coordinator.stop_polling();
        let calls = api.fetch_calls.load(Ordering::SeqCst);
        assert!(
            calls <= 11,
            "expected single-timer call rate, got {calls}"
        );
    }

    #[tokio::test]
    async fn test_clear_error_leaves_rest_untouched() {
        let api = ScriptedApi::new(vec![Err(ClientError::Http { status: 503 })], vec![]);
        let (coordinator, _) = coordinator(api);

        let _ = coordinator.create(dec("1"), "0x12345678901234567890").await;
        assert!(coordinator.snapshot().error.is_some());

        coordinator.clear_error();
        let state = coordinator.snapshot();
        assert!(state.error.is_none());
        // Only the error is cleared
        assert_eq!(state.request_state, RequestState::Error);
    }

    #[tokio::test]
    async fn test_init_restores_fresh_snapshot() {
        let api = ScriptedApi::new(vec![], vec![]);
        let store = Arc::new(MemorySnapshotStore::new());
        store.seed(PersistedSnapshot {
            current_withdrawal: Some(withdrawal("wd_restored", WithdrawStatus::Processing)),
            last_updated: Some(Utc::now() - chrono::Duration::minutes(4)),
        });

        let coordinator = Arc::new(WithdrawCoordinator::new(api, store, fast_config()));
        coordinator.init();

        let state = coordinator.snapshot();
        assert_eq!(state.current_withdrawal.unwrap().id, "wd_restored");
        // Restore never resumes polling
        assert!(!state.is_polling);
        assert_eq!(state.request_state, RequestState::Idle);
    }

    #[tokio::test]
    async fn test_init_discards_expired_snapshot() {
        let api = ScriptedApi::new(vec![], vec![]);
        let store = Arc::new(MemorySnapshotStore::new());
        store.seed(PersistedSnapshot {
            current_withdrawal: Some(withdrawal("wd_stale", WithdrawStatus::Processing)),
            last_updated: Some(Utc::now() - chrono::Duration::minutes(6)),
        });

        let coordinator = Arc::new(WithdrawCoordinator::new(api, store, fast_config()));
        coordinator.init();

        let state = coordinator.snapshot();
        assert!(state.current_withdrawal.is_none());
        assert!(state.last_updated.is_none());
    }

    #[tokio::test]
    async fn test_retry_after_failed_is_a_fresh_create() {
        // User-initiated retry after a failed withdrawal: same amount and
        // destination, brand-new create call and id.
        let api = ScriptedApi::new(
            vec![
                Ok(withdrawal("wd_6", WithdrawStatus::Pending)),
                Ok(withdrawal("wd_7", WithdrawStatus::Pending)),
            ],
            vec![Ok(withdrawal("wd_6", WithdrawStatus::Failed))],
        );
        let (coordinator, _) = coordinator(api.clone());

        coordinator.create(dec("100.5"), "0x12345678901234567890").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let failed = coordinator.snapshot().current_withdrawal.unwrap();
        assert_eq!(failed.status, WithdrawStatus::Failed);
        assert!(!coordinator.is_polling(), "terminal status stopped polling");

        let retried = coordinator
            .create(failed.amount, &failed.destination)
            .await
            .unwrap();
        assert_eq!(retried.id, "wd_7");
        assert_eq!(api.create_calls.load(Ordering::SeqCst), 2);

        coordinator.dispose();
    }

    #[tokio::test]
    async fn test_fetch_withdrawal_does_not_poll() {
        let api = ScriptedApi::new(
            vec![],
            vec![Ok(withdrawal("wd_8", WithdrawStatus::Processing))],
        );
        let (coordinator, store) = coordinator(api);

        let fetched = coordinator.fetch_withdrawal("wd_8").await.unwrap();
        assert_eq!(fetched.status, WithdrawStatus::Processing);

        let state = coordinator.snapshot();
        assert_eq!(state.request_state, RequestState::Success);
        assert!(!state.is_polling);
        assert!(store.load().unwrap().is_some(), "fetch success persists");
    }
}
