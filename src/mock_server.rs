//! Mock in-memory withdrawals API
//!
//! Test double for local development and integration tests; the
//! HTTP-backed client contract is authoritative. Gated behind the
//! `mock-api` feature, which must be disabled in production builds.
//!
//! Status progression is deterministic: each withdrawal carries a status
//! script and every successful GET advances it one step. Scripts are
//! settable per test; `fail_next` injects 500s for retry tests.

use crate::models::{
    CreateWithdrawalRequest, DataEnvelope, ErrorEnvelope, WithdrawStatus, Withdrawal,
};
use axum::routing::{get, post};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

/// Default status script: pending -> processing -> completed
const DEFAULT_SCRIPT: [WithdrawStatus; 2] = [WithdrawStatus::Processing, WithdrawStatus::Completed];

struct StoredWithdrawal {
    withdrawal: Withdrawal,
    script: VecDeque<WithdrawStatus>,
}

/// Shared state of the mock API
#[derive(Default)]
pub struct MockApiState {
    withdrawals: DashMap<String, StoredWithdrawal>,
    used_keys: DashMap<String, String>,
    fail_next: AtomicUsize,
    create_hits: AtomicUsize,
    fetch_hits: AtomicUsize,
}

impl MockApiState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make the next `n` requests fail with 500
    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Replace the remaining status script of a withdrawal
    pub fn set_script(&self, id: &str, script: Vec<WithdrawStatus>) {
        if let Some(mut entry) = self.withdrawals.get_mut(id) {
            entry.script = script.into();
        }
    }

    /// Direct read of the stored record (assertions in tests)
    pub fn get(&self, id: &str) -> Option<Withdrawal> {
        self.withdrawals.get(id).map(|e| e.withdrawal.clone())
    }

    /// Injected failures not yet consumed
    pub fn remaining_failures(&self) -> usize {
        self.fail_next.load(Ordering::SeqCst)
    }

    /// Total POST /withdrawals attempts seen, failures included
    pub fn create_hits(&self) -> usize {
        self.create_hits.load(Ordering::SeqCst)
    }

    /// Total GET /withdrawals/{id} attempts seen, failures included
    pub fn fetch_hits(&self) -> usize {
        self.fetch_hits.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> bool {
        self.fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

type ApiReply<T> = Result<(StatusCode, Json<DataEnvelope<T>>), (StatusCode, Json<ErrorEnvelope>)>;

fn reply_error<T>(status: StatusCode, message: &str) -> ApiReply<T> {
    Err((
        status,
        Json(ErrorEnvelope {
            error: message.to_string(),
        }),
    ))
}

/// POST /withdrawals
///
/// 201 `{data}` on first use of an idempotency key, 409 `{error}` on
/// reuse. The key is the duplicate-detection handle, not the record id.
async fn create_withdrawal(
    State(state): State<Arc<MockApiState>>,
    Json(req): Json<CreateWithdrawalRequest>,
) -> ApiReply<Withdrawal> {
    state.create_hits.fetch_add(1, Ordering::SeqCst);
    if state.take_failure() {
        return reply_error(StatusCode::INTERNAL_SERVER_ERROR, "Injected failure");
    }

    let id = format!("wd_{}", Uuid::new_v4().simple());
    match state.used_keys.entry(req.idempotency_key.clone()) {
        dashmap::mapref::entry::Entry::Occupied(_) => {
            return reply_error(
                StatusCode::CONFLICT,
                "Conflict: Idempotency key already exists",
            );
        }
        dashmap::mapref::entry::Entry::Vacant(vacant) => {
            vacant.insert(id.clone());
        }
    }

    let now = Utc::now();
    let withdrawal = Withdrawal {
        id: id.clone(),
        amount: req.amount,
        destination: req.destination,
        status: WithdrawStatus::Pending,
        created_at: now,
        updated_at: now,
    };
    state.withdrawals.insert(
        id.clone(),
        StoredWithdrawal {
            withdrawal: withdrawal.clone(),
            script: DEFAULT_SCRIPT.into(),
        },
    );

    info!(%id, key = %req.idempotency_key, "Mock withdrawal created");
    Ok((StatusCode::CREATED, Json(DataEnvelope { data: withdrawal })))
}

/// GET /withdrawals/{id}
///
/// 200 `{data}` or 404 `{error}`. Advances the status script one step
/// per successful read.
async fn get_withdrawal(
    State(state): State<Arc<MockApiState>>,
    Path(id): Path<String>,
) -> ApiReply<Withdrawal> {
    state.fetch_hits.fetch_add(1, Ordering::SeqCst);
    if state.take_failure() {
        return reply_error(StatusCode::INTERNAL_SERVER_ERROR, "Injected failure");
    }

    let Some(mut entry) = state.withdrawals.get_mut(&id) else {
        return reply_error(StatusCode::NOT_FOUND, "Not found");
    };

    if let Some(next) = entry.script.pop_front() {
        debug_assert!(entry.withdrawal.status.can_transition_to(next));
        entry.withdrawal.status = next;
        entry.withdrawal.updated_at = Utc::now();
    }

    Ok((
        StatusCode::OK,
        Json(DataEnvelope {
            data: entry.withdrawal.clone(),
        }),
    ))
}

pub fn router(state: Arc<MockApiState>) -> Router {
    Router::new()
        .route("/withdrawals", post(create_withdrawal))
        .route("/withdrawals/{id}", get(get_withdrawal))
        .with_state(state)
}

/// Bind an ephemeral local port and serve the mock API
pub async fn serve(state: Arc<MockApiState>) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = router(state);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "Mock API server stopped");
        }
    });

    info!(%addr, "Mock withdrawals API listening");
    Ok((addr, handle))
}
