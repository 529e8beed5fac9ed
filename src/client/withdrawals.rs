//! Withdrawal service client
//!
//! The HTTP-backed implementation of [`WithdrawalApi`] is the
//! authoritative contract; test doubles implement the same trait.

use super::error::ClientError;
use super::transport::HttpTransport;
use crate::idempotency;
use crate::models::{CreateWithdrawalRequest, Withdrawal};
use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{debug, info};

/// The seam between the coordinator and the withdrawals API
#[async_trait]
pub trait WithdrawalApi: Send + Sync {
    /// Submit a withdrawal request. One idempotency key per logical
    /// attempt; transport retries reuse the same key.
    async fn create(&self, amount: Decimal, destination: &str) -> Result<Withdrawal, ClientError>;

    /// Fetch the current server-side state of a withdrawal
    async fn fetch_by_id(&self, id: &str) -> Result<Withdrawal, ClientError>;
}

/// HTTP-backed withdrawals client
pub struct WithdrawalsClient {
    transport: HttpTransport,
}

impl WithdrawalsClient {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl WithdrawalApi for WithdrawalsClient {
    async fn create(&self, amount: Decimal, destination: &str) -> Result<Withdrawal, ClientError> {
        // Generated once, before the first network call; the transport
        // resends the identical body on every retry.
        let idempotency_key = idempotency::generate_key();
        debug!(%idempotency_key, "Submitting withdrawal");

        let request = CreateWithdrawalRequest {
            amount,
            destination: destination.to_string(),
            idempotency_key,
        };

        let withdrawal: Withdrawal = self.transport.post_json("/withdrawals", &request).await?;
        info!(
            id = %withdrawal.id,
            status = %withdrawal.status,
            "Withdrawal created"
        );
        Ok(withdrawal)
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Withdrawal, ClientError> {
        let path = format!("/withdrawals/{}", id);
        match self.transport.get_json::<Withdrawal>(&path).await {
            Ok(withdrawal) => Ok(withdrawal),
            // The retry policy has already run its course by the time a
            // 404 reaches us; name the failure for the caller.
            Err(ClientError::Http { status: 404 }) => Err(ClientError::NotFound(id.to_string())),
            Err(e) => Err(e),
        }
    }
}
