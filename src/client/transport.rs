//! HTTP transport with bounded exponential-backoff retry
//!
//! One logical call = up to `1 + max_retries` attempts. Callers must
//! treat the whole call as a single suspension point of capped duration.

use super::error::ClientError;
use crate::models::DataEnvelope;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry policy for transient failures
///
/// `delay = min(base_delay * 2^attempt, max_delay)`. A 409 conflict is
/// never retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10000),
        }
    }
}

impl RetryPolicy {
    /// Backoff delay before retry number `attempt + 1` (0-based attempt)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// HTTP transport bound to a base URL
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    policy: RetryPolicy,
}

impl HttpTransport {
    pub fn new(
        base_url: impl Into<String>,
        policy: RetryPolicy,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            policy,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a JSON body, decode the `{data}` envelope
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        self.send_with_retry(|| self.client.post(&url).json(body))
            .await
    }

    /// GET a resource, decode the `{data}` envelope
    pub async fn get_json<T>(&self, path: &str) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let url = self.url(path);
        self.send_with_retry(|| self.client.get(&url)).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_with_retry<T, F>(&self, build: F) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0u32;
        loop {
            match self.send_once(build()).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.policy.max_retries => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Request failed, retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                // Conflict, exhausted retries, or non-retryable: surface the last error
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once<T>(&self, req: reqwest::RequestBuilder) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let response = req.send().await?;
        let status = response.status();

        if status.as_u16() == 409 {
            return Err(ClientError::Conflict);
        }
        if !status.is_success() {
            return Err(ClientError::Http {
                status: status.as_u16(),
            });
        }

        debug!(status = status.as_u16(), "Request succeeded");
        let envelope: DataEnvelope<T> = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        Ok(envelope.data)
    }
}
