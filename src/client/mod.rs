//! Withdrawals API client. The retrying transport and the service client
//! the coordinator is built on, plus the shared error taxonomy.

pub mod error;
pub mod transport;
pub mod withdrawals;

pub use error::ClientError;
pub use transport::{HttpTransport, RetryPolicy};
pub use withdrawals::{WithdrawalApi, WithdrawalsClient};
