//! HTTP transport with linear-backoff retries on connection-level failures.

mod retry;
mod transport;

pub use retry::{RetryPolicy, is_retryable, send_with_retry};
pub use transport::{ReqwestTransport, Transport};
