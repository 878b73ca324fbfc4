//! Retry logic for transport failures.
//!
//! Only failures to get an answer at all (refused or reset connections,
//! timeouts) are retried. HTTP error statuses are answers and pass through.

use log::{debug, warn};
use reqwest::{Request, Response};
use std::time::Duration;

use super::Transport;
use crate::config::{DEFAULT_BACKOFF_UNIT, DEFAULT_MAX_RETRIES};
use crate::error::{EdgeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included. Never below 1.
    pub max_attempts: usize,
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_BACKOFF_UNIT)
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, backoff_unit: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_unit,
        }
    }

    /// A single attempt, no waiting.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Wait before the retry that follows failed attempt number `attempt`.
    pub fn delay(&self, attempt: usize) -> Duration {
        self.backoff_unit
            .saturating_mul(u32::try_from(attempt).unwrap_or(u32::MAX))
    }
}

/// Whether a transport error is worth another attempt.
pub fn is_retryable(error: &reqwest::Error) -> bool {
    if error.is_builder() || error.is_redirect() || error.status().is_some() {
        return false;
    }
    error.is_connect() || error.is_timeout() || error.is_request()
}

/// Sends `request`, retrying transport failures according to `policy`.
///
/// A request whose body cannot be cloned gets a single attempt.
#[tracing::instrument(skip(transport, request), fields(method = %request.method(), url = %request.url()))]
pub async fn send_with_retry<T: Transport + ?Sized>(
    transport: &T,
    policy: &RetryPolicy,
    request: Request,
) -> Result<Response> {
    let attempts = policy.max_attempts.max(1);
    let method = request.method().clone();
    let url = request.url().clone();

    let mut request = request;
    let mut attempt = 0;

    loop {
        attempt += 1;
        let next = if attempt < attempts {
            request.try_clone()
        } else {
            None
        };

        match transport.send(request).await {
            Ok(response) => return Ok(response),
            Err(e) => {
                let Some(next) = next.filter(|_| is_retryable(&e)) else {
                    debug!("{} {}: giving up after attempt {}: {}", method, url, attempt, e);
                    return Err(EdgeError::Transport {
                        attempts: attempt,
                        source: e,
                    });
                };

                let delay = policy.delay(attempt);
                warn!(
                    "{} {}: attempt {}/{} failed ({}), retrying in {:?}...",
                    method, url, attempt, attempts, e, delay
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                request = next;
            }
        }
    }
}
