//! The seam between the client and the network.

use async_trait::async_trait;
use reqwest::{Client, Request, Response};
use std::time::Duration;

use crate::error::{EdgeError, Result};

/// Sends one fully built request and returns whatever the server answered.
///
/// Implementations must not interpret HTTP status codes: a 4xx or 5xx is a
/// successful send.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response, reqwest::Error>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a transport whose attempts are bounded by `timeout`.
    pub fn with_timeout(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| EdgeError::Config(format!("cannot create HTTP client: {}", e)))?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: Request) -> Result<Response, reqwest::Error> {
        self.client.execute(request).await
    }
}
