//! Error taxonomy for the management API client.

use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode, Url};
use thiserror::Error;

use crate::response::Envelope;

pub type Result<T, E = EdgeError> = std::result::Result<T, E>;

/// Errors returned by the client and its resource services.
#[derive(Debug, Error)]
pub enum EdgeError {
    /// The client options are unusable (bad management URL, empty org).
    #[error("invalid client configuration: {0}")]
    Config(String),

    /// No authentication could be resolved. Fatal to client construction.
    #[error("no usable credentials: {0}")]
    Credential(String),

    /// The request could not be built from the given path or payload.
    #[error("cannot build request: {0}")]
    Build(String),

    /// The transport failed on every attempt it was allowed.
    #[error("request failed after {attempts} attempt(s): {source}")]
    Transport {
        attempts: usize,
        #[source]
        source: reqwest::Error,
    },

    /// The response body could not be read off the connection.
    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The server answered 2xx but the body does not match the expected shape.
    #[error("cannot decode response body: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EdgeError {
    /// Returns the API error when this is a non-2xx response.
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            EdgeError::Api(err) => Some(err),
            _ => None,
        }
    }
}

/// A non-2xx response from the management API.
///
/// The envelope is kept so callers can still look at the status and headers
/// (rate-limit hints, request ids) of a failed call.
#[derive(Debug, Clone, Error)]
#[error("{} {}: {} {}", .envelope.method(), .envelope.url(), .envelope.status().as_u16(), .message)]
pub struct ApiError {
    envelope: Envelope,
    message: String,
}

impl ApiError {
    pub fn new(envelope: Envelope, message: impl Into<String>) -> Self {
        Self {
            envelope,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.envelope.status()
    }

    pub fn method(&self) -> &Method {
        self.envelope.method()
    }

    pub fn url(&self) -> &Url {
        self.envelope.url()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.envelope.headers()
    }

    /// Message extracted from the error body; empty when the body had none.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == StatusCode::NOT_FOUND
    }

    /// Whether a caller may reasonably retry the call later (429 or 5xx).
    pub fn is_retryable(&self) -> bool {
        let status = self.status();
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }
}
