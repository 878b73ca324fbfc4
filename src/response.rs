//! Response classification and decoding.
//!
//! Statuses 200..=299 are successes. Anything else becomes an [`ApiError`]
//! carrying the best-effort message of the error body. On success the body
//! goes where the caller's [`Target`] says: nowhere, into a JSON value, or
//! verbatim into a writer.

use log::debug;
use reqwest::header::HeaderMap;
use reqwest::{Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::io::Write;

use crate::error::{ApiError, EdgeError, Result};

/// Status line and headers of a response, plus the request it answers.
#[derive(Debug, Clone)]
pub struct Envelope {
    status: StatusCode,
    headers: HeaderMap,
    method: Method,
    url: Url,
}

impl Envelope {
    pub fn new(status: StatusCode, headers: HeaderMap, method: Method, url: Url) -> Self {
        Self {
            status,
            headers,
            method,
            url,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status.as_u16())
    }
}

enum Body {
    Pending(Response),
    Buffered(Vec<u8>),
}

/// A response straight off the transport, body not yet consumed.
///
/// Dropping it releases the connection.
pub struct RawResponse {
    envelope: Envelope,
    body: Body,
}

impl RawResponse {
    pub fn new(method: Method, response: Response) -> Self {
        let envelope = Envelope::new(
            response.status(),
            response.headers().clone(),
            method,
            response.url().clone(),
        );
        Self {
            envelope,
            body: Body::Pending(response),
        }
    }

    /// A response whose body has already been read, e.g. for a debug dump.
    pub fn buffered(envelope: Envelope, body: Vec<u8>) -> Self {
        Self {
            envelope,
            body: Body::Buffered(body),
        }
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Reads the whole body into memory.
    pub async fn into_bytes(self) -> Result<(Envelope, Vec<u8>)> {
        let bytes = match self.body {
            Body::Pending(response) => response.bytes().await.map_err(EdgeError::Body)?.to_vec(),
            Body::Buffered(bytes) => bytes,
        };
        Ok((self.envelope, bytes))
    }

    /// Copies the body into `writer` chunk by chunk. Returns the byte count.
    async fn copy_to(self, writer: &mut (dyn Write + Send)) -> Result<(Envelope, u64)> {
        let copied = match self.body {
            Body::Pending(mut response) => {
                let mut copied: u64 = 0;
                while let Some(chunk) = response.chunk().await.map_err(EdgeError::Body)? {
                    writer.write_all(&chunk)?;
                    copied += chunk.len() as u64;
                }
                copied
            }
            Body::Buffered(bytes) => {
                writer.write_all(&bytes)?;
                bytes.len() as u64
            }
        };
        writer.flush()?;
        Ok((self.envelope, copied))
    }
}

/// Anything a JSON body can be decoded into.
pub trait DecodeJson: Send {
    fn decode_json(&mut self, body: &[u8]) -> serde_json::Result<()>;
}

impl<T: DeserializeOwned + Send> DecodeJson for T {
    fn decode_json(&mut self, body: &[u8]) -> serde_json::Result<()> {
        *self = serde_json::from_slice(body)?;
        Ok(())
    }
}

/// Where a successful response body should go.
pub enum Target<'a> {
    /// Drop the body unread.
    Discard,
    /// Decode the body as JSON into the referenced value.
    Json(&'a mut dyn DecodeJson),
    /// Copy the raw body into a writer, without JSON interpretation.
    Stream(&'a mut (dyn Write + Send)),
}

impl<'a> Target<'a> {
    pub fn json<T: DeserializeOwned + Send>(value: &'a mut T) -> Self {
        Target::Json(value)
    }

    pub fn stream<W: Write + Send>(writer: &'a mut W) -> Self {
        Target::Stream(writer)
    }
}

/// Pulls a message out of an error body. Unknown shapes yield an empty string.
///
/// `message` wins over Apigee's `fault.faultstring`; each is looked up on its
/// own so unrelated fields of any type do not matter.
pub fn error_message(body: &[u8]) -> String {
    let Ok(value) = serde_json::from_slice::<Value>(body) else {
        return String::new();
    };
    value
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| value.pointer("/fault/faultstring").and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

/// Classifies `raw` and routes its body into `target`.
///
/// The body is consumed (or dropped) on every path before this returns.
pub async fn classify(raw: RawResponse, target: Target<'_>) -> Result<Envelope> {
    if !raw.envelope().is_success() {
        let envelope = raw.envelope().clone();
        // The status alone makes this an error; an unreadable body only
        // costs the message.
        let body = match raw.into_bytes().await {
            Ok((_, body)) => body,
            Err(e) => {
                debug!("{} {}: cannot read error body: {}", envelope.method(), envelope.url(), e);
                Vec::new()
            }
        };
        let message = error_message(&body);
        debug!(
            "{} {} failed with {}: {:?}",
            envelope.method(),
            envelope.url(),
            envelope.status(),
            message
        );
        return Err(ApiError::new(envelope, message).into());
    }

    match target {
        Target::Discard => Ok(raw.envelope),
        Target::Stream(writer) => {
            let (envelope, copied) = raw.copy_to(writer).await?;
            debug!("Streamed {} bytes from {}", copied, envelope.url());
            Ok(envelope)
        }
        Target::Json(value) => {
            let (envelope, body) = raw.into_bytes().await?;
            value.decode_json(&body).map_err(EdgeError::Decode)?;
            Ok(envelope)
        }
    }
}
