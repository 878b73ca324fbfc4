//! The management API client.
//!
//! Every resource operation goes through the same three steps:
//! [`EdgeClient::build`] a request, [`EdgeClient::execute`] it with retries,
//! then [`EdgeClient::classify`] the answer. [`EdgeClient::perform`] chains
//! them for the common case.

use log::{debug, warn};
use reqwest::header::HeaderMap;
use reqwest::{Method, Request, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Write as _;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::auth::{Credential, resolve_credential};
use crate::config::{DEFAULT_USER_AGENT, EdgeClientOptions};
use crate::error::{EdgeError, Result};
use crate::http::{ReqwestTransport, RetryPolicy, Transport, send_with_retry};
use crate::request::{Payload, RequestFactory};
use crate::response::{Envelope, RawResponse, Target, classify};
use crate::runtime::{RealRuntime, Runtime};

/// What a completion callback gets to see of the request.
#[derive(Debug, Clone)]
pub struct RequestSummary {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
}

impl From<&Request> for RequestSummary {
    fn from(request: &Request) -> Self {
        Self {
            method: request.method().clone(),
            url: request.url().clone(),
            headers: request.headers().clone(),
        }
    }
}

/// Called after every response, before the caller sees it.
pub type RequestCompletionCallback = Arc<dyn Fn(&RequestSummary, &Envelope) + Send + Sync>;

pub struct EdgeClient {
    factory: RequestFactory,
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    debug: bool,
    on_request_completed: Option<RequestCompletionCallback>,
}

impl std::fmt::Debug for EdgeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeClient")
            .field("factory", &self.factory)
            .field("retry", &self.retry)
            .field("debug", &self.debug)
            .field("on_request_completed", &self.on_request_completed.is_some())
            .finish()
    }
}

impl EdgeClient {
    /// Creates a client, resolving credentials from the real environment.
    pub fn new(options: EdgeClientOptions) -> Result<Self> {
        Self::with_runtime(options, &RealRuntime)
    }

    pub fn with_runtime<R: Runtime + ?Sized>(options: EdgeClientOptions, runtime: &R) -> Result<Self> {
        let transport = ReqwestTransport::with_timeout(options.timeout)?;
        Self::with_transport(options, runtime, Arc::new(transport))
    }

    /// Creates a client that sends through `transport`.
    #[tracing::instrument(skip(runtime, transport))]
    pub fn with_transport<R: Runtime + ?Sized>(
        options: EdgeClientOptions,
        runtime: &R,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let base_url = options.base_url()?;
        let host = match (base_url.host_str(), base_url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(EdgeError::Config(format!("base URL {} has no host", base_url)));
            }
        };
        let credential = resolve_credential(runtime, options.auth.as_ref(), &host)?;

        let user_agent = options
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        debug!("Edge client for {} ({})", base_url, user_agent);
        if options.debug {
            warn!("Debug dumps are enabled; Authorization headers will be logged");
        }

        Ok(Self {
            factory: RequestFactory::new(base_url, user_agent, credential),
            transport,
            retry: options.retry_policy(),
            debug: options.debug,
            on_request_completed: None,
        })
    }

    pub fn base_url(&self) -> &Url {
        self.factory.base_url()
    }

    pub fn user_agent(&self) -> &str {
        self.factory.user_agent()
    }

    pub fn credential(&self) -> &Credential {
        self.factory.credential()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Registers a callback run after every response is received.
    ///
    /// A panicking callback is logged and otherwise ignored.
    pub fn on_request_completed<F>(&mut self, callback: F)
    where
        F: Fn(&RequestSummary, &Envelope) + Send + Sync + 'static,
    {
        self.on_request_completed = Some(Arc::new(callback));
    }

    /// See [`RequestFactory::build`].
    pub fn build(
        &self,
        method: Method,
        path: &str,
        payload: Payload,
        content_type_override: Option<&str>,
    ) -> Result<Request> {
        self.factory.build(method, path, payload, content_type_override)
    }

    /// Sends `request`, retrying transport failures.
    ///
    /// Any HTTP status counts as a completed call here.
    #[tracing::instrument(skip(self, request), fields(method = %request.method(), url = %request.url()))]
    pub async fn execute(&self, request: Request) -> Result<RawResponse> {
        let summary = RequestSummary::from(&request);
        if self.debug {
            debug!("{}", dump_request(&request));
        }

        let response = send_with_retry(self.transport.as_ref(), &self.retry, request).await?;
        let mut raw = RawResponse::new(summary.method.clone(), response);

        if self.debug {
            let envelope = raw.envelope().clone();
            let body = match raw.into_bytes().await {
                Ok((_, body)) => body,
                // Leave the error status for classify to report.
                Err(e) if !envelope.is_success() => {
                    debug!("{} {}: cannot read error body: {}", envelope.method(), envelope.url(), e);
                    Vec::new()
                }
                Err(e) => return Err(e),
            };
            debug!("{}", dump_response(&envelope, &body));
            raw = RawResponse::buffered(envelope, body);
        }

        if let Some(callback) = &self.on_request_completed {
            let envelope = raw.envelope();
            if catch_unwind(AssertUnwindSafe(|| callback(&summary, envelope))).is_err() {
                warn!(
                    "Request completion callback panicked for {} {}",
                    summary.method, summary.url
                );
            }
        }

        Ok(raw)
    }

    /// See [`crate::response::classify`].
    pub async fn classify(&self, raw: RawResponse, target: Target<'_>) -> Result<Envelope> {
        classify(raw, target).await
    }

    /// Builds, executes and classifies in one go.
    pub async fn perform(
        &self,
        method: Method,
        path: &str,
        payload: Payload,
        target: Target<'_>,
    ) -> Result<Envelope> {
        let request = self.build(method, path, payload, None)?;
        let raw = self.execute(request).await?;
        self.classify(raw, target).await
    }

    /// `GET` a JSON document.
    pub async fn get_json<T: DeserializeOwned + Send>(&self, path: &str) -> Result<T> {
        self.json_call(Method::GET, path, Payload::None).await
    }

    /// Sends `body` as JSON and decodes the JSON answer.
    pub async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned + Send,
    {
        self.json_call(method, path, Payload::json(body)?).await
    }

    /// `DELETE` a resource, ignoring the body of the answer.
    pub async fn delete(&self, path: &str) -> Result<Envelope> {
        self.perform(Method::DELETE, path, Payload::None, Target::Discard)
            .await
    }

    async fn json_call<T: DeserializeOwned + Send>(
        &self,
        method: Method,
        path: &str,
        payload: Payload,
    ) -> Result<T> {
        let mut value: Option<T> = None;
        self.perform(method, path, payload, Target::json(&mut value))
            .await?;
        match value {
            Some(value) => Ok(value),
            // The body was `null`; let `T` decide whether that is acceptable.
            None => serde_json::from_value(serde_json::Value::Null).map_err(EdgeError::Decode),
        }
    }
}

fn dump_request(request: &Request) -> String {
    let mut dump = format!("{} {}\n", request.method(), request.url());
    dump_headers(&mut dump, request.headers());
    if let Some(body) = request.body().and_then(|b| b.as_bytes()) {
        dump.push('\n');
        dump.push_str(&String::from_utf8_lossy(body));
    }
    dump
}

fn dump_response(envelope: &Envelope, body: &[u8]) -> String {
    let mut dump = format!("{}\n", envelope.status());
    dump_headers(&mut dump, envelope.headers());
    if !body.is_empty() {
        dump.push('\n');
        dump.push_str(&String::from_utf8_lossy(body));
    }
    dump
}

fn dump_headers(dump: &mut String, headers: &HeaderMap) {
    for (name, value) in headers {
        let _ = writeln!(dump, "{}: {}", name, String::from_utf8_lossy(value.as_bytes()));
    }
}
