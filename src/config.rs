//! Client construction options.

use reqwest::Url;
use std::time::Duration;

use crate::auth::EdgeAuth;
use crate::error::{EdgeError, Result};
use crate::http::RetryPolicy;

/// Management endpoint of the hosted Edge service.
pub const DEFAULT_MGMT_URL: &str = "https://api.enterprise.apigee.com/";

pub const DEFAULT_USER_AGENT: &str = concat!("apigee-edge-rs/", env!("CARGO_PKG_VERSION"));

/// Total attempts per request, the first one included.
pub const DEFAULT_MAX_RETRIES: usize = 5;

/// Unit of the linear backoff: retry `n` waits `n * DEFAULT_BACKOFF_UNIT`.
pub const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct EdgeClientOptions {
    /// Management server base, e.g. `http://192.168.10.56:8080` for an
    /// on-premises install. Defaults to [`DEFAULT_MGMT_URL`].
    pub mgmt_url: Option<String>,

    /// Organization every request is scoped to.
    pub org: String,

    /// Authentication hints. `None` means "look in `$HOME/.netrc`".
    pub auth: Option<EdgeAuth>,

    /// Dump every request and response at debug level.
    /// Basic-auth headers are part of the dump.
    pub debug: bool,

    pub user_agent: Option<String>,
    pub max_retries: usize,
    pub backoff_unit: Duration,

    /// Per-attempt transport timeout.
    pub timeout: Option<Duration>,
}

impl Default for EdgeClientOptions {
    fn default() -> Self {
        Self {
            mgmt_url: None,
            org: String::new(),
            auth: None,
            debug: false,
            user_agent: None,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
            timeout: None,
        }
    }
}

impl EdgeClientOptions {
    pub fn new(org: impl Into<String>) -> Self {
        Self {
            org: org.into(),
            ..Default::default()
        }
    }

    pub fn mgmt_url(mut self, url: impl Into<String>) -> Self {
        self.mgmt_url = Some(url.into());
        self
    }

    pub fn auth(mut self, auth: EdgeAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn max_retries(mut self, attempts: usize) -> Self {
        self.max_retries = attempts;
        self
    }

    pub fn backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.backoff_unit)
    }

    /// The organization-scoped base URL all relative paths resolve against.
    pub fn base_url(&self) -> Result<Url> {
        org_base_url(self.mgmt_url.as_deref().unwrap_or(DEFAULT_MGMT_URL), &self.org)
    }
}

/// Builds `<mgmt_url>/v1/o/<org>/`, keeping any path prefix of `mgmt_url`.
///
/// The result always ends with `/` so joining a relative path never drops
/// the organization segment.
pub fn org_base_url(mgmt_url: &str, org: &str) -> Result<Url> {
    if org.is_empty() || org.contains('/') {
        return Err(EdgeError::Config(format!("invalid organization name {:?}", org)));
    }

    let mut url = Url::parse(mgmt_url)
        .map_err(|e| EdgeError::Config(format!("invalid management URL {:?}: {}", mgmt_url, e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(EdgeError::Config(format!(
            "management URL {:?} must be an absolute http(s) URL",
            mgmt_url
        )));
    }

    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| EdgeError::Config(format!("management URL {:?} cannot be a base", mgmt_url)))?
        .pop_if_empty()
        .extend(["v1", "o", org])
        .push("");

    Ok(url)
}
