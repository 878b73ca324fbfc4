//! Request construction.
//!
//! Relative resource paths are joined onto the organization-scoped base URL
//! segment by segment, never by string concatenation.

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue, USER_AGENT};
use reqwest::{Body, Method, Request, Url};
use serde::Serialize;

use crate::auth::Credential;
use crate::error::{EdgeError, Result};

pub const APPLICATION_JSON: &str = "application/json";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Request body.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    #[default]
    None,
    /// Sent JSON-encoded as `application/json`.
    Json(serde_json::Value),
    /// Sent unmodified as `application/octet-stream`.
    Raw(Vec<u8>),
}

impl Payload {
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(Payload::Json)
            .map_err(|e| EdgeError::Build(format!("cannot encode payload: {}", e)))
    }

    pub fn raw(bytes: impl Into<Vec<u8>>) -> Self {
        Payload::Raw(bytes.into())
    }

    /// Encoded body and the content type it implies.
    fn into_body(self) -> Result<Option<(Vec<u8>, &'static str)>> {
        match self {
            Payload::None => Ok(None),
            Payload::Json(value) => serde_json::to_vec(&value)
                .map(|body| Some((body, APPLICATION_JSON)))
                .map_err(|e| EdgeError::Build(format!("cannot encode payload: {}", e))),
            Payload::Raw(bytes) => Ok(Some((bytes, OCTET_STREAM))),
        }
    }
}

/// Query options accepted by list operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ListOptions {
    /// Ask for expanded entities instead of bare names.
    pub expand: bool,
}

/// Merges `options` into the query string of `path`.
///
/// Keys present in `options` replace existing ones; the result is sorted by
/// key. `None` returns `path` unchanged.
pub fn add_options<T: Serialize + ?Sized>(path: &str, options: Option<&T>) -> Result<String> {
    let Some(options) = options else {
        return Ok(path.to_string());
    };

    let encoded = serde_urlencoded::to_string(options)
        .map_err(|e| EdgeError::Build(format!("cannot encode query options: {}", e)))?;
    let added: Vec<(String, String)> = serde_urlencoded::from_str(&encoded)
        .map_err(|e| EdgeError::Build(format!("cannot encode query options: {}", e)))?;

    let (base, query) = path.split_once('?').unwrap_or((path, ""));
    let mut pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
        .map_err(|e| EdgeError::Build(format!("invalid query in {:?}: {}", path, e)))?;
    pairs.retain(|(key, _)| !added.iter().any(|(k, _)| k == key));
    pairs.extend(added);
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    if pairs.is_empty() {
        return Ok(base.to_string());
    }
    let query = serde_urlencoded::to_string(&pairs)
        .map_err(|e| EdgeError::Build(format!("cannot encode query options: {}", e)))?;
    Ok(format!("{}?{}", base, query))
}

/// Joins resource path segments with single separators.
pub fn path_join(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|s| s.trim_matches('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Resolves a relative resource path against `base`.
///
/// The path must not start with `/` and must not contain `.` or `..`
/// segments. Empty segments are dropped. Percent-escapes in a segment are
/// decoded before the segment is encoded again. A `?query` suffix is kept.
pub fn resolve_path(base: &Url, relative: &str) -> Result<Url> {
    if relative.starts_with('/') {
        return Err(EdgeError::Build(format!(
            "relative path {:?} must not start with '/'",
            relative
        )));
    }
    if relative.contains('#') {
        return Err(EdgeError::Build(format!(
            "relative path {:?} must not contain a fragment",
            relative
        )));
    }

    let (path, query) = match relative.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (relative, None),
    };

    // Segments are re-encoded on the way into the URL, so decode any
    // escapes the caller already applied.
    let segments = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            urlencoding::decode(s).map_err(|_| {
                EdgeError::Build(format!(
                    "relative path {:?} has a segment that is not valid UTF-8 once decoded",
                    relative
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    if let Some(bad) = segments.iter().find(|s| *s == "." || *s == "..") {
        return Err(EdgeError::Build(format!(
            "relative path {:?} contains a {:?} segment",
            relative, bad
        )));
    }

    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| EdgeError::Build(format!("base URL {} cannot be a base", base)))?
        .pop_if_empty()
        .extend(segments.iter().map(|s| s.as_ref()));
    url.set_query(query.filter(|q| !q.is_empty()));

    Ok(url)
}

/// Builds requests against one organization with one credential.
#[derive(Debug, Clone)]
pub struct RequestFactory {
    base_url: Url,
    user_agent: String,
    credential: Credential,
}

impl RequestFactory {
    pub fn new(base_url: Url, user_agent: impl Into<String>, credential: Credential) -> Self {
        Self {
            base_url,
            user_agent: user_agent.into(),
            credential,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Builds a request for `path` relative to the organization base URL.
    ///
    /// A non-empty `content_type_override` replaces the computed content type
    /// and also suppresses the `Accept` and `User-Agent` headers; only the
    /// `Authorization` header is still added. Callers use this for non-JSON
    /// uploads such as proxy bundles.
    #[tracing::instrument(skip(self, payload))]
    pub fn build(
        &self,
        method: Method,
        path: &str,
        payload: Payload,
        content_type_override: Option<&str>,
    ) -> Result<Request> {
        let url = resolve_path(&self.base_url, path)?;
        let body = payload.into_body()?;

        let mut request = Request::new(method, url);
        let headers = request.headers_mut();

        match content_type_override.filter(|ct| !ct.is_empty()) {
            Some(content_type) => {
                headers.insert(CONTENT_TYPE, header_value(content_type)?);
            }
            None => {
                if let Some((_, content_type)) = &body {
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static(*content_type));
                }
                headers.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
                headers.insert(USER_AGENT, header_value(&self.user_agent)?);
            }
        }
        headers.insert(AUTHORIZATION, self.credential.header_value()?);

        if let Some((bytes, _)) = body {
            *request.body_mut() = Some(Body::from(bytes));
        }

        Ok(request)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| EdgeError::Build(format!("invalid header value {:?}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::org_base_url;
    use serde_json::json;

    fn factory(credential: Credential) -> RequestFactory {
        RequestFactory::new(
            org_base_url("https://api.example.com", "acme").unwrap(),
            "apigee-edge-rs/test",
            credential,
        )
    }

    fn bearer() -> RequestFactory {
        factory(Credential::Bearer("tok123".into()))
    }

    fn body_bytes(request: &Request) -> &[u8] {
        request.body().and_then(|b| b.as_bytes()).unwrap()
    }

    #[test]
    fn test_build_resolves_org_scoped_url() {
        let request = bearer()
            .build(
                Method::GET,
                "environments/test/VirtualHosts/vh1",
                Payload::None,
                None,
            )
            .unwrap();

        assert_eq!(
            request.url().as_str(),
            "https://api.example.com/v1/o/acme/environments/test/VirtualHosts/vh1"
        );
        assert!(request.body().is_none());
        assert!(request.headers().get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_resolve_path_never_duplicates_separators() {
        let base = org_base_url("https://api.example.com/", "acme").unwrap();
        for path in ["apis", "apis/", "apis//foo", "apis/foo/revisions/1", ""] {
            let url = resolve_path(&base, path).unwrap();
            assert!(!url.path().contains("//"), "{} -> {}", path, url);
            assert!(url.path().starts_with("/v1/o/acme"));
        }
        assert_eq!(
            resolve_path(&base, "apis//foo/").unwrap().path(),
            "/v1/o/acme/apis/foo"
        );
        assert_eq!(resolve_path(&base, "").unwrap().path(), "/v1/o/acme");
    }

    #[test]
    fn test_resolve_path_keeps_query() {
        let base = org_base_url("https://api.example.com", "acme").unwrap();
        let url = resolve_path(&base, "apis?expand=true").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/o/acme/apis?expand=true");
    }

    #[test]
    fn test_resolve_path_decodes_escaped_segments() {
        let base = org_base_url("https://api.example.com", "acme").unwrap();

        let url = resolve_path(&base, "developers/a%40b.com").unwrap();
        assert_eq!(url.path(), "/v1/o/acme/developers/a@b.com");
        assert!(!url.as_str().contains("%25"));

        let url = resolve_path(&base, "developers/caf%C3%A9/apps").unwrap();
        assert_eq!(url.path(), "/v1/o/acme/developers/caf%C3%A9/apps");

        // An escaped separator stays inside its segment.
        let url = resolve_path(&base, "keyvaluemaps/a%2Fb").unwrap();
        assert_eq!(url.path(), "/v1/o/acme/keyvaluemaps/a%2Fb");

        // A lone percent sign is literal.
        let url = resolve_path(&base, "apis/100%").unwrap();
        assert_eq!(url.path(), "/v1/o/acme/apis/100%25");
    }

    #[test]
    fn test_resolve_path_rejects_malformed_paths() {
        let base = org_base_url("https://api.example.com", "acme").unwrap();
        for path in ["/apis", "apis/../../other-org", "./apis", "apis#frag", "apis/%2e%2e/x", "apis/%FF"] {
            assert!(
                matches!(resolve_path(&base, path), Err(EdgeError::Build(_))),
                "{} should be rejected",
                path
            );
        }
    }

    #[test]
    fn test_build_default_headers_with_bearer() {
        let request = bearer()
            .build(Method::GET, "apis", Payload::None, None)
            .unwrap();
        let headers = request.headers();

        assert_eq!(headers[ACCEPT], APPLICATION_JSON);
        assert_eq!(headers[USER_AGENT], "apigee-edge-rs/test");
        assert_eq!(headers[AUTHORIZATION], "Bearer tok123");
        assert_eq!(headers.get_all(AUTHORIZATION).iter().count(), 1);
    }

    #[test]
    fn test_build_basic_auth() {
        let request = factory(Credential::Basic {
            username: "alice".into(),
            password: "pw".into(),
        })
        .build(Method::GET, "apis", Payload::None, None)
        .unwrap();

        let auth = request.headers()[AUTHORIZATION].to_str().unwrap();
        assert!(auth.starts_with("Basic "));
        assert!(request.headers()[AUTHORIZATION].is_sensitive());
    }

    #[test]
    fn test_build_json_payload_round_trips() {
        let payload = json!({
            "name": "vh1",
            "hostAliases": ["api.acme.com"],
            "port": 443,
            "properties": {"property": [{"name": "a", "value": "b"}]}
        });

        let request = bearer()
            .build(
                Method::POST,
                "environments/test/virtualhosts",
                Payload::Json(payload.clone()),
                None,
            )
            .unwrap();

        assert_eq!(request.headers()[CONTENT_TYPE], APPLICATION_JSON);
        let decoded: serde_json::Value = serde_json::from_slice(body_bytes(&request)).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_build_raw_payload_passes_bytes_through() {
        let bytes: Vec<u8> = (0..=255).collect();

        let request = bearer()
            .build(Method::POST, "apis?action=import&name=foo", Payload::raw(bytes.clone()), None)
            .unwrap();

        assert_eq!(request.headers()[CONTENT_TYPE], OCTET_STREAM);
        assert_eq!(body_bytes(&request), bytes.as_slice());
        assert_eq!(request.url().query(), Some("action=import&name=foo"));
    }

    #[test]
    fn test_build_content_type_override_suppresses_defaults() {
        let request = bearer()
            .build(
                Method::POST,
                "apis",
                Payload::raw(b"PK".to_vec()),
                Some("multipart/form-data"),
            )
            .unwrap();
        let headers = request.headers();

        assert_eq!(headers[CONTENT_TYPE], "multipart/form-data");
        assert!(headers.get(ACCEPT).is_none());
        assert!(headers.get(USER_AGENT).is_none());
        assert_eq!(headers[AUTHORIZATION], "Bearer tok123");
    }

    #[test]
    fn test_build_empty_override_is_ignored() {
        let request = bearer()
            .build(Method::GET, "apis", Payload::None, Some(""))
            .unwrap();
        assert_eq!(request.headers()[ACCEPT], APPLICATION_JSON);
    }

    #[test]
    fn test_payload_json_from_struct() {
        #[derive(Serialize)]
        struct Product {
            name: String,
            #[serde(rename = "displayName")]
            display_name: String,
        }

        let payload = Payload::json(&Product {
            name: "gold".into(),
            display_name: "Gold".into(),
        })
        .unwrap();
        assert_eq!(payload, Payload::Json(json!({"name": "gold", "displayName": "Gold"})));
    }

    #[test]
    fn test_payload_json_failure_is_build_error() {
        let mut map = std::collections::HashMap::new();
        map.insert(vec![1u8], "non-string key");
        assert!(matches!(Payload::json(&map), Err(EdgeError::Build(_))));
    }

    #[test]
    fn test_add_options() {
        assert_eq!(add_options::<ListOptions>("apis", None).unwrap(), "apis");
        assert_eq!(
            add_options("apis", Some(&ListOptions { expand: true })).unwrap(),
            "apis?expand=true"
        );
        assert_eq!(
            add_options("apis?expand=false&count=10", Some(&ListOptions { expand: true }))
                .unwrap(),
            "apis?count=10&expand=true"
        );
    }

    #[test]
    fn test_path_join() {
        assert_eq!(
            path_join(&["environments", "test", "VirtualHosts", "vh1"]),
            "environments/test/VirtualHosts/vh1"
        );
        assert_eq!(path_join(&["environments/", "/test", "", "targetservers"]), "environments/test/targetservers");
    }
}
