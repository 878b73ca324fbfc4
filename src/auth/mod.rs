//! Credential resolution for the management API.
//!
//! A client holds exactly one [`Credential`], resolved once at construction:
//!
//! 1. an explicit access token,
//! 2. an explicit username and non-empty password,
//! 3. the entry for the management host in a `.netrc` store.
//!
//! Failing step 3 aborts client construction.

mod netrc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use log::debug;
use reqwest::header::HeaderValue;
use std::path::{Path, PathBuf};

use crate::error::{EdgeError, Result};
use crate::runtime::Runtime;

pub use netrc::{Machine, Netrc, NetrcError};

/// Authentication hints supplied by the caller.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct EdgeAuth {
    /// Path to the `.netrc` store. Defaults to `$HOME/.netrc`.
    /// Ignored when a password or access token is given.
    pub netrc_path: Option<PathBuf>,

    /// Used only together with `password`.
    pub username: Option<String>,

    pub password: Option<String>,

    /// OAuth bearer token. Takes precedence over everything else.
    pub access_token: Option<String>,
}

impl EdgeAuth {
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            access_token: Some(token.into()),
            ..Default::default()
        }
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            ..Default::default()
        }
    }

    pub fn netrc(path: impl Into<PathBuf>) -> Self {
        Self {
            netrc_path: Some(path.into()),
            ..Default::default()
        }
    }
}

impl std::fmt::Debug for EdgeAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeAuth")
            .field("netrc_path", &self.netrc_path)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// The single authentication form a client uses for every request.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Basic { username: String, password: String },
    Bearer(String),
}

impl Credential {
    /// Value for the `Authorization` header, marked sensitive.
    pub fn header_value(&self) -> Result<HeaderValue> {
        let raw = match self {
            Credential::Bearer(token) => format!("Bearer {}", token),
            Credential::Basic { username, password } => {
                format!("Basic {}", BASE64.encode(format!("{}:{}", username, password)))
            }
        };
        let mut value = HeaderValue::from_str(&raw)
            .map_err(|_| EdgeError::Build("credential contains invalid header characters".into()))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Credential::Bearer(_) => f.debug_tuple("Bearer").field(&"<redacted>").finish(),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Resolves the credential for `host` (optionally `host:port`) from the
/// caller's hints.
#[tracing::instrument(skip(runtime, auth))]
pub fn resolve_credential<R: Runtime + ?Sized>(
    runtime: &R,
    auth: Option<&EdgeAuth>,
    host: &str,
) -> Result<Credential> {
    let Some(auth) = auth else {
        return credential_from_netrc(runtime, None, host);
    };

    if let Some(token) = non_empty(&auth.access_token) {
        debug!("Using access token for authentication");
        return Ok(Credential::Bearer(token.to_string()));
    }

    if let Some(password) = non_empty(&auth.password) {
        debug!("Using explicit username/password for authentication");
        return Ok(Credential::Basic {
            username: auth.username.clone().unwrap_or_default(),
            password: password.to_string(),
        });
    }

    credential_from_netrc(runtime, auth.netrc_path.as_deref(), host)
}

fn default_netrc_path<R: Runtime + ?Sized>(runtime: &R) -> Result<PathBuf> {
    runtime
        .env_var("HOME")
        .ok()
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
        .or_else(|| runtime.home_dir())
        .map(|home| home.join(".netrc"))
        .ok_or_else(|| {
            EdgeError::Credential("cannot determine home directory to locate .netrc".into())
        })
}

fn credential_from_netrc<R: Runtime + ?Sized>(
    runtime: &R,
    path: Option<&Path>,
    host: &str,
) -> Result<Credential> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => default_netrc_path(runtime)?,
    };
    debug!("Looking up credentials for {} in {}", host, path.display());

    let contents = runtime
        .read_to_string(&path)
        .map_err(|e| EdgeError::Credential(format!("{:#}", e)))?;
    let netrc = Netrc::parse(&contents).map_err(|e| {
        EdgeError::Credential(format!("while parsing {}: {}", path.display(), e))
    })?;

    match netrc.find_machine(host) {
        Some(machine) if !machine.password.is_empty() => Ok(Credential::Basic {
            username: machine.login.clone(),
            password: machine.password.clone(),
        }),
        _ => Err(EdgeError::Credential(format!(
            "while scanning {}, cannot find machine: {}",
            path.display(),
            host
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;

    const HOST: &str = "api.enterprise.apigee.com";

    fn runtime_with_netrc(path: &'static str, contents: &'static str) -> MockRuntime {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_env_var()
            .with(eq("HOME"))
            .returning(|_| Ok("/home/user".to_string()));
        runtime
            .expect_read_to_string()
            .withf(move |p| p == Path::new(path))
            .returning(move |_| Ok(contents.to_string()));
        runtime
    }

    #[test]
    fn test_token_takes_precedence() {
        let runtime = MockRuntime::new();
        let auth = EdgeAuth {
            username: Some("alice".into()),
            password: Some("pw".into()),
            access_token: Some("tok123".into()),
            ..Default::default()
        };

        let credential = resolve_credential(&runtime, Some(&auth), HOST).unwrap();
        assert_eq!(credential, Credential::Bearer("tok123".into()));
    }

    #[test]
    fn test_explicit_basic_auth() {
        let runtime = MockRuntime::new();
        let credential =
            resolve_credential(&runtime, Some(&EdgeAuth::basic("alice", "pw")), HOST).unwrap();
        assert_eq!(
            credential,
            Credential::Basic {
                username: "alice".into(),
                password: "pw".into()
            }
        );
    }

    #[test]
    fn test_no_auth_reads_default_netrc() {
        let runtime = runtime_with_netrc(
            "/home/user/.netrc",
            "machine api.enterprise.apigee.com login bob password hunter2",
        );

        let credential = resolve_credential(&runtime, None, HOST).unwrap();
        assert_eq!(
            credential,
            Credential::Basic {
                username: "bob".into(),
                password: "hunter2".into()
            }
        );
    }

    #[test]
    fn test_username_without_password_falls_back_to_netrc() {
        let runtime = runtime_with_netrc(
            "/home/user/.netrc",
            "machine api.enterprise.apigee.com login bob password hunter2",
        );
        let auth = EdgeAuth {
            username: Some("ignored".into()),
            password: Some(String::new()),
            ..Default::default()
        };

        let credential = resolve_credential(&runtime, Some(&auth), HOST).unwrap();
        assert!(matches!(credential, Credential::Basic { username, .. } if username == "bob"));
    }

    #[test]
    fn test_explicit_netrc_path() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_read_to_string()
            .withf(|p| p == Path::new("/etc/edge.netrc"))
            .returning(|_| Ok("machine edge.local login ops password pw".to_string()));

        let credential = resolve_credential(
            &runtime,
            Some(&EdgeAuth::netrc("/etc/edge.netrc")),
            "edge.local",
        )
        .unwrap();
        assert!(matches!(credential, Credential::Basic { .. }));
    }

    #[test]
    fn test_home_dir_used_when_home_unset() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_env_var()
            .with(eq("HOME"))
            .returning(|_| Err(std::env::VarError::NotPresent));
        runtime
            .expect_home_dir()
            .returning(|| Some(PathBuf::from("/Users/me")));
        runtime
            .expect_read_to_string()
            .withf(|p| p == Path::new("/Users/me/.netrc"))
            .returning(|_| Ok("default login anon password pw".to_string()));

        assert!(resolve_credential(&runtime, None, HOST).is_ok());
    }

    #[test]
    fn test_host_with_port_matches_bare_machine() {
        let runtime = runtime_with_netrc(
            "/home/user/.netrc",
            "machine edge.local login ops password pw\n\
             machine other.local:8080 login x password y",
        );

        let credential = resolve_credential(&runtime, None, "edge.local:8080").unwrap();
        assert!(matches!(credential, Credential::Basic { username, .. } if username == "ops"));
    }

    #[test]
    fn test_missing_machine_is_credential_error() {
        let runtime = runtime_with_netrc(
            "/home/user/.netrc",
            "machine other.example.com login bob password hunter2",
        );

        let err = resolve_credential(&runtime, None, HOST).unwrap_err();
        assert!(matches!(err, EdgeError::Credential(_)));
        assert!(err.to_string().contains(HOST));
    }

    #[test]
    fn test_empty_password_entry_is_credential_error() {
        let runtime = runtime_with_netrc(
            "/home/user/.netrc",
            "machine api.enterprise.apigee.com login bob",
        );

        let err = resolve_credential(&runtime, None, HOST).unwrap_err();
        assert!(matches!(err, EdgeError::Credential(_)));
    }

    #[test]
    fn test_unreadable_store_is_credential_error() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_read_to_string()
            .returning(|_| Err(anyhow::anyhow!("permission denied")));

        let err = resolve_credential(&runtime, Some(&EdgeAuth::netrc("/nope")), HOST)
            .unwrap_err();
        assert!(matches!(err, EdgeError::Credential(msg) if msg.contains("permission denied")));
    }

    #[test]
    fn test_malformed_store_is_credential_error() {
        let runtime = runtime_with_netrc("/home/user/.netrc", "password");
        let err = resolve_credential(&runtime, None, HOST).unwrap_err();
        assert!(matches!(err, EdgeError::Credential(msg) if msg.contains(".netrc")));
    }

    #[test]
    fn test_header_values() {
        let bearer = Credential::Bearer("tok123".into()).header_value().unwrap();
        assert_eq!(bearer, "Bearer tok123");
        assert!(bearer.is_sensitive());

        let basic = Credential::Basic {
            username: "Aladdin".into(),
            password: "open sesame".into(),
        }
        .header_value()
        .unwrap();
        assert_eq!(basic, "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!(
            "{:?} {:?}",
            Credential::Bearer("tok123".into()),
            EdgeAuth::basic("alice", "pw-secret")
        );
        assert!(!debug.contains("tok123"));
        assert!(!debug.contains("pw-secret"));
        assert!(debug.contains("alice"));
    }
}
