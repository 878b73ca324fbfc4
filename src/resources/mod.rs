//! Typed services for environment-scoped management resources.
//!
//! Every service is generated by [`edge_resource!`] and offers the same
//! operations:
//!
//! | Operation | Method   | Path                                   |
//! |-----------|----------|----------------------------------------|
//! | `list`    | `GET`    | `environments/<env>/<collection>`        |
//! | `get`     | `GET`    | `environments/<env>/<collection>/<name>` |
//! | `create`  | `POST`   | `environments/<env>/<collection>`        |
//! | `update`  | `PUT`    | `environments/<env>/<collection>/<name>` |
//! | `delete`  | `DELETE` | `environments/<env>/<collection>/<name>` |

mod target_servers;
mod virtual_hosts;

pub use target_servers::{TargetServer, TargetServers};
pub use virtual_hosts::{VirtualHost, VirtualHosts};

use crate::error::{EdgeError, Result};
use crate::request::path_join;

/// Models addressed by name within their collection.
pub trait Named {
    fn name(&self) -> &str;
}

/// Rejects values that would not survive as a single path segment.
pub(crate) fn check_segment(kind: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(EdgeError::Build(format!("{} name must not be empty", kind)));
    }
    if value.contains(['/', '?', '#']) || value == "." || value == ".." {
        return Err(EdgeError::Build(format!("invalid {} name {:?}", kind, value)));
    }
    Ok(())
}

pub(crate) fn collection_path(env: &str, collection: &str) -> Result<String> {
    check_segment("environment", env)?;
    Ok(path_join(&["environments", env, collection]))
}

pub(crate) fn item_path(env: &str, collection: &str, name: &str) -> Result<String> {
    check_segment("resource", name)?;
    Ok(path_join(&[&collection_path(env, collection)?, name]))
}

/// Generates an environment-scoped CRUD service.
///
/// ```ignore
/// edge_resource! {
///     /// Docs for the service.
///     VirtualHosts(VirtualHost) at "VirtualHosts", via virtual_hosts
/// }
/// ```
///
/// expands to a `VirtualHosts<'a>` service borrowing an [`EdgeClient`] and an
/// `EdgeClient::virtual_hosts()` accessor.
///
/// [`EdgeClient`]: crate::EdgeClient
macro_rules! edge_resource {
    (
        $(#[$meta:meta])*
        $service:ident($model:ty) at $collection:literal, via $accessor:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $service<'a> {
            client: &'a $crate::client::EdgeClient,
        }

        impl<'a> $service<'a> {
            pub const COLLECTION: &'static str = $collection;

            pub fn new(client: &'a $crate::client::EdgeClient) -> Self {
                Self { client }
            }

            /// Names of all entries in `env`.
            pub async fn list(&self, env: &str) -> $crate::error::Result<Vec<String>> {
                let path = $crate::resources::collection_path(env, $collection)?;
                self.client.get_json(&path).await
            }

            pub async fn get(&self, env: &str, name: &str) -> $crate::error::Result<$model> {
                let path = $crate::resources::item_path(env, $collection, name)?;
                self.client.get_json(&path).await
            }

            pub async fn create(&self, env: &str, item: &$model) -> $crate::error::Result<$model> {
                let path = $crate::resources::collection_path(env, $collection)?;
                self.client
                    .send_json(::reqwest::Method::POST, &path, item)
                    .await
            }

            /// Replaces the entry named after `item`.
            pub async fn update(&self, env: &str, item: &$model) -> $crate::error::Result<$model> {
                let name = $crate::resources::Named::name(item);
                let path = $crate::resources::item_path(env, $collection, name)?;
                self.client
                    .send_json(::reqwest::Method::PUT, &path, item)
                    .await
            }

            pub async fn delete(
                &self,
                env: &str,
                name: &str,
            ) -> $crate::error::Result<$crate::response::Envelope> {
                let path = $crate::resources::item_path(env, $collection, name)?;
                self.client.delete(&path).await
            }
        }

        impl $crate::client::EdgeClient {
            pub fn $accessor(&self) -> $service<'_> {
                $service::new(self)
            }
        }
    };
}

pub(crate) use edge_resource;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(
            collection_path("test", "VirtualHosts").unwrap(),
            "environments/test/VirtualHosts"
        );
        assert_eq!(
            item_path("prod", "targetservers", "backend").unwrap(),
            "environments/prod/targetservers/backend"
        );
    }

    #[test]
    fn test_rejects_bad_segments() {
        for (env, name) in [("", "vh1"), ("test", ""), ("test", "a/b"), ("te/st", "vh1"), ("test", "..")] {
            let err = item_path(env, "VirtualHosts", name).unwrap_err();
            assert!(matches!(err, EdgeError::Build(_)), "{:?}/{:?}", env, name);
        }
    }
}
