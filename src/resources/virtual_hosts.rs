use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Named, edge_resource};

/// Virtual host definition.
///
/// Empty fields are left out of the request body so that a partial model
/// does not overwrite server-side defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualHost {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub host_aliases: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub retry_options: Vec<Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub listen_options: Vec<Value>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_url: String,

    #[serde(rename = "sSLInfo", default, skip_serializing_if = "Map::is_empty")]
    pub ssl_info: Map<String, Value>,

    /// Kept verbatim: the server nests these as `{"property": [...]}`.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub properties: Value,
}

impl Named for VirtualHost {
    fn name(&self) -> &str {
        &self.name
    }
}

edge_resource! {
    /// Virtual hosts of an environment.
    VirtualHosts(VirtualHost) at "VirtualHosts", via virtual_hosts
}
