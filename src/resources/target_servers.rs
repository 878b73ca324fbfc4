use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Named, edge_resource};

/// Backend a proxy's target endpoint can be load balanced over.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetServer {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub host: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,

    #[serde(rename = "sSLInfo", default, skip_serializing_if = "Map::is_empty")]
    pub ssl_info: Map<String, Value>,
}

impl Named for TargetServer {
    fn name(&self) -> &str {
        &self.name
    }
}

edge_resource! {
    /// Target servers of an environment.
    TargetServers(TargetServer) at "targetservers", via target_servers
}
