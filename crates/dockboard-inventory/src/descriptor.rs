//! Raw container descriptors as printed by `docker inspect`.
//!
//! Every nested structure is optional: stopped containers, containers on the
//! `none` network and older runtimes all omit parts of this tree.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawContainer {
    pub id: String,
    pub name: Option<String>,
    pub created: Option<String>,
    pub state: Option<RawState>,
    pub config: Option<RawConfig>,
    pub network_settings: Option<RawNetworkSettings>,
    pub mounts: Option<Vec<RawMount>>,
    pub size_root_fs: Option<i64>,
    pub size_rw: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawState {
    pub status: Option<String>,
    pub running: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawConfig {
    pub image: Option<String>,
    pub env: Option<Vec<String>>,
    pub labels: Option<HashMap<String, String>>,
}

impl RawConfig {
    /// Value of `KEY=value` in the container environment.
    pub fn env_value(&self, key: &str) -> Option<String> {
        self.env.as_ref()?.iter().find_map(|entry| {
            let (k, v) = entry.split_once('=')?;
            (k == key).then(|| v.to_string())
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawNetworkSettings {
    #[serde(rename = "IPAddress")]
    pub ip_address: Option<String>,
    #[serde(rename = "Ports")]
    pub ports: Option<BTreeMap<String, Option<Vec<RawPortBinding>>>>,
    #[serde(rename = "Networks")]
    pub networks: Option<BTreeMap<String, RawEndpoint>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPortBinding {
    #[serde(rename = "HostIp")]
    pub host_ip: Option<String>,
    #[serde(rename = "HostPort")]
    pub host_port: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawEndpoint {
    #[serde(rename = "IPAddress")]
    pub ip_address: Option<String>,
    #[serde(rename = "Gateway")]
    pub gateway: Option<String>,
    #[serde(rename = "MacAddress")]
    pub mac_address: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawMount {
    #[serde(rename = "Type")]
    pub kind: Option<String>,
    pub name: Option<String>,
    pub source: Option<String>,
    pub destination: Option<String>,
    #[serde(rename = "RW")]
    pub rw: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sparse_descriptor() {
        let raw: RawContainer = serde_json::from_str(r#"{"Id": "abc"}"#).unwrap();
        assert_eq!(raw.id, "abc");
        assert!(raw.network_settings.is_none());
        assert!(raw.mounts.is_none());
    }

    #[test]
    fn test_parse_null_port_bindings() {
        let raw: RawContainer = serde_json::from_value(serde_json::json!({
            "Id": "abc",
            "NetworkSettings": {
                "IPAddress": "",
                "Ports": { "80/tcp": null, "443/tcp": [{"HostIp": "0.0.0.0", "HostPort": "8443"}] },
                "Networks": { "bridge": { "IPAddress": "172.17.0.2" } }
            },
            "Mounts": [{ "Type": "volume", "Name": "data", "RW": true }]
        }))
        .unwrap();

        let settings = raw.network_settings.unwrap();
        let ports = settings.ports.unwrap();
        assert!(ports["80/tcp"].is_none());
        assert_eq!(ports["443/tcp"].as_ref().unwrap()[0].host_port.as_deref(), Some("8443"));
        assert_eq!(raw.mounts.unwrap()[0].rw, Some(true));
    }

    #[test]
    fn test_env_value() {
        let config = RawConfig {
            env: Some(vec![
                "PATH=/usr/bin".to_string(),
                "DUMMY_USERNAME=admin".to_string(),
                "DUMMY_PASSWORD=a=b".to_string(),
            ]),
            ..Default::default()
        };
        assert_eq!(config.env_value("DUMMY_USERNAME").as_deref(), Some("admin"));
        assert_eq!(config.env_value("DUMMY_PASSWORD").as_deref(), Some("a=b"));
        assert_eq!(config.env_value("MISSING"), None);
    }
}
