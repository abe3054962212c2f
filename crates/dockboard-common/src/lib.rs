// Re-export dependencies used in public interfaces of common types

use std::collections::BTreeMap;
use std::fmt::Display;

pub use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of leading characters of a runtime id used as the tag join key.
pub const SHORT_ID_LEN: usize = 12;

#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Container runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    #[error("Malformed runtime output: {0}")]
    Parse(String),

    #[error("Storage Error: {0}")]
    Storage(String),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Invalid Input: {0}")]
    InvalidInput(String),
}

impl InventoryError {
    /// True for failures of the external runtime round trip (as opposed to local storage or input).
    pub fn is_runtime_failure(&self) -> bool {
        matches!(
            self,
            InventoryError::RuntimeUnavailable(_) | InventoryError::Parse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, InventoryError>;

/// Returns the first [`SHORT_ID_LEN`] characters of a container id.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub color: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
        }
    }

    /// Identity of a tag within one container's list.
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }
}

/// Short container id -> ordered tag list.
pub type TagMap = BTreeMap<String, Vec<Tag>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortBinding {
    pub host_ip: Option<String>,
    pub host_port: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkEndpoint {
    pub ip_address: Option<String>,
    pub gateway: Option<String>,
    pub mac_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mount {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub name: Option<String>,
    pub source: Option<String>,
    pub destination: Option<String>,
    pub rw: Option<bool>,
}

impl Mount {
    pub fn is_volume(&self) -> bool {
        self.kind.as_deref() == Some("volume")
    }
}

/// One container as served to dashboard clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerRecord {
    pub id: String,
    pub short_id: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub state: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<String>,
    pub ports: Option<BTreeMap<String, Vec<PortBinding>>>,
    pub networks: BTreeMap<String, NetworkEndpoint>,
    pub ip: Option<String>,
    pub mounts: Vec<Mount>,
    pub local_volumes: Vec<Mount>,
    pub labels: BTreeMap<String, String>,
    pub dummy_username: Option<String>,
    pub dummy_password: Option<String>,
    pub size: Option<i64>,
    pub tags: Vec<Tag>,
}

/// The unit of caching, persistence and fingerprinting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub containers: Vec<ContainerRecord>,
}

impl InventorySnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    pub fn find(&self, id_or_short: &str) -> Option<&ContainerRecord> {
        self.containers
            .iter()
            .find(|c| c.id == id_or_short || c.short_id == id_or_short)
    }
}

impl Display for InventorySnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InventorySnapshot(containers: {})", self.containers.len())
    }
}

/// Dummy login shown next to a container on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("abc123456789def000"), "abc123456789");
        assert_eq!(short_id("abc"), "abc");
        assert_eq!(short_id(""), "");
    }

    #[test]
    fn test_record_serialization() {
        let record = ContainerRecord {
            id: "abc123456789def".to_string(),
            short_id: "abc123456789".to_string(),
            name: Some("web".to_string()),
            image: Some("nginx:latest".to_string()),
            state: Some("running".to_string()),
            status: Some("running".to_string()),
            created_at: None,
            ports: None,
            networks: BTreeMap::new(),
            ip: None,
            mounts: vec![],
            local_volumes: vec![],
            labels: BTreeMap::new(),
            dummy_username: None,
            dummy_password: None,
            size: None,
            tags: vec![Tag::new("prod", "#ff0000")],
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["shortId"], "abc123456789");
        assert_eq!(json["localVolumes"], serde_json::json!([]));
        assert_eq!(json["tags"][0]["color"], "#ff0000");
        assert!(json["ports"].is_null());
    }

    #[test]
    fn test_tag_key_is_case_insensitive() {
        assert_eq!(Tag::new("Prod", "#fff").key(), Tag::new("PROD", "#000").key());
    }
}
