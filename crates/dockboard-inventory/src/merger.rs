//! Normalizes raw descriptors into [`ContainerRecord`]s and joins persisted tags.

use crate::descriptor::{RawContainer, RawMount};
use crate::inspector::RuntimeInspector;
use crate::tags::dedup_tags;
use dockboard_common::{
    short_id, ContainerRecord, InventorySnapshot, Mount, NetworkEndpoint, PortBinding, Result,
    TagMap,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Lists, inspects and merges in one pass.
///
/// An empty listing yields an empty snapshot without calling `inspect`.
pub async fn collect(inspector: &dyn RuntimeInspector, tags: &TagMap) -> Result<InventorySnapshot> {
    let ids = inspector.list_container_ids().await?;
    if ids.is_empty() {
        debug!("Runtime reported no containers");
        return Ok(InventorySnapshot::empty());
    }
    let raw = inspector.inspect(&ids).await?;
    Ok(merge(raw, tags))
}

pub fn merge(raw: Vec<RawContainer>, tags: &TagMap) -> InventorySnapshot {
    let containers = raw
        .into_iter()
        .map(|container| {
            let mut record = extract(container);
            record.tags = tags
                .get(&record.short_id)
                .map(|stored| dedup_tags(stored))
                .unwrap_or_default();
            record
        })
        .collect();
    InventorySnapshot { containers }
}

/// Builds a record with an empty tag list.
pub fn extract(raw: RawContainer) -> ContainerRecord {
    let short = short_id(&raw.id).to_string();
    let state = raw.state.as_ref().and_then(|s| s.status.clone());

    let (ip, ports, networks) = match raw.network_settings {
        Some(settings) => {
            let networks: BTreeMap<String, NetworkEndpoint> = settings
                .networks
                .unwrap_or_default()
                .into_iter()
                .map(|(name, endpoint)| {
                    (
                        name,
                        NetworkEndpoint {
                            ip_address: non_empty(endpoint.ip_address),
                            gateway: non_empty(endpoint.gateway),
                            mac_address: non_empty(endpoint.mac_address),
                        },
                    )
                })
                .collect();

            let ip = non_empty(settings.ip_address)
                .or_else(|| networks.values().find_map(|n| n.ip_address.clone()));

            let ports = settings.ports.map(|ports| {
                ports
                    .into_iter()
                    .map(|(port, bindings)| {
                        let bindings = bindings
                            .unwrap_or_default()
                            .into_iter()
                            .map(|b| PortBinding {
                                host_ip: b.host_ip,
                                host_port: b.host_port,
                            })
                            .collect();
                        (port, bindings)
                    })
                    .collect()
            });

            (ip, ports, networks)
        }
        None => (None, None, BTreeMap::new()),
    };

    let mounts: Vec<Mount> = raw
        .mounts
        .unwrap_or_default()
        .into_iter()
        .map(convert_mount)
        .collect();
    let local_volumes = mounts.iter().filter(|m| m.is_volume()).cloned().collect();

    let (image, labels, dummy_username, dummy_password) = match raw.config {
        Some(config) => (
            config.image.clone(),
            config.labels.clone().unwrap_or_default().into_iter().collect(),
            config.env_value("DUMMY_USERNAME"),
            config.env_value("DUMMY_PASSWORD"),
        ),
        None => (None, BTreeMap::new(), None, None),
    };

    ContainerRecord {
        short_id: short,
        id: raw.id,
        name: raw.name.map(|n| n.trim_start_matches('/').to_string()),
        image,
        status: state.clone(),
        state,
        created_at: raw.created,
        ports,
        networks,
        ip,
        mounts,
        local_volumes,
        labels,
        dummy_username,
        dummy_password,
        size: raw.size_root_fs.or(raw.size_rw),
        tags: Vec::new(),
    }
}

fn convert_mount(mount: RawMount) -> Mount {
    Mount {
        kind: mount.kind,
        name: mount.name,
        source: mount.source,
        destination: mount.destination,
        rw: mount.rw,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{raw_container, FakeInspector};
    use dockboard_common::Tag;
    use serde_json::json;

    #[test]
    fn test_merge_joins_tags_by_short_id() {
        let mut tags = TagMap::new();
        tags.insert("abc123456789".to_string(), vec![Tag::new("prod", "#ff0000")]);

        let raw = vec![
            raw_container("abc123456789def000000000000000000000", "web"),
            raw_container("fff000000000aaa000000000000000000000", "db"),
        ];
        let snapshot = merge(raw, &tags);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.containers[0].tags, vec![Tag::new("prod", "#ff0000")]);
        assert!(snapshot.containers[1].tags.is_empty());
    }

    #[test]
    fn test_merge_drops_case_duplicate_tags() {
        let mut tags = TagMap::new();
        tags.insert(
            "abc123456789".to_string(),
            vec![Tag::new("Prod", "#111111"), Tag::new("prod", "#222222")],
        );

        let snapshot = merge(vec![raw_container("abc123456789def0", "web")], &tags);
        assert_eq!(snapshot.containers[0].tags, vec![Tag::new("Prod", "#111111")]);
    }

    #[test]
    fn test_extract_full_descriptor() {
        let raw: RawContainer = serde_json::from_value(json!({
            "Id": "0123456789abcdef",
            "Name": "/proxy",
            "Created": "2024-05-01T10:00:00Z",
            "State": { "Status": "running", "Running": true },
            "Config": {
                "Image": "nginx:1.25",
                "Env": ["DUMMY_USERNAME=admin", "DUMMY_PASSWORD=hunter2"],
                "Labels": { "b": "2", "a": "1" }
            },
            "NetworkSettings": {
                "IPAddress": "",
                "Ports": { "80/tcp": [{ "HostIp": "0.0.0.0", "HostPort": "8080" }], "443/tcp": null },
                "Networks": { "frontend": { "IPAddress": "10.0.0.5", "Gateway": "10.0.0.1", "MacAddress": "" } }
            },
            "Mounts": [
                { "Type": "volume", "Name": "cache", "Destination": "/cache", "RW": true },
                { "Type": "bind", "Source": "/etc/nginx", "Destination": "/etc/nginx", "RW": false }
            ],
            "SizeRw": 42
        }))
        .unwrap();

        let record = extract(raw);
        assert_eq!(record.short_id, "0123456789ab");
        assert_eq!(record.name.as_deref(), Some("proxy"));
        assert_eq!(record.state.as_deref(), Some("running"));
        assert_eq!(record.status.as_deref(), Some("running"));
        assert_eq!(record.ip.as_deref(), Some("10.0.0.5"));
        assert_eq!(record.networks["frontend"].mac_address, None);

        let ports = record.ports.unwrap();
        assert_eq!(ports["80/tcp"][0].host_port.as_deref(), Some("8080"));
        assert!(ports["443/tcp"].is_empty());

        assert_eq!(record.mounts.len(), 2);
        assert_eq!(record.local_volumes.len(), 1);
        assert_eq!(record.local_volumes[0].name.as_deref(), Some("cache"));
        assert_eq!(record.labels.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(record.dummy_username.as_deref(), Some("admin"));
        assert_eq!(record.dummy_password.as_deref(), Some("hunter2"));
        assert_eq!(record.size, Some(42));
        assert!(record.tags.is_empty());
    }

    #[test]
    fn test_extract_tolerates_missing_substructures() {
        let raw: RawContainer = serde_json::from_value(json!({ "Id": "deadbeef" })).unwrap();
        let record = extract(raw);
        assert_eq!(record.short_id, "deadbeef");
        assert!(record.ip.is_none());
        assert!(record.ports.is_none());
        assert!(record.networks.is_empty());
        assert!(record.mounts.is_empty());
        assert!(record.local_volumes.is_empty());
        assert!(record.image.is_none());
        assert!(record.size.is_none());
    }

    #[test]
    fn test_top_level_ip_wins() {
        let raw: RawContainer = serde_json::from_value(json!({
            "Id": "deadbeef",
            "NetworkSettings": {
                "IPAddress": "172.17.0.3",
                "Networks": { "bridge": { "IPAddress": "172.17.0.3" }, "other": { "IPAddress": "10.1.1.1" } }
            }
        }))
        .unwrap();
        assert_eq!(extract(raw).ip.as_deref(), Some("172.17.0.3"));
    }

    #[tokio::test]
    async fn test_collect_with_no_ids_skips_inspect() {
        let inspector = FakeInspector::new(vec![]);
        let mut tags = TagMap::new();
        tags.insert("whatever0000".to_string(), vec![Tag::new("x", "#000000")]);

        let snapshot = collect(&inspector, &tags).await.unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(inspector.list_calls(), 1);
        assert_eq!(inspector.inspect_calls(), 0);
    }

    #[tokio::test]
    async fn test_collect_preserves_runtime_order() {
        let inspector = FakeInspector::new(vec![
            raw_container("cccccccccccc0000", "c"),
            raw_container("aaaaaaaaaaaa0000", "a"),
            raw_container("bbbbbbbbbbbb0000", "b"),
        ]);
        let snapshot = collect(&inspector, &TagMap::new()).await.unwrap();
        let names: Vec<_> = snapshot
            .containers
            .iter()
            .map(|c| c.name.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["c", "a", "b"]);
        assert_eq!(inspector.inspect_calls(), 1);
    }
}
