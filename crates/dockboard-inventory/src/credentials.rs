use crate::storage::{read_json_strict, write_json_atomic};
use async_trait::async_trait;
use dockboard_common::{Credentials, InventoryError, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::info;

pub type CredentialMap = BTreeMap<String, Credentials>;

/// Dummy per-container logins shown on the dashboard.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Returns stored credentials, persisting a blank entry for unknown ids.
    ///
    /// An unreadable store fails with `Storage` and is never rewritten.
    async fn get_or_init(&self, container_id: &str) -> Result<Credentials>;
    async fn update(&self, container_id: &str, credentials: Credentials) -> Result<()>;
}

pub struct JsonFileCredentialStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }
}

fn validate_id(container_id: &str) -> Result<&str> {
    let trimmed = container_id.trim();
    if trimmed.is_empty() {
        return Err(InventoryError::InvalidInput(
            "containerId is required".to_string(),
        ));
    }
    Ok(trimmed)
}

#[async_trait]
impl CredentialStore for JsonFileCredentialStore {
    async fn get_or_init(&self, container_id: &str) -> Result<Credentials> {
        let container_id = validate_id(container_id)?;
        let _guard = self.write_lock.lock().await;

        let mut map: CredentialMap = read_json_strict(&self.path).await?;
        if let Some(existing) = map.get(container_id) {
            return Ok(existing.clone());
        }

        map.insert(container_id.to_string(), Credentials::default());
        write_json_atomic(&self.path, &map).await?;
        Ok(Credentials::default())
    }

    async fn update(&self, container_id: &str, credentials: Credentials) -> Result<()> {
        let container_id = validate_id(container_id)?;
        let _guard = self.write_lock.lock().await;

        let mut map: CredentialMap = read_json_strict(&self.path).await?;
        map.insert(container_id.to_string(), credentials);
        write_json_atomic(&self.path, &map).await?;

        info!(container = %container_id, "Credentials updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_unknown_id_initializes_blank_entry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let store = JsonFileCredentialStore::new(&path);

        let creds = store.get_or_init("abc123456789").await.unwrap();
        assert_eq!(creds, Credentials::default());

        let on_disk: CredentialMap =
            serde_json::from_slice(&tokio::fs::read(&path).await.unwrap()).unwrap();
        assert!(on_disk.contains_key("abc123456789"));
    }

    #[tokio::test]
    async fn test_update_then_get() {
        let dir = tempdir().unwrap();
        let store = JsonFileCredentialStore::new(dir.path().join("credentials.json"));

        let creds = Credentials {
            username: "admin".to_string(),
            password: "changeme".to_string(),
        };
        store.update("abc123456789", creds.clone()).await.unwrap();
        store
            .update("def123456789", Credentials::default())
            .await
            .unwrap();

        assert_eq!(store.get_or_init("abc123456789").await.unwrap(), creds);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reported_and_left_alone() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let corrupt = br#"{"aaa":{"username":"admin","password":"pw"},}"#;
        tokio::fs::write(&path, corrupt).await.unwrap();
        let store = JsonFileCredentialStore::new(&path);

        assert!(matches!(
            store.get_or_init("bbb").await,
            Err(InventoryError::Storage(_))
        ));
        assert!(matches!(
            store.update("ccc", Credentials::default()).await,
            Err(InventoryError::Storage(_))
        ));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), corrupt.to_vec());
    }

    #[tokio::test]
    async fn test_blank_id_rejected() {
        let dir = tempdir().unwrap();
        let store = JsonFileCredentialStore::new(dir.path().join("credentials.json"));
        assert!(matches!(
            store.get_or_init("").await,
            Err(InventoryError::InvalidInput(_))
        ));
    }
}
