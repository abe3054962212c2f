use dockboard_common::{InventoryError, InventorySnapshot, Result};
use std::path::{Path, PathBuf};
use tracing::info;

const TAGS_FILE: &str = "tags.json";
const CREDENTIALS_FILE: &str = "credentials.json";
const COUNTS_FILE: &str = "counts.json";
const CONTAINERS_FILE: &str = "containers.json";

/// On-disk layout of the data directory.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tags_path(&self) -> PathBuf {
        self.root.join(TAGS_FILE)
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.root.join(CREDENTIALS_FILE)
    }

    pub fn counts_path(&self) -> PathBuf {
        self.root.join(COUNTS_FILE)
    }

    pub fn containers_path(&self) -> PathBuf {
        self.root.join(CONTAINERS_FILE)
    }

    /// Creates the directory and seeds missing files. Existing files are left alone.
    pub async fn ensure(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            InventoryError::Storage(format!("create {}: {}", self.root.display(), e))
        })?;

        for path in [self.tags_path(), self.credentials_path(), self.counts_path()] {
            self.seed(&path, b"{}".to_vec()).await?;
        }

        let empty = serde_json::to_vec_pretty(&InventorySnapshot::empty())
            .map_err(|e| InventoryError::Storage(e.to_string()))?;
        self.seed(&self.containers_path(), empty).await
    }

    async fn seed(&self, path: &Path, contents: Vec<u8>) -> Result<()> {
        let exists = tokio::fs::try_exists(path)
            .await
            .map_err(|e| InventoryError::Storage(format!("stat {}: {}", path.display(), e)))?;
        if exists {
            return Ok(());
        }
        tokio::fs::write(path, contents)
            .await
            .map_err(|e| InventoryError::Storage(format!("write {}: {}", path.display(), e)))?;
        info!(path = %path.display(), "Created data file");
        Ok(())
    }
}
