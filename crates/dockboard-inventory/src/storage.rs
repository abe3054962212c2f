use async_trait::async_trait;
use dockboard_common::{InventoryError, InventorySnapshot, Result, TagMap};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;
use tracing::{debug, warn};

/// Durable short-id -> tags mapping.
#[async_trait]
pub trait TagStore: Send + Sync {
    /// Never fails: a missing or unreadable backing store reads as empty.
    async fn load(&self) -> TagMap;
    /// Replaces the whole mapping.
    async fn save(&self, tags: &TagMap) -> Result<()>;
    async fn last_modified(&self) -> Option<SystemTime>;
}

/// Where the cache persists each merged snapshot.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save(&self, snapshot: &InventorySnapshot) -> Result<()>;
    async fn last_modified(&self) -> Option<SystemTime>;
}

// --- JSON file backends ---

pub struct JsonFileTagStore {
    path: PathBuf,
}

impl JsonFileTagStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TagStore for JsonFileTagStore {
    async fn load(&self) -> TagMap {
        read_json_or_default(&self.path).await
    }

    async fn save(&self, tags: &TagMap) -> Result<()> {
        write_json_atomic(&self.path, tags).await
    }

    async fn last_modified(&self) -> Option<SystemTime> {
        modified_time(&self.path).await
    }
}

pub struct JsonFileSnapshotStore {
    path: PathBuf,
}

impl JsonFileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotStore for JsonFileSnapshotStore {
    async fn save(&self, snapshot: &InventorySnapshot) -> Result<()> {
        write_json_atomic(&self.path, snapshot).await
    }

    async fn last_modified(&self) -> Option<SystemTime> {
        modified_time(&self.path).await
    }
}

// --- In-memory backends for development/testing ---

#[derive(Default)]
struct Versioned<T> {
    value: T,
    modified: Option<SystemTime>,
}

#[derive(Default)]
pub struct InMemoryTagStore {
    inner: RwLock<Versioned<TagMap>>,
}

impl InMemoryTagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates an out-of-band edit of the backing file.
    pub fn replace(&self, tags: TagMap) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.value = tags;
        inner.modified = Some(next_modification(inner.modified));
    }
}

#[async_trait]
impl TagStore for InMemoryTagStore {
    async fn load(&self) -> TagMap {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .value
            .clone()
    }

    async fn save(&self, tags: &TagMap) -> Result<()> {
        self.replace(tags.clone());
        Ok(())
    }

    async fn last_modified(&self) -> Option<SystemTime> {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).modified
    }
}

#[derive(Default)]
pub struct InMemorySnapshotStore {
    inner: RwLock<Versioned<Option<InventorySnapshot>>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Option<InventorySnapshot> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .value
            .clone()
    }

    /// Bumps the modification time without changing content, like `touch`.
    pub fn touch(&self) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.modified = Some(next_modification(inner.modified));
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn save(&self, snapshot: &InventorySnapshot) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.value = Some(snapshot.clone());
        inner.modified = Some(next_modification(inner.modified));
        Ok(())
    }

    async fn last_modified(&self) -> Option<SystemTime> {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).modified
    }
}

/// Strictly increasing clock so back-to-back saves are always distinguishable.
fn next_modification(previous: Option<SystemTime>) -> SystemTime {
    let now = SystemTime::now();
    match previous {
        Some(prev) if now <= prev => prev + std::time::Duration::from_nanos(1),
        _ => now,
    }
}

// --- File helpers ---

pub(crate) async fn modified_time(path: &Path) -> Option<SystemTime> {
    tokio::fs::metadata(path).await.ok()?.modified().ok()
}

/// Reads JSON from `path`, falling back to `T::default()` when the file is
/// missing or does not parse.
pub async fn read_json_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "File not found, using empty value");
            return T::default();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read file, using empty value");
            return T::default();
        }
    };

    match serde_json::from_slice(&data) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Corrupt JSON file, using empty value");
            T::default()
        }
    }
}

/// Reads JSON from `path`; a missing file is `T::default()`, anything else that
/// goes wrong is a `Storage` error.
pub async fn read_json_strict<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => {
            return Err(InventoryError::Storage(format!(
                "read {}: {}",
                path.display(),
                e
            )))
        }
    };
    serde_json::from_slice(&data)
        .map_err(|e| InventoryError::Storage(format!("parse {}: {}", path.display(), e)))
}

/// Writes `value` as pretty JSON through a temp file in the same directory
/// followed by a rename, so readers never see a partial file.
pub async fn write_json_atomic<T>(path: &Path, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| InventoryError::Storage(format!("serialize {}: {}", path.display(), e)))?;
    let path = path.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<()> {
        use std::io::Write;

        let storage_err = |e: std::io::Error| {
            InventoryError::Storage(format!("write {}: {}", path.display(), e))
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(storage_err)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(storage_err)?;
        tmp.write_all(&json).map_err(storage_err)?;
        tmp.as_file().sync_all().map_err(storage_err)?;
        tmp.persist(&path).map_err(|e| storage_err(e.error))?;
        Ok(())
    })
    .await
    .map_err(|e| InventoryError::Storage(format!("write task failed: {e}")))?
}
