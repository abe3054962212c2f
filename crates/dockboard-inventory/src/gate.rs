//! Change detection for polling clients.
//!
//! The gate remembers the fingerprint of the last snapshot it handed out. A
//! poll that would return identical content reports [`PollOutcome::NotModified`]
//! instead. The baseline is shared by every client of one process, so with
//! several dashboards open only the first poller after a change sees the new
//! content; the others are expected to fall back to a forced read.

use crate::cache::InventoryCache;
use dockboard_common::{InventoryError, InventorySnapshot, Result};
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    NotModified,
    Updated(Arc<InventorySnapshot>),
}

pub struct ChangeGate {
    cache: Arc<InventoryCache>,
    last_sent: Mutex<Option<String>>,
}

impl ChangeGate {
    pub fn new(cache: Arc<InventoryCache>) -> Self {
        Self {
            cache,
            last_sent: Mutex::new(None),
        }
    }

    pub fn cache(&self) -> &Arc<InventoryCache> {
        &self.cache
    }

    /// Refreshes if needed and reports whether the content differs from the
    /// last snapshot handed out.
    pub async fn poll(&self) -> Result<PollOutcome> {
        let snapshot = self.cache.refresh_if_needed().await?;
        let digest = fingerprint(&snapshot)?;

        let mut last = self.last_sent.lock().unwrap_or_else(|e| e.into_inner());
        if last.as_deref() == Some(digest.as_str()) {
            debug!(fingerprint = %digest, "Inventory unchanged");
            return Ok(PollOutcome::NotModified);
        }
        *last = Some(digest);
        Ok(PollOutcome::Updated(snapshot))
    }

    /// Forced refresh. Always returns the content and resets the baseline to it.
    pub async fn force(&self) -> Result<Arc<InventorySnapshot>> {
        let snapshot = self.cache.refresh().await?;
        let digest = fingerprint(&snapshot)?;
        *self.last_sent.lock().unwrap_or_else(|e| e.into_inner()) = Some(digest);
        Ok(snapshot)
    }

    pub fn last_fingerprint(&self) -> Option<String> {
        self.last_sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// MD5 hex digest of the snapshot's compact JSON serialization.
pub fn fingerprint(snapshot: &InventorySnapshot) -> Result<String> {
    let bytes = serde_json::to_vec(snapshot)
        .map_err(|e| InventoryError::Storage(format!("serialize snapshot: {e}")))?;
    Ok(format!("{:x}", md5::compute(bytes)))
}
