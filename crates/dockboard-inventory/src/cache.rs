//! In-memory inventory snapshot with mtime-based and timer-based refresh.
//!
//! The snapshot and both modification marks live behind one short-lived
//! `std::sync::RwLock`; it is never held across an await. Refresh work
//! (the external command round trip) is serialized by a separate async mutex
//! so concurrent callers join the refresh already in flight instead of
//! spawning their own.

use crate::inspector::RuntimeInspector;
use crate::merger;
use crate::storage::{SnapshotStore, TagStore};
use dockboard_common::{InventorySnapshot, Result};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, SystemTime};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
struct CacheState {
    snapshot: Option<Arc<InventorySnapshot>>,
    inventory_mark: Option<SystemTime>,
    tags_mark: Option<SystemTime>,
    completed_refreshes: u64,
    refreshed_at: Option<SystemTime>,
}

impl CacheState {
    fn is_stale(&self, inventory_now: Option<SystemTime>, tags_now: Option<SystemTime>) -> bool {
        self.snapshot.is_none()
            || newer_than(inventory_now, self.inventory_mark)
            || newer_than(tags_now, self.tags_mark)
    }
}

/// A file that exists but was never observed counts as newer.
fn newer_than(current: Option<SystemTime>, mark: Option<SystemTime>) -> bool {
    match (current, mark) {
        (Some(current), Some(mark)) => current > mark,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// Point-in-time view of the cache for health reporting.
#[derive(Debug, Clone)]
pub struct CacheStatus {
    pub populated: bool,
    pub containers: usize,
    pub completed_refreshes: u64,
    pub refreshed_at: Option<SystemTime>,
}

pub struct InventoryCache {
    inspector: Arc<dyn RuntimeInspector>,
    tags: Arc<dyn TagStore>,
    snapshots: Arc<dyn SnapshotStore>,
    state: RwLock<CacheState>,
    refresh_lock: Mutex<()>,
}

impl InventoryCache {
    pub fn new(
        inspector: Arc<dyn RuntimeInspector>,
        tags: Arc<dyn TagStore>,
        snapshots: Arc<dyn SnapshotStore>,
    ) -> Self {
        Self {
            inspector,
            tags,
            snapshots,
            state: RwLock::new(CacheState::default()),
            refresh_lock: Mutex::new(()),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// The snapshot currently held, or `None` before the first successful refresh.
    pub fn current(&self) -> Option<Arc<InventorySnapshot>> {
        self.read_state().snapshot.clone()
    }

    pub fn status(&self) -> CacheStatus {
        let state = self.read_state();
        CacheStatus {
            populated: state.snapshot.is_some(),
            containers: state.snapshot.as_ref().map_or(0, |s| s.len()),
            completed_refreshes: state.completed_refreshes,
            refreshed_at: state.refreshed_at,
        }
    }

    /// Re-queries the runtime regardless of staleness.
    ///
    /// A caller that had to wait for a refresh already in flight takes that
    /// refresh's result. On failure the held snapshot and marks are untouched.
    pub async fn refresh(&self) -> Result<Arc<InventorySnapshot>> {
        let seen = self.read_state().completed_refreshes;
        let _guard = self.refresh_lock.lock().await;

        let joined = {
            let state = self.read_state();
            if state.completed_refreshes > seen {
                state.snapshot.clone()
            } else {
                None
            }
        };
        if let Some(snapshot) = joined {
            debug!("Joined in-flight refresh");
            return Ok(snapshot);
        }

        self.refresh_locked().await
    }

    /// Refreshes only when a backing file changed since the last refresh or
    /// nothing has been loaded yet; otherwise returns the held snapshot.
    pub async fn refresh_if_needed(&self) -> Result<Arc<InventorySnapshot>> {
        let inventory_now = self.snapshots.last_modified().await;
        let tags_now = self.tags.last_modified().await;

        let held = {
            let state = self.read_state();
            if state.is_stale(inventory_now, tags_now) {
                None
            } else {
                state.snapshot.clone()
            }
        };

        match held {
            Some(snapshot) => Ok(snapshot),
            None => {
                debug!("Backing files changed, refreshing inventory");
                self.refresh().await
            }
        }
    }

    #[instrument(skip(self))]
    async fn refresh_locked(&self) -> Result<Arc<InventorySnapshot>> {
        // Observe the tag file before reading it so a concurrent edit is caught next time
        let tags_mark = self.tags.last_modified().await;
        let tag_map = self.tags.load().await;

        let snapshot = match merger::collect(self.inspector.as_ref(), &tag_map).await {
            Ok(snapshot) => Arc::new(snapshot),
            Err(e) => {
                warn!(error = %e, "Inventory refresh failed, keeping previous snapshot");
                return Err(e);
            }
        };

        if let Err(e) = self.snapshots.save(&snapshot).await {
            warn!(error = %e, "Failed to persist inventory snapshot, keeping previous snapshot");
            return Err(e);
        }
        let inventory_mark = self.snapshots.last_modified().await;

        {
            let mut state = self.write_state();
            state.snapshot = Some(snapshot.clone());
            state.inventory_mark = inventory_mark;
            state.tags_mark = tags_mark;
            state.completed_refreshes += 1;
            state.refreshed_at = Some(SystemTime::now());
        }

        debug!(containers = snapshot.len(), "Inventory snapshot replaced");
        Ok(snapshot)
    }

    /// Spawns the fixed-period background refresh. The first tick fires immediately.
    pub fn start(self: &Arc<Self>, period: Duration) -> RefreshTask {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let cache = Arc::clone(self);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(?period, "Background inventory refresh started");

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match cache.refresh().await {
                            Ok(snapshot) => debug!(containers = snapshot.len(), "Cache updated via scheduled refresh"),
                            Err(e) => error!(error = %e, "Scheduled refresh failed"),
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }

            info!("Background inventory refresh stopped");
        });

        RefreshTask {
            shutdown: shutdown_tx,
            handle,
        }
    }
}

/// Handle to the background refresh loop.
pub struct RefreshTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl RefreshTask {
    /// Signals the loop and waits for an in-progress refresh to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            error!(error = %e, "Background refresh task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
