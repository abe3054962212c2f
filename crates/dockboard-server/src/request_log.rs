//! Per-route request counters persisted to `counts.json`.

use axum::{
    extract::{MatchedPath, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use dockboard_common::Result;
use dockboard_inventory::{read_json_or_default, write_json_atomic};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Mutex as AsyncMutex;
use tracing::warn;

const UNMATCHED: &str = "<unmatched>";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteCount {
    #[serde(default, alias = "count")]
    pub total: u64,
    /// Status code -> count.
    #[serde(default, alias = "responses")]
    pub statuses: BTreeMap<String, u64>,
}

pub type RequestCounts = BTreeMap<String, RouteCount>;

#[derive(Default)]
struct Tally {
    counts: RequestCounts,
    version: u64,
}

/// Counts are updated in memory per request; [`RequestLog::flush`] writes them out.
pub struct RequestLog {
    path: PathBuf,
    tally: Mutex<Tally>,
    /// Version on disk. Held across the write so files land in version order.
    persisted: AsyncMutex<u64>,
}

impl RequestLog {
    /// Resumes from the counts already on disk, if any.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let counts = read_json_or_default(&path).await;
        Self {
            path,
            tally: Mutex::new(Tally { counts, version: 0 }),
            persisted: AsyncMutex::new(0),
        }
    }

    pub fn record(&self, route: &str, status: StatusCode) {
        let mut tally = self.lock_tally();
        let entry = tally.counts.entry(route.to_string()).or_default();
        entry.total += 1;
        *entry
            .statuses
            .entry(status.as_u16().to_string())
            .or_default() += 1;
        tally.version += 1;
    }

    pub fn counts(&self) -> RequestCounts {
        self.lock_tally().counts.clone()
    }

    /// Writes the latest counts unless a newer or equal version is already on disk.
    pub async fn flush(&self) -> Result<()> {
        let mut persisted = self.persisted.lock().await;
        let (counts, version) = {
            let tally = self.lock_tally();
            (tally.counts.clone(), tally.version)
        };
        if version <= *persisted {
            return Ok(());
        }
        write_json_atomic(&self.path, &counts).await?;
        *persisted = version;
        Ok(())
    }

    fn lock_tally(&self) -> MutexGuard<'_, Tally> {
        self.tally.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub async fn track_requests(
    State(log): State<Arc<RequestLog>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED.to_string());
    let route = format!("{} {}", request.method(), path);

    let response = next.run(request).await;
    log.record(&route, response.status());

    tokio::spawn(async move {
        if let Err(e) = log.flush().await {
            warn!(error = %e, "Failed to persist request counts");
        }
    });
    response
}
