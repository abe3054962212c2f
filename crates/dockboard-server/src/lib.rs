// Dockboard HTTP server - container inventory, tags and credentials API

pub mod config;
pub mod error;
pub mod handlers;
pub mod request_log;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use dockboard_common::Result;
use dockboard_inventory::{
    ChangeGate, CredentialStore, DataDir, InventoryCache, JsonFileCredentialStore,
    JsonFileSnapshotStore, JsonFileTagStore, RuntimeInspector, TagEditor,
};
use request_log::RequestLog;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use config::ServerConfig;
pub use error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<InventoryCache>,
    pub gate: Arc<ChangeGate>,
    pub tags: Arc<TagEditor>,
    pub credentials: Arc<dyn CredentialStore>,
    pub requests: Arc<RequestLog>,
}

impl AppState {
    /// Seeds the data directory and wires the file-backed stores around `inspector`.
    pub async fn open(data: &DataDir, inspector: Arc<dyn RuntimeInspector>) -> Result<Self> {
        data.ensure().await?;

        let tag_store = Arc::new(JsonFileTagStore::new(data.tags_path()));
        let cache = Arc::new(InventoryCache::new(
            inspector,
            tag_store.clone(),
            Arc::new(JsonFileSnapshotStore::new(data.containers_path())),
        ));

        Ok(Self {
            gate: Arc::new(ChangeGate::new(cache.clone())),
            cache,
            tags: Arc::new(TagEditor::new(tag_store)),
            credentials: Arc::new(JsonFileCredentialStore::new(data.credentials_path())),
            requests: Arc::new(RequestLog::load(data.counts_path()).await),
        })
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        // Inventory
        .route("/api/containers", get(handlers::list_containers))
        .route("/api/containers/force", get(handlers::force_containers))

        // Operator metadata
        .route("/api/tags", get(handlers::get_tags).post(handlers::update_tags))
        .route("/api/credentials", get(handlers::get_credentials))
        .route("/api/updateCred", post(handlers::update_credentials))

        // Monitoring
        .route("/api/requests", get(handlers::request_counts))
        .route("/api/serverips", get(handlers::server_ips))
        .route("/health", get(handlers::health))

        .layer(from_fn_with_state(
            state.requests.clone(),
            request_log::track_requests,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
