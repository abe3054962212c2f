use crate::error::AppError;
use crate::request_log::RequestCounts;
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use dockboard_common::{Credentials, Tag, TagMap};
use dockboard_inventory::PollOutcome;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use tracing::debug;

// ============================================================================
// Containers
// ============================================================================

/// `200` with the inventory, or `204` when nothing changed since the last response.
pub async fn list_containers(State(state): State<AppState>) -> Result<Response, AppError> {
    match state.gate.poll().await? {
        PollOutcome::NotModified => Ok(StatusCode::NO_CONTENT.into_response()),
        PollOutcome::Updated(snapshot) => {
            debug!(containers = snapshot.len(), "Serving updated inventory");
            Ok(Json(&*snapshot).into_response())
        }
    }
}

pub async fn force_containers(State(state): State<AppState>) -> Result<Response, AppError> {
    let snapshot = state.gate.force().await?;
    Ok(Json(&*snapshot).into_response())
}

// ============================================================================
// Tags
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTagsRequest {
    #[serde(default)]
    pub container_id: String,
    /// Required; an empty array clears the container's tags.
    pub tags: Option<Vec<Tag>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateTagsResponse {
    pub message: String,
    pub tags: Vec<Tag>,
}

pub async fn get_tags(State(state): State<AppState>) -> Json<TagMap> {
    Json(state.tags.all().await)
}

pub async fn update_tags(
    State(state): State<AppState>,
    Json(req): Json<UpdateTagsRequest>,
) -> Result<Json<UpdateTagsResponse>, AppError> {
    let incoming = req
        .tags
        .ok_or_else(|| AppError::BadRequest("tags must be an array".to_string()))?;
    let tags = state.tags.update(&req.container_id, incoming).await?;
    Ok(Json(UpdateTagsResponse {
        message: "Tags updated successfully".to_string(),
        tags,
    }))
}

// ============================================================================
// Credentials
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CredentialsQuery {
    #[serde(rename = "containerId")]
    pub container_id: Option<String>,
}

pub async fn get_credentials(
    State(state): State<AppState>,
    Query(query): Query<CredentialsQuery>,
) -> Result<Json<Credentials>, AppError> {
    let container_id = query
        .container_id
        .ok_or_else(|| AppError::BadRequest("containerId is required".to_string()))?;
    let credentials = state.credentials.get_or_init(&container_id).await?;
    Ok(Json(credentials))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCredentialsRequest {
    pub payload: String,
}

/// Decoded form of [`UpdateCredentialsRequest::payload`].
#[derive(Debug, Serialize, Deserialize)]
pub struct CredentialsPayload {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub containerid: String,
}

impl CredentialsPayload {
    pub fn decode(encoded: &str) -> Result<Self, AppError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| AppError::BadRequest("Invalid base64 payload".to_string()))?;
        let payload: CredentialsPayload = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::BadRequest(format!("Invalid payload JSON: {}", e)))?;
        if payload.containerid.trim().is_empty() {
            return Err(AppError::BadRequest("containerid is required".to_string()));
        }
        Ok(payload)
    }
}

pub async fn update_credentials(
    State(state): State<AppState>,
    Json(req): Json<UpdateCredentialsRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let payload = CredentialsPayload::decode(&req.payload)?;
    state
        .credentials
        .update(
            &payload.containerid,
            Credentials {
                username: payload.username,
                password: payload.password,
            },
        )
        .await?;

    Ok(Json(serde_json::json!({
        "message": "Credentials updated successfully"
    })))
}

// ============================================================================
// Housekeeping
// ============================================================================

pub async fn request_counts(State(state): State<AppState>) -> Json<RequestCounts> {
    Json(state.requests.counts())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerIpsResponse {
    pub serverips: Vec<String>,
}

/// External IPv4 addresses of this host, loopback excluded.
pub async fn server_ips() -> Result<Json<ServerIpsResponse>, AppError> {
    let interfaces = if_addrs::get_if_addrs()
        .map_err(|e| AppError::Internal(format!("Failed to list network interfaces: {}", e)))?;
    let serverips = interfaces
        .iter()
        .filter(|iface| !iface.is_loopback())
        .filter_map(|iface| match iface.ip() {
            IpAddr::V4(ip) => Some(ip.to_string()),
            IpAddr::V6(_) => None,
        })
        .collect();
    Ok(Json(ServerIpsResponse { serverips }))
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.cache.status();
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "cache": if status.populated { "populated" } else { "empty" },
        "containers": status.containers,
        "lastRefresh": status
            .refreshed_at
            .map(|t| chrono::DateTime::<chrono::Utc>::from(t).to_rfc3339()),
    }))
}
