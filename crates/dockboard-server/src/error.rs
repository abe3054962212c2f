use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dockboard_common::InventoryError;
use tracing::error;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    /// Runtime round trip failed; details are logged, never returned.
    InventoryUnavailable,
    Internal(String),
}

impl From<InventoryError> for AppError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::InvalidInput(msg) => AppError::BadRequest(msg),
            InventoryError::RuntimeUnavailable(_) | InventoryError::Parse(_) => {
                error!(error = %err, "Inventory refresh failed");
                AppError::InventoryUnavailable
            }
            InventoryError::Storage(msg) | InventoryError::Config(msg) => AppError::Internal(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::InventoryUnavailable => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "inventory unavailable".to_string(),
            ),
            AppError::Internal(msg) => {
                error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
