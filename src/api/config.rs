//! Config API endpoints

use axum::{Json, extract::State as AxumState, http::StatusCode, response::IntoResponse};
use serde_json::json;
use tracing::error;

use crate::SharedState;

/// POST /api/reload - Reload configuration from disk
/// Dispatches already in flight finish against the registry they started with
pub async fn reload_config_endpoint(AxumState(state): AxumState<SharedState>) -> impl IntoResponse {
    match state.reload().await {
        Ok(jobs) => Json(json!({
            "status": "success",
            "message": "Configuration reloaded successfully",
            "jobs": jobs,
        }))
        .into_response(),
        Err(e) => {
            error!("Failed to reload config: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "message": e.to_string()
                })),
            )
                .into_response()
        }
    }
}
