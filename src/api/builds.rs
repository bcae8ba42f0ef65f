//! Build listing endpoints

use axum::{
    Json,
    extract::{Path, Query, State as AxumState},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use crate::SharedState;

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

/// Query parameters for build listing
#[derive(Debug, Deserialize)]
pub struct BuildsQuery {
    /// Filter by job name
    pub job: Option<String>,
    /// Number of builds to return (default: 10, max: 100)
    pub limit: Option<usize>,
}

/// GET /status - Server status with the most recent builds
pub async fn status(AxumState(state): AxumState<SharedState>) -> impl IntoResponse {
    let registry = state.registry();
    let recent = state.queue.recent_builds(DEFAULT_LIMIT).await;
    let jobs: Vec<_> = registry
        .jobs()
        .iter()
        .map(|j| {
            json!({
                "name": j.job.name(),
                "repository": j.config.repository,
                "handlers": j.handlers.handler_names(),
            })
        })
        .collect();

    Json(json!({
        "server": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "started_at": state.started_at,
            "uptime_seconds": state.start_time.elapsed().as_secs(),
        },
        "jobs": jobs,
        "builds": {
            "recent": recent,
            "total_kept": state.queue.len().await,
        },
    }))
}

/// GET /api/builds - Most recent builds, optionally for one job
pub async fn get_builds(
    AxumState(state): AxumState<SharedState>,
    Query(params): Query<BuildsQuery>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let builds = match &params.job {
        Some(job) => state.queue.builds_for_job(job, limit).await,
        None => state.queue.recent_builds(limit).await,
    };

    Json(json!({
        "builds": builds,
        "count": builds.len(),
    }))
}

/// GET /api/builds/{id} - One build by id
pub async fn get_build(
    AxumState(state): AxumState<SharedState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.queue.get_build(&id).await {
        Some(build) => Json(build).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Build not found"})),
        )
            .into_response(),
    }
}
