//! API module for all HTTP handlers
//!
//! The webhook endpoint is the dispatch entry point; the rest expose what was queued.

pub mod builds;
pub mod config;
pub mod stream;
pub mod webhook;

use axum::{Router, routing};

use crate::SharedState;

// Re-export handlers
pub use builds::{get_build, get_builds, status};
pub use config::reload_config_endpoint;
pub use stream::stream_builds;
pub use webhook::handle_webhook;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/webhook", routing::post(handle_webhook))
        .route("/status", routing::get(status))
        .route("/api/builds", routing::get(get_builds))
        .route("/api/builds/{id}", routing::get(get_build))
        .route("/api/stream/builds", routing::get(stream_builds))
        .route("/api/reload", routing::post(reload_config_endpoint))
        .with_state(state)
}
