use simple_git_trigger::config::load_config;
use simple_git_trigger::logging::{FileLogger, setup_logging};
use simple_git_trigger::queue::DEFAULT_MAX_BUILDS;
use simple_git_trigger::{AppState, api};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8888";
const DEFAULT_CONFIG_PATH: &str = "trigger_config.toml";

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let file_logger = std::env::var("LOG_DIR")
        .ok()
        .map(|dir| FileLogger::new(PathBuf::from(dir)));
    // Keep the guard for the lifetime of the server so file logs get flushed
    let _log_guard = match setup_logging(file_logger.as_ref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Logging setup failed: {}", e);
            std::process::exit(1);
        }
    };

    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string());
    let config_path = PathBuf::from(
        std::env::var("TRIGGER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string()),
    );

    let config = match load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let state = match AppState::new(&config, config_path.clone(), DEFAULT_MAX_BUILDS) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("Failed to set up trigger handlers: {}", e);
            std::process::exit(1);
        }
    };

    let app = api::router(state);

    info!("Listening on {}", bind_address);
    info!("Using config at {:?}", config_path);
    let listener = match tokio::net::TcpListener::bind(&bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", bind_address, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
    }
}
