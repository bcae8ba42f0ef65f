pub mod api;
pub mod ci_skip;
pub mod config;
pub mod error;
pub mod event;
pub mod filter;
pub mod handler;
pub mod job;
pub mod logging;
pub mod queue;
pub mod rate_limit;
pub mod registry;

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tokio::sync::{Mutex, broadcast};
use tracing::info;

use config::{TriggerConfig, reload_config};
use error::Result;
use queue::{BuildEvent, BuildQueue, InMemoryBuildQueue};
use rate_limit::RateLimiter;
use registry::JobRegistry;

const BUILD_EVENT_CAPACITY: usize = 100;

pub struct AppState {
    registry: RwLock<Arc<JobRegistry>>,
    pub queue: Arc<InMemoryBuildQueue>,
    pub build_events: broadcast::Sender<BuildEvent>,
    pub rate_limiter: Mutex<RateLimiter>,
    pub config_path: PathBuf,
    reload_lock: Mutex<()>,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: &TriggerConfig, config_path: PathBuf, max_builds: usize) -> Result<Self> {
        let (build_events, _) = broadcast::channel(BUILD_EVENT_CAPACITY);
        let queue = Arc::new(InMemoryBuildQueue::new(max_builds, build_events.clone()));
        let registry = JobRegistry::from_config(config, queue.clone(), build_events.clone())?;

        Ok(Self {
            registry: RwLock::new(Arc::new(registry)),
            queue,
            build_events,
            rate_limiter: Mutex::new(RateLimiter::new()),
            config_path,
            reload_lock: Mutex::new(()),
            start_time: Instant::now(),
            started_at: Utc::now(),
        })
    }

    /// Snapshot of the current registry; dispatches keep using it even if a reload happens meanwhile.
    pub fn registry(&self) -> Arc<JobRegistry> {
        let guard = self.registry.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Re-read the config file and swap in a freshly built registry.
    /// On error the current registry stays in place.
    pub async fn reload(&self) -> Result<usize> {
        let _guard = self.reload_lock.lock().await;

        let config = reload_config(&self.config_path).await?;
        let queue: Arc<dyn BuildQueue> = self.queue.clone();
        let registry = JobRegistry::from_config(&config, queue, self.build_events.clone())?;
        let job_count = registry.jobs().len();

        // Jobs that left the config should not keep their delivery history
        let names: Vec<&str> = registry.jobs().iter().map(|j| j.job.name()).collect();
        self.rate_limiter.lock().await.retain_jobs(&names);

        let mut current = self.registry.write().unwrap_or_else(|e| e.into_inner());
        *current = Arc::new(registry);
        info!(
            "Configuration reloaded from {:?} ({} jobs)",
            self.config_path, job_count
        );
        Ok(job_count)
    }
}
