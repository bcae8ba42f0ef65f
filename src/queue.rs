//! Build queue collaborator
//!
//! Handlers end their work here: a successful trigger is exactly one
//! `enqueue` call. The queue owns retry policy; nothing in the dispatch path
//! retries a failed enqueue.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::collections::VecDeque;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info};

use crate::error::Result;
use crate::job::{Build, BuildRequest, Job};

/// Default number of builds kept in memory
pub const DEFAULT_MAX_BUILDS: usize = 24;

/// Build event for SSE broadcasting
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BuildEvent {
    pub event_type: String, // pending, queued
    pub job_name: String,
    pub ref_name: String,
    pub commit_sha: String,
    pub build_id: Option<String>,
    pub timestamp: String,
}

impl BuildEvent {
    pub fn new(event_type: &str, job: &Job, ref_name: &str, commit_sha: &str) -> Self {
        Self {
            event_type: event_type.to_string(),
            job_name: job.name().to_string(),
            ref_name: ref_name.to_string(),
            commit_sha: commit_sha.to_string(),
            build_id: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[async_trait]
pub trait BuildQueue: Send + Sync {
    /// Enqueue one build of `job`. Errors surface to the calling handler as-is.
    async fn enqueue(&self, job: &Job, request: BuildRequest) -> Result<Build>;
}

/// Keeps the most recent builds in memory and announces each one on a broadcast channel.
pub struct InMemoryBuildQueue {
    builds: Mutex<VecDeque<Build>>,
    max_builds: usize,
    events: broadcast::Sender<BuildEvent>,
}

impl InMemoryBuildQueue {
    pub fn new(max_builds: usize, events: broadcast::Sender<BuildEvent>) -> Self {
        Self {
            builds: Mutex::new(VecDeque::with_capacity(max_builds)),
            max_builds: max_builds.max(1),
            events,
        }
    }

    pub async fn get_build(&self, id: &str) -> Option<Build> {
        let builds = self.builds.lock().await;
        builds.iter().find(|b| b.id == id).cloned()
    }

    /// Most recent first
    pub async fn recent_builds(&self, limit: usize) -> Vec<Build> {
        let builds = self.builds.lock().await;
        builds.iter().rev().take(limit).cloned().collect()
    }

    /// Most recent first
    pub async fn builds_for_job(&self, job_name: &str, limit: usize) -> Vec<Build> {
        let builds = self.builds.lock().await;
        builds
            .iter()
            .rev()
            .filter(|b| b.job_name == job_name)
            .take(limit)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.builds.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.builds.lock().await.is_empty()
    }
}

#[async_trait]
impl BuildQueue for InMemoryBuildQueue {
    async fn enqueue(&self, job: &Job, request: BuildRequest) -> Result<Build> {
        let build = Build::queued(job, request);

        {
            let mut builds = self.builds.lock().await;
            while builds.len() >= self.max_builds {
                if let Some(evicted) = builds.pop_front() {
                    debug!("Evicting build {} from history", evicted.id);
                }
            }
            builds.push_back(build.clone());
        }

        info!(
            "Queued build {} for job '{}' at {} ({})",
            build.id, build.job_name, build.ref_name, build.commit_sha
        );

        let mut event = BuildEvent::new("queued", job, &build.ref_name, &build.commit_sha);
        event.build_id = Some(build.id.clone());
        // No subscribers is fine
        let _ = self.events.send(event);

        Ok(build)
    }
}
