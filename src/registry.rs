//! Jobs connected to upstream repositories, ready for dispatch
//!
//! A registry is built in one go from a [`TriggerConfig`]. Each job gets its
//! handler list and filters at that point; reloading the configuration builds
//! a fresh registry instead of touching the old one.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::ci_skip::is_ci_skip;
use crate::config::{ProjectConfig, TriggerConfig};
use crate::error::{DispatchError, Result};
use crate::event::TagPushEvent;
use crate::filter::{BranchFilter, LabelFilter};
use crate::handler::{TagPushTriggerHandlerList, new_tag_push_handler};
use crate::job::Job;
use crate::queue::{BuildEvent, BuildQueue};

pub struct ConfiguredJob {
    pub job: Job,
    pub config: ProjectConfig,
    pub handlers: TagPushTriggerHandlerList,
    pub branch_filter: Arc<dyn BranchFilter>,
    pub label_filter: Arc<dyn LabelFilter>,
}

impl ConfiguredJob {
    pub fn from_config(
        config: &ProjectConfig,
        queue: Arc<dyn BuildQueue>,
        events: broadcast::Sender<BuildEvent>,
    ) -> Result<Self> {
        Ok(Self {
            job: Job::new(config.name.clone())?,
            handlers: new_tag_push_handler(config.trigger_options(), queue, events),
            branch_filter: config.branch_filter.build()?,
            label_filter: config.label_filter.build(),
            config: config.clone(),
        })
    }

    /// The ci-skip flag for this job, computed once per dispatch
    pub fn ci_skip(&self, event: &TagPushEvent) -> bool {
        self.config.ci_skip_enabled() && is_ci_skip(event)
    }

    /// Hand one event to this job's handlers with the job's gating context.
    pub async fn dispatch(&self, event: &TagPushEvent) -> std::result::Result<(), DispatchError> {
        let ci_skip = self.ci_skip(event);
        debug!(
            "Dispatching tag {} to job '{}' (ci_skip = {})",
            event.tag_name(),
            self.job,
            ci_skip
        );
        self.handlers
            .dispatch(
                &self.job,
                event,
                ci_skip,
                self.branch_filter.as_ref(),
                self.label_filter.as_ref(),
            )
            .await
    }
}

#[derive(Default)]
pub struct JobRegistry {
    jobs: Vec<ConfiguredJob>,
}

impl JobRegistry {
    pub fn from_config(
        config: &TriggerConfig,
        queue: Arc<dyn BuildQueue>,
        events: broadcast::Sender<BuildEvent>,
    ) -> Result<Self> {
        let jobs = config
            .project
            .iter()
            .map(|project| ConfiguredJob::from_config(project, queue.clone(), events.clone()))
            .collect::<Result<Vec<_>>>()?;
        info!("Loaded {} job(s) with tag push triggers", jobs.len());
        Ok(Self { jobs })
    }

    pub fn jobs(&self) -> &[ConfiguredJob] {
        &self.jobs
    }

    pub fn get(&self, name: &str) -> Option<&ConfiguredJob> {
        self.jobs.iter().find(|j| j.job.name() == name)
    }

    /// Jobs connected to the repository the event came from, in configuration order
    pub fn jobs_for_event(&self, event: &TagPushEvent) -> Vec<&ConfiguredJob> {
        let Some(project_path) = event.project_path() else {
            return Vec::new();
        };
        self.jobs
            .iter()
            .filter(|j| j.config.matches_repository(project_path))
            .collect()
    }
}
