use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use super::{Gate, TagPushTriggerHandler, evaluate_gate};
use crate::error::{Result, TriggerError};
use crate::event::TagPushEvent;
use crate::filter::{BranchFilter, LabelFilter};
use crate::job::{BuildCause, BuildRequest, Job};
use crate::queue::BuildQueue;

/// Starts one build of the job for every tag push that passes the gating context.
pub struct TagPushBuildHandler {
    queue: Arc<dyn BuildQueue>,
}

impl TagPushBuildHandler {
    pub fn new(queue: Arc<dyn BuildQueue>) -> Self {
        Self { queue }
    }
}

/// Parameters handed to the build, derived from the event
fn build_parameters(event: &TagPushEvent, commit_sha: &str) -> BTreeMap<String, String> {
    let mut parameters = BTreeMap::new();
    parameters.insert("TRIGGER_REF".to_string(), event.ref_name.clone());
    parameters.insert("TRIGGER_TAG".to_string(), event.tag_name().to_string());
    parameters.insert("TRIGGER_COMMIT".to_string(), commit_sha.to_string());
    if let Some(user) = event.user() {
        parameters.insert("TRIGGER_USER".to_string(), user.to_string());
    }
    if let Some(project) = event.project_path() {
        parameters.insert("TRIGGER_PROJECT".to_string(), project.to_string());
    }
    parameters
}

#[async_trait]
impl TagPushTriggerHandler for TagPushBuildHandler {
    async fn handle(
        &self,
        job: &Job,
        event: &TagPushEvent,
        ci_skip: bool,
        branch_filter: &dyn BranchFilter,
        label_filter: &dyn LabelFilter,
    ) -> Result<()> {
        let gate = evaluate_gate(event, ci_skip, branch_filter, label_filter);
        if gate != Gate::Trigger {
            info!(
                "Not triggering job '{}' for tag {}: {}",
                job,
                event.tag_name(),
                gate
            );
            return Ok(());
        }

        let commit_sha = event
            .commit_sha()
            .ok_or_else(|| TriggerError::NoRevision(event.ref_name.clone()))?;

        info!("Job '{}' triggered for tag {}.", job, event.tag_name());

        let request = BuildRequest {
            ref_name: event.ref_name.clone(),
            commit_sha: commit_sha.to_string(),
            cause: BuildCause::TagPush {
                user_name: event.user().map(String::from),
                project: event.project_path().map(String::from),
            },
            parameters: build_parameters(event, commit_sha),
        };
        self.queue.enqueue(job, request).await?;
        Ok(())
    }
}
