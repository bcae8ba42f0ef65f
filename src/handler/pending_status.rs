use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use super::{Gate, TagPushTriggerHandler, evaluate_gate};
use crate::error::Result;
use crate::event::TagPushEvent;
use crate::filter::{BranchFilter, LabelFilter};
use crate::job::Job;
use crate::queue::BuildEvent;

/// Announces a `pending` status for the pushed commit before its build is queued.
pub struct PendingStatusHandler {
    events: broadcast::Sender<BuildEvent>,
}

impl PendingStatusHandler {
    pub fn new(events: broadcast::Sender<BuildEvent>) -> Self {
        Self { events }
    }
}

#[async_trait]
impl TagPushTriggerHandler for PendingStatusHandler {
    async fn handle(
        &self,
        job: &Job,
        event: &TagPushEvent,
        ci_skip: bool,
        branch_filter: &dyn BranchFilter,
        label_filter: &dyn LabelFilter,
    ) -> Result<()> {
        if evaluate_gate(event, ci_skip, branch_filter, label_filter) != Gate::Trigger {
            return Ok(());
        }
        // The build handler reports a missing revision
        let Some(commit_sha) = event.commit_sha() else {
            return Ok(());
        };

        debug!(
            "Setting pending status for job '{}' on {}",
            job, commit_sha
        );
        // No subscribers is fine
        let _ = self
            .events
            .send(BuildEvent::new("pending", job, &event.ref_name, commit_sha));
        Ok(())
    }
}
