//! Tag push trigger handlers
//!
//! A [`TagPushTriggerHandler`] decides, for one job and one event, whether to
//! start a build. Handlers for a job are combined into a
//! [`TagPushTriggerHandlerList`] that is built once when the job's trigger
//! configuration is loaded and never changes afterwards.

mod list;
mod pending_status;
mod tag_push;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::error::Result;
use crate::event::TagPushEvent;
use crate::filter::{BranchFilter, LabelFilter};
use crate::job::Job;
use crate::queue::{BuildEvent, BuildQueue};

pub use list::TagPushTriggerHandlerList;
pub use pending_status::PendingStatusHandler;
pub use tag_push::TagPushBuildHandler;

#[async_trait]
pub trait TagPushTriggerHandler: Send + Sync {
    /// React to one tag push for `job`.
    ///
    /// `ci_skip` is an unconditional veto. The filters are borrowed for the
    /// duration of the call and must be used as-is. Whether a build was started
    /// is deliberately not reported back.
    async fn handle(
        &self,
        job: &Job,
        event: &TagPushEvent,
        ci_skip: bool,
        branch_filter: &dyn BranchFilter,
        label_filter: &dyn LabelFilter,
    ) -> Result<()>;

    /// Short name used when reporting failures
    fn name(&self) -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    full.rsplit("::").next().unwrap_or(full)
}

/// Outcome of applying the gating context to an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Trigger,
    CiSkip,
    TagDeleted,
    BranchFiltered,
    LabelFiltered,
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Gate::Trigger => "allowed",
            Gate::CiSkip => "skipped due to ci-skip",
            Gate::TagDeleted => "tag was deleted",
            Gate::BranchFiltered => "ref is not allowed by the branch filter",
            Gate::LabelFiltered => "labels are not allowed by the label filter",
        };
        f.write_str(reason)
    }
}

/// Apply the gating context. `ci_skip` is checked first so filters are not consulted once vetoed.
pub fn evaluate_gate(
    event: &TagPushEvent,
    ci_skip: bool,
    branch_filter: &dyn BranchFilter,
    label_filter: &dyn LabelFilter,
) -> Gate {
    if ci_skip {
        return Gate::CiSkip;
    }
    if event.is_deletion() {
        return Gate::TagDeleted;
    }
    let tag = event.tag_name();
    if !branch_filter.is_branch_allowed(tag, tag) {
        return Gate::BranchFiltered;
    }
    if !label_filter.is_labels_allowed(&event.labels) {
        return Gate::LabelFiltered;
    }
    Gate::Trigger
}

/// Which tag push reactions a job has switched on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagPushTriggerOptions {
    pub trigger_on_tag_push: bool,
    pub set_pending_status: bool,
}

/// Build the handler list for one job. With tag push triggering off the list is empty.
pub fn new_tag_push_handler(
    options: TagPushTriggerOptions,
    queue: Arc<dyn BuildQueue>,
    events: broadcast::Sender<BuildEvent>,
) -> TagPushTriggerHandlerList {
    if !options.trigger_on_tag_push {
        return TagPushTriggerHandlerList::empty();
    }

    let mut handlers: Vec<Box<dyn TagPushTriggerHandler>> = Vec::new();
    if options.set_pending_status {
        handlers.push(Box::new(PendingStatusHandler::new(events)));
    }
    handlers.push(Box::new(TagPushBuildHandler::new(queue)));
    TagPushTriggerHandlerList::new(handlers)
}
