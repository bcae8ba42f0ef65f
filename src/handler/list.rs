use async_trait::async_trait;
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::{debug, warn};

use super::TagPushTriggerHandler;
use crate::error::{DispatchError, HandlerFailure, Result, TriggerError};
use crate::event::TagPushEvent;
use crate::filter::{BranchFilter, LabelFilter};
use crate::job::Job;

/// Several handlers presented as one.
///
/// Every handler sees every dispatched event exactly once, in registration
/// order, with the same arguments. A failing or panicking handler does not stop
/// the ones after it; failures are reported together once all handlers have run.
pub struct TagPushTriggerHandlerList {
    handlers: Vec<Box<dyn TagPushTriggerHandler>>,
}

impl TagPushTriggerHandlerList {
    pub fn new(handlers: Vec<Box<dyn TagPushTriggerHandler>>) -> Self {
        Self { handlers }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Fan one event out to every handler, sequentially.
    pub async fn dispatch(
        &self,
        job: &Job,
        event: &TagPushEvent,
        ci_skip: bool,
        branch_filter: &dyn BranchFilter,
        label_filter: &dyn LabelFilter,
    ) -> std::result::Result<(), DispatchError> {
        debug!(
            "Dispatching tag {} for job '{}' to {} handler(s)",
            event.tag_name(),
            job,
            self.handlers.len()
        );

        let mut failures = Vec::new();
        for (index, handler) in self.handlers.iter().enumerate() {
            let outcome = AssertUnwindSafe(handler.handle(
                job,
                event,
                ci_skip,
                branch_filter,
                label_filter,
            ))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(TriggerError::HandlerPanicked(panic_message(panic))));

            if let Err(error) = outcome {
                warn!(
                    "Handler {} ({}) failed for job '{}' tag {}: {}",
                    index,
                    handler.name(),
                    job,
                    event.tag_name(),
                    error
                );
                failures.push(HandlerFailure {
                    index,
                    handler: handler.name(),
                    error,
                });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DispatchError {
                attempted: self.handlers.len(),
                failures,
            })
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(message) => *message,
        Err(panic) => panic
            .downcast_ref::<&str>()
            .map(|message| message.to_string())
            .unwrap_or_else(|| "unknown panic payload".to_string()),
    }
}

#[async_trait]
impl TagPushTriggerHandler for TagPushTriggerHandlerList {
    async fn handle(
        &self,
        job: &Job,
        event: &TagPushEvent,
        ci_skip: bool,
        branch_filter: &dyn BranchFilter,
        label_filter: &dyn LabelFilter,
    ) -> Result<()> {
        self.dispatch(job, event, ci_skip, branch_filter, label_filter)
            .await
            .map_err(TriggerError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{AcceptAllLabels, AllBranchesFilter};
    use std::sync::{Arc, Mutex};

    /// What one handler saw, with the gating context reduced to addresses.
    #[derive(Debug, Clone, PartialEq)]
    struct Invocation {
        handler: &'static str,
        job: String,
        event: usize,
        ci_skip: bool,
        branch_filter: usize,
        label_filter: usize,
    }

    struct RecordingHandler {
        id: &'static str,
        fail: bool,
        log: Arc<Mutex<Vec<Invocation>>>,
    }

    impl RecordingHandler {
        fn boxed(
            id: &'static str,
            fail: bool,
            log: &Arc<Mutex<Vec<Invocation>>>,
        ) -> Box<dyn TagPushTriggerHandler> {
            Box::new(Self {
                id,
                fail,
                log: Arc::clone(log),
            })
        }
    }

    #[async_trait]
    impl TagPushTriggerHandler for RecordingHandler {
        async fn handle(
            &self,
            job: &Job,
            event: &TagPushEvent,
            ci_skip: bool,
            branch_filter: &dyn BranchFilter,
            label_filter: &dyn LabelFilter,
        ) -> Result<()> {
            self.log.lock().unwrap().push(Invocation {
                handler: self.id,
                job: job.name().to_string(),
                event: event as *const TagPushEvent as usize,
                ci_skip,
                branch_filter: branch_filter as *const dyn BranchFilter as *const () as usize,
                label_filter: label_filter as *const dyn LabelFilter as *const () as usize,
            });
            if self.fail {
                Err(TriggerError::EnqueueFailed {
                    job: job.name().to_string(),
                    message: format!("{} exploded", self.id),
                })
            } else {
                Ok(())
            }
        }

        fn name(&self) -> &'static str {
            self.id
        }
    }

    struct PanickingHandler;

    #[async_trait]
    impl TagPushTriggerHandler for PanickingHandler {
        async fn handle(
            &self,
            job: &Job,
            _event: &TagPushEvent,
            _ci_skip: bool,
            _branch_filter: &dyn BranchFilter,
            _label_filter: &dyn LabelFilter,
        ) -> Result<()> {
            panic!("handler for {} blew up", job);
        }
    }

    fn new_log() -> Arc<Mutex<Vec<Invocation>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn order(log: &Arc<Mutex<Vec<Invocation>>>) -> Vec<&'static str> {
        log.lock().unwrap().iter().map(|i| i.handler).collect()
    }

    #[tokio::test]
    async fn every_handler_sees_identical_arguments() {
        let log = new_log();
        let list = TagPushTriggerHandlerList::new(vec![
            RecordingHandler::boxed("h1", false, &log),
            RecordingHandler::boxed("h2", false, &log),
            RecordingHandler::boxed("h3", false, &log),
        ]);
        let job = Job::new("release").unwrap();
        let event = TagPushEvent::new("v1.0.0", "abc123");

        list.dispatch(&job, &event, true, &AllBranchesFilter, &AcceptAllLabels)
            .await
            .unwrap();

        let calls = log.lock().unwrap().clone();
        assert_eq!(calls.len(), 3);
        let first = &calls[0];
        for call in &calls {
            assert_eq!(call.job, "release");
            assert!(call.ci_skip);
            assert_eq!(call.event, &event as *const TagPushEvent as usize);
            assert_eq!(call.event, first.event);
            assert_eq!(call.branch_filter, first.branch_filter);
            assert_eq!(call.label_filter, first.label_filter);
        }
    }

    #[tokio::test]
    async fn handlers_run_in_registration_order() {
        let log = new_log();
        let list = TagPushTriggerHandlerList::new(vec![
            RecordingHandler::boxed("h1", false, &log),
            RecordingHandler::boxed("h2", true, &log),
            RecordingHandler::boxed("h3", false, &log),
        ]);
        let job = Job::new("release").unwrap();
        let event = TagPushEvent::new("v1.0.0", "abc123");

        let _ = list
            .dispatch(&job, &event, false, &AllBranchesFilter, &AcceptAllLabels)
            .await;

        assert_eq!(order(&log), vec!["h1", "h2", "h3"]);
    }

    #[tokio::test]
    async fn failing_handler_does_not_stop_siblings() {
        let log = new_log();
        let list = TagPushTriggerHandlerList::new(vec![
            RecordingHandler::boxed("h1", false, &log),
            RecordingHandler::boxed("h2", true, &log),
            RecordingHandler::boxed("h3", false, &log),
        ]);
        let job = Job::new("release").unwrap();
        let event = TagPushEvent::new("v1.0.0", "abc123");

        let err = list
            .dispatch(&job, &event, false, &AllBranchesFilter, &AcceptAllLabels)
            .await
            .unwrap_err();

        assert_eq!(order(&log), vec!["h1", "h2", "h3"]);
        assert_eq!(err.attempted, 3);
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].index, 1);
        assert_eq!(err.failures[0].handler, "h2");
    }

    #[tokio::test]
    async fn panicking_handler_does_not_stop_siblings() {
        let log = new_log();
        let list = TagPushTriggerHandlerList::new(vec![
            RecordingHandler::boxed("h1", false, &log),
            Box::new(PanickingHandler),
            RecordingHandler::boxed("h3", false, &log),
        ]);
        let job = Job::new("release").unwrap();
        let event = TagPushEvent::new("v1.0.0", "abc123");

        let err = list
            .dispatch(&job, &event, false, &AllBranchesFilter, &AcceptAllLabels)
            .await
            .unwrap_err();

        assert_eq!(order(&log), vec!["h1", "h3"]);
        assert_eq!(err.attempted, 3);
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].index, 1);
        assert_eq!(err.failures[0].handler, "PanickingHandler");
        match &err.failures[0].error {
            TriggerError::HandlerPanicked(message) => {
                assert_eq!(message, "handler for release blew up")
            }
            other => panic!("expected a panic failure, got {other}"),
        }
    }

    #[tokio::test]
    async fn all_failures_are_collected_in_order() {
        let log = new_log();
        let list = TagPushTriggerHandlerList::new(vec![
            RecordingHandler::boxed("h1", true, &log),
            RecordingHandler::boxed("h2", false, &log),
            RecordingHandler::boxed("h3", true, &log),
        ]);
        let job = Job::new("release").unwrap();
        let event = TagPushEvent::new("v1.0.0", "abc123");

        let err = list
            .dispatch(&job, &event, false, &AllBranchesFilter, &AcceptAllLabels)
            .await
            .unwrap_err();

        let failed: Vec<_> = err.failures.iter().map(|f| (f.index, f.handler)).collect();
        assert_eq!(failed, vec![(0, "h1"), (2, "h3")]);
        assert_eq!(log.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn empty_list_is_a_no_op() {
        let list = TagPushTriggerHandlerList::empty();
        let job = Job::new("release").unwrap();
        let event = TagPushEvent::new("v1.0.0", "abc123");

        assert!(list.is_empty());
        assert!(
            list.dispatch(&job, &event, false, &AllBranchesFilter, &AcceptAllLabels)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn repeated_dispatch_invokes_handlers_again() {
        let log = new_log();
        let list = TagPushTriggerHandlerList::new(vec![
            RecordingHandler::boxed("h1", false, &log),
            RecordingHandler::boxed("h2", false, &log),
        ]);
        let job = Job::new("release").unwrap();
        let event = TagPushEvent::new("v1.0.0", "abc123");

        for _ in 0..2 {
            list.dispatch(&job, &event, false, &AllBranchesFilter, &AcceptAllLabels)
                .await
                .unwrap();
        }

        assert_eq!(order(&log), vec!["h1", "h2", "h1", "h2"]);
    }

    #[tokio::test]
    async fn nested_lists_behave_as_one_handler() {
        let log = new_log();
        let inner = TagPushTriggerHandlerList::new(vec![
            RecordingHandler::boxed("inner1", true, &log),
            RecordingHandler::boxed("inner2", false, &log),
        ]);
        let outer = TagPushTriggerHandlerList::new(vec![
            RecordingHandler::boxed("first", false, &log),
            Box::new(inner),
            RecordingHandler::boxed("last", false, &log),
        ]);
        let job = Job::new("release").unwrap();
        let event = TagPushEvent::new("v1.0.0", "abc123");

        let err = outer
            .dispatch(&job, &event, false, &AllBranchesFilter, &AcceptAllLabels)
            .await
            .unwrap_err();

        assert_eq!(order(&log), vec!["first", "inner1", "inner2", "last"]);
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].handler, "TagPushTriggerHandlerList");
        assert!(matches!(err.failures[0].error, TriggerError::Dispatch(_)));
    }
}
