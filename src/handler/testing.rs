use async_trait::async_trait;
use std::sync::Mutex;

use crate::error::{Result, TriggerError};
use crate::job::{Build, BuildRequest, Job};
use crate::queue::BuildQueue;

/// Queue double that remembers every enqueue call
#[derive(Default)]
pub(crate) struct RecordingQueue {
    calls: Mutex<Vec<(String, BuildRequest)>>,
}

impl RecordingQueue {
    pub(crate) fn calls(&self) -> Vec<(String, BuildRequest)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BuildQueue for RecordingQueue {
    async fn enqueue(&self, job: &Job, request: BuildRequest) -> Result<Build> {
        self.calls
            .lock()
            .unwrap()
            .push((job.name().to_string(), request.clone()));
        Ok(Build::queued(job, request))
    }
}

/// Queue double whose enqueue always fails
pub(crate) struct FailingQueue;

#[async_trait]
impl BuildQueue for FailingQueue {
    async fn enqueue(&self, job: &Job, _request: BuildRequest) -> Result<Build> {
        Err(TriggerError::EnqueueFailed {
            job: job.name().to_string(),
            message: "build queue unavailable".to_string(),
        })
    }
}
