use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::error::{Result, TriggerError};

/// Handle to a configured, triggerable job.
///
/// The dispatch layer never looks inside; it only hands the job to handlers,
/// which hand it on to the build queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Job {
    name: String,
}

impl Job {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TriggerError::InvalidContext(
                "job name must not be empty".to_string(),
            ));
        }
        Ok(Self { name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Why a build was started
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildCause {
    TagPush {
        user_name: Option<String>,
        project: Option<String>,
    },
}

impl fmt::Display for BuildCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildCause::TagPush { user_name, project } => write!(
                f,
                "Started by tag push by {} in {}",
                user_name.as_deref().unwrap_or("unknown user"),
                project.as_deref().unwrap_or("unknown project")
            ),
        }
    }
}

/// What a handler asks the queue to build
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BuildRequest {
    pub ref_name: String,
    pub commit_sha: String,
    pub cause: BuildCause,
    pub parameters: BTreeMap<String, String>,
}

/// A build accepted by the queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Build {
    pub id: String,
    pub job_name: String,
    pub ref_name: String,
    pub commit_sha: String,
    pub cause: BuildCause,
    pub parameters: BTreeMap<String, String>,
    pub queued_at: DateTime<Utc>,
}

impl Build {
    /// Record a request the queue accepted
    pub fn queued(job: &Job, request: BuildRequest) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            job_name: job.name().to_string(),
            ref_name: request.ref_name,
            commit_sha: request.commit_sha,
            cause: request.cause,
            parameters: request.parameters,
            queued_at: Utc::now(),
        }
    }
}
