//! Webhook handler for tag push events

use axum::{
    Json,
    body::Bytes,
    extract::State as AxumState,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::SharedState;
use crate::error::{DispatchError, TriggerError};
use crate::event::TagPushEvent;

const GITLAB_EVENT_HEADER: &str = "X-Gitlab-Event";
const GITHUB_EVENT_HEADER: &str = "X-GitHub-Event";
const GITLAB_TAG_PUSH: &str = "Tag Push Hook";
const GITHUB_PUSH: &str = "push";

/// Outcome of one webhook delivery across every connected job
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub tag: String,
    pub dispatched: Vec<String>,
    pub failures: Vec<JobFailure>,
}

#[derive(Debug, Serialize)]
pub struct JobFailure {
    pub job: String,
    pub errors: Vec<String>,
}

impl JobFailure {
    fn rate_limited(job: &str) -> Self {
        Self {
            job: job.to_string(),
            errors: vec![TriggerError::RateLimited(job.to_string()).to_string()],
        }
    }

    fn from_dispatch(job: &str, err: &DispatchError) -> Self {
        Self {
            job: job.to_string(),
            errors: err
                .failures
                .iter()
                .map(|f| format!("{}: {}", f.handler, f.error))
                .collect(),
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Handles the tag push webhook POST request.
///
/// Every job connected to the pushed repository gets one dispatch. Failures
/// in one job never stop the others; they are reported together in the body.
pub async fn handle_webhook(
    AxumState(state): AxumState<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let gitlab_event = header(&headers, GITLAB_EVENT_HEADER);
    let github_event = header(&headers, GITHUB_EVENT_HEADER);
    let from_github = match (gitlab_event, github_event) {
        (Some(GITLAB_TAG_PUSH), _) => false,
        (_, Some(GITHUB_PUSH)) => true,
        (gitlab, github) => {
            info!(
                "Not a tag push event; received {:?}",
                gitlab.or(github)
            );
            return StatusCode::NO_CONTENT.into_response();
        }
    };

    let event = match TagPushEvent::from_slice(&body) {
        Ok(event) => event,
        // GitHub sends branch pushes under the same event name
        Err(TriggerError::InvalidEvent(reason)) if from_github => {
            debug!("Ignoring push: {}", reason);
            return StatusCode::NO_CONTENT.into_response();
        }
        Err(e) => {
            info!("Could not parse tag push payload: {}", e);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let registry = state.registry();
    let jobs = registry.jobs_for_event(&event);
    if jobs.is_empty() {
        warn!(
            "No job connected to {:?} for tag {}, skipping.",
            event.project_path(),
            event.tag_name()
        );
        return StatusCode::NO_CONTENT.into_response();
    }

    let mut response = WebhookResponse {
        tag: event.tag_name().to_string(),
        dispatched: Vec::new(),
        failures: Vec::new(),
    };
    let mut rate_limited = 0;

    for configured in jobs {
        let job_name = configured.job.name();
        let limited = {
            let mut limiter = state.rate_limiter.lock().await;
            limiter.check_rate_limit(
                job_name,
                configured.config.get_rate_limit(),
                configured.config.get_rate_limit_window(),
            )
        };
        if limited {
            warn!(
                "Too many deliveries for job '{}' - {} per {} seconds",
                job_name,
                configured.config.get_rate_limit(),
                configured.config.get_rate_limit_window()
            );
            rate_limited += 1;
            response.failures.push(JobFailure::rate_limited(job_name));
            continue;
        }

        match configured.dispatch(&event).await {
            Ok(()) => response.dispatched.push(job_name.to_string()),
            Err(e) => {
                error!(
                    "Tag {} for job '{}' dispatched with failures: {}",
                    event.tag_name(),
                    job_name,
                    e
                );
                response.failures.push(JobFailure::from_dispatch(job_name, &e));
                response.dispatched.push(job_name.to_string());
            }
        }
    }

    let status = if response.failures.is_empty() {
        StatusCode::OK
    } else if response.dispatched.is_empty() && rate_limited == response.failures.len() {
        StatusCode::TOO_MANY_REQUESTS
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(response)).into_response()
}
