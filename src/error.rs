
/// Error type for simple_git_trigger operations
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid branch pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Invalid gating context: {0}")]
    InvalidContext(String),

    #[error("No revision to build for {0}")]
    NoRevision(String),

    #[error("Failed to enqueue build for job '{job}': {message}")]
    EnqueueFailed { job: String, message: String },

    #[error("Rate limit exceeded for job '{0}'")]
    RateLimited(String),

    #[error("Handler panicked: {0}")]
    HandlerPanicked(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Event parsing failed: {0}")]
    EventParseFailed(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParseError(#[from] toml::de::Error),
}

/// Helper type for Results that use TriggerError
pub type Result<T> = std::result::Result<T, TriggerError>;

/// One handler that failed during a dispatch.
#[derive(Debug)]
pub struct HandlerFailure {
    /// Position of the handler in its list (registration order)
    pub index: usize,
    pub handler: &'static str,
    pub error: TriggerError,
}

/// Every handler failure collected while fanning one event out to a handler list.
///
/// Failures are kept in registration order. A dispatch only produces this error
/// after every handler in the list has been attempted.
#[derive(Debug, thiserror::Error)]
#[error(
    "{} of {} trigger handlers failed{}",
    .failures.len(),
    .attempted,
    format_failures(.failures)
)]
pub struct DispatchError {
    pub attempted: usize,
    pub failures: Vec<HandlerFailure>,
}

fn format_failures(failures: &[HandlerFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("\n  [{}] {}: {}", f.index, f.handler, f.error))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_error_lists_every_failure() {
        let err = DispatchError {
            attempted: 3,
            failures: vec![
                HandlerFailure {
                    index: 0,
                    handler: "first",
                    error: TriggerError::NoRevision("refs/tags/v1".to_string()),
                },
                HandlerFailure {
                    index: 2,
                    handler: "third",
                    error: TriggerError::EnqueueFailed {
                        job: "release".to_string(),
                        message: "queue closed".to_string(),
                    },
                },
            ],
        };

        let text = err.to_string();
        assert!(text.starts_with("2 of 3 trigger handlers failed"));
        assert!(text.contains("[0] first: No revision to build for refs/tags/v1"));
        assert!(text.contains("[2] third: Failed to enqueue build for job 'release': queue closed"));
    }
}
