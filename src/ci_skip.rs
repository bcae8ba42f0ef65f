//! Commit message markers that veto a build

use crate::event::TagPushEvent;

const CI_SKIP_MARKERS: [&str; 2] = ["[ci-skip]", "[ci skip]"];

/// Returns true if the message carries a ci-skip marker (case-insensitive).
pub fn message_requests_skip(message: &str) -> bool {
    let message = message.to_lowercase();
    CI_SKIP_MARKERS.iter().any(|marker| message.contains(marker))
}

/// Returns true if the last commit of the push asks to skip CI.
pub fn is_ci_skip(event: &TagPushEvent) -> bool {
    event
        .last_commit_message()
        .map(message_requests_skip)
        .unwrap_or(false)
}
