//! Tag push event structures

use serde::Deserialize;

use crate::error::{Result, TriggerError};

pub const TAG_REF_PREFIX: &str = "refs/tags/";

/// Object id used by the upstream when a ref is removed
pub const NO_COMMIT: &str = "0000000000000000000000000000000000000000";

/// A tag push notification, as delivered by a GitLab "Tag Push Hook" or a
/// GitHub `push` on a `refs/tags/` ref.
///
/// The event is read-only once parsed; handlers only borrow it.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TagPushEvent {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub before: Option<String>,
    pub after: Option<String>,
    pub checkout_sha: Option<String>,
    pub user_name: Option<String>,
    pub pusher: Option<EventUser>,
    pub project: Option<EventProject>,
    pub repository: Option<EventProject>,
    #[serde(default)]
    pub commits: Vec<EventCommit>,
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EventProject {
    pub name: Option<String>,
    #[serde(alias = "full_name")]
    pub path_with_namespace: Option<String>,
    #[serde(alias = "html_url")]
    pub web_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EventCommit {
    pub id: String,
    pub message: Option<String>,
    pub author: Option<EventUser>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EventUser {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl TagPushEvent {
    /// Parse and validate a webhook body. Anything that is not a tag ref is rejected.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let event: TagPushEvent = serde_json::from_slice(body)?;
        if !event.ref_name.starts_with(TAG_REF_PREFIX) || event.tag_name().is_empty() {
            return Err(TriggerError::InvalidEvent(format!(
                "'{}' is not a tag reference",
                event.ref_name
            )));
        }
        Ok(event)
    }

    /// Minimal tag push event for `tag_name` pointing at `commit_sha`.
    pub fn new(tag_name: &str, commit_sha: &str) -> Self {
        Self {
            ref_name: format!("{}{}", TAG_REF_PREFIX, tag_name),
            before: Some(NO_COMMIT.to_string()),
            after: Some(commit_sha.to_string()),
            checkout_sha: Some(commit_sha.to_string()),
            user_name: None,
            pusher: None,
            project: None,
            repository: None,
            commits: Vec::new(),
            labels: Vec::new(),
        }
    }

    /// The tag name with `refs/tags/` stripped
    pub fn tag_name(&self) -> &str {
        self.ref_name
            .strip_prefix(TAG_REF_PREFIX)
            .unwrap_or(&self.ref_name)
    }

    /// Revision to build: `checkout_sha` when it names a commit, otherwise `after`.
    pub fn commit_sha(&self) -> Option<&str> {
        let usable = |sha: &&str| !sha.is_empty() && *sha != NO_COMMIT;
        self.checkout_sha
            .as_deref()
            .filter(usable)
            .or_else(|| self.after.as_deref().filter(usable))
    }

    /// True when the push removed the tag
    pub fn is_deletion(&self) -> bool {
        match self.after.as_deref() {
            Some(after) => after.contains(NO_COMMIT),
            None => true,
        }
    }

    pub fn last_commit_message(&self) -> Option<&str> {
        self.commits.last().and_then(|c| c.message.as_deref())
    }

    pub fn user(&self) -> Option<&str> {
        self.user_name
            .as_deref()
            .or_else(|| self.pusher.as_ref().and_then(|p| p.name.as_deref()))
    }

    /// Project path used to resolve connected jobs (`group/app` or the bare repository name).
    pub fn project_path(&self) -> Option<&str> {
        [self.project.as_ref(), self.repository.as_ref()]
            .into_iter()
            .flatten()
            .find_map(|p| p.path_with_namespace.as_deref().or(p.name.as_deref()))
    }

    pub fn with_labels(mut self, labels: &[&str]) -> Self {
        self.labels = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn with_commit_message(mut self, message: &str) -> Self {
        let id = self.commit_sha().unwrap_or(NO_COMMIT).to_string();
        self.commits.push(EventCommit {
            id,
            message: Some(message.to_string()),
            author: None,
        });
        self
    }

    pub fn with_project(mut self, path_with_namespace: &str) -> Self {
        let name = path_with_namespace
            .rsplit('/')
            .next()
            .unwrap_or(path_with_namespace);
        self.project = Some(EventProject {
            name: Some(name.to_string()),
            path_with_namespace: Some(path_with_namespace.to_string()),
            web_url: None,
        });
        self
    }
}
