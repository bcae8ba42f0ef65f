use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use crate::error::{Result, TriggerError};
use crate::filter::{BranchFilterConfig, LabelFilterConfig};
use crate::handler::TagPushTriggerOptions;

const DEFAULT_RATE_LIMIT: usize = 60;
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TriggerConfig {
    #[serde(default)]
    pub project: Vec<ProjectConfig>,
}

/// One job connected to an upstream repository
#[derive(Debug, Deserialize, Clone)]
pub struct ProjectConfig {
    pub name: String,
    /// `group/app` path (or bare repository name) the tag pushes come from
    pub repository: String,
    pub trigger_on_tag_push: Option<bool>,
    pub ci_skip: Option<bool>,
    pub set_pending_status: Option<bool>,
    pub rate_limit: Option<usize>,
    pub rate_limit_window: Option<u64>,
    #[serde(default)]
    pub branch_filter: BranchFilterConfig,
    #[serde(default)]
    pub label_filter: LabelFilterConfig,
}

impl ProjectConfig {
    pub fn trigger_options(&self) -> TagPushTriggerOptions {
        TagPushTriggerOptions {
            trigger_on_tag_push: self.trigger_on_tag_push.unwrap_or(true),
            set_pending_status: self.set_pending_status.unwrap_or(false),
        }
    }

    /// Returns true if `[ci-skip]` markers should veto builds for this job.
    pub fn ci_skip_enabled(&self) -> bool {
        self.ci_skip.unwrap_or(true)
    }

    pub fn get_rate_limit(&self) -> usize {
        self.rate_limit.unwrap_or(DEFAULT_RATE_LIMIT)
    }

    pub fn get_rate_limit_window(&self) -> u64 {
        self.rate_limit_window
            .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SECS)
    }

    /// Does a push from `project_path` concern this job? Matches the full path or its last segment.
    pub fn matches_repository(&self, project_path: &str) -> bool {
        self.repository == project_path
            || (!self.repository.contains('/')
                && project_path.rsplit('/').next() == Some(self.repository.as_str()))
    }
}

impl TriggerConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: TriggerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for project in &self.project {
            if project.name.trim().is_empty() {
                return Err(TriggerError::ConfigError(
                    "project name must not be empty".to_string(),
                ));
            }
            if project.repository.trim().is_empty() {
                return Err(TriggerError::ConfigError(format!(
                    "project '{}' has no repository",
                    project.name
                )));
            }
            if !names.insert(project.name.as_str()) {
                return Err(TriggerError::ConfigError(format!(
                    "duplicate project name '{}'",
                    project.name
                )));
            }
        }
        Ok(())
    }
}

/// Load and parse the configuration file
pub fn load_config(path: impl AsRef<Path>) -> Result<TriggerConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        TriggerError::ConfigError(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;
    TriggerConfig::from_toml(&content)
}

/// Re-read the configuration file without blocking the runtime
pub async fn reload_config(path: impl AsRef<Path>) -> Result<TriggerConfig> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        TriggerError::ConfigError(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;
    TriggerConfig::from_toml(&content)
}
