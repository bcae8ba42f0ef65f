use std::sync::Arc;

use regex::Regex;
use serde::Deserialize;

use super::BranchFilter;
use crate::error::{Result, TriggerError};

/// Branch filter settings for one job, as written in the config file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BranchFilterConfig {
    #[default]
    All,
    /// Comma-separated name specs; `*` stays within a path segment, `**` crosses them
    NameBased {
        #[serde(default)]
        include: String,
        #[serde(default)]
        exclude: String,
    },
    RegexBased {
        #[serde(default)]
        pattern: String,
    },
}

impl BranchFilterConfig {
    pub fn build(&self) -> Result<Arc<dyn BranchFilter>> {
        Ok(match self {
            BranchFilterConfig::All => Arc::new(AllBranchesFilter),
            BranchFilterConfig::NameBased { include, exclude } => {
                Arc::new(NameBasedFilter::new(include, exclude)?)
            }
            BranchFilterConfig::RegexBased { pattern } => Arc::new(RegexBasedFilter::new(pattern)?),
        })
    }
}

pub struct AllBranchesFilter;

impl BranchFilter for AllBranchesFilter {
    fn is_branch_allowed(&self, _source_branch: &str, _target_branch: &str) -> bool {
        true
    }
}

#[derive(Debug)]
pub struct NameBasedFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl NameBasedFilter {
    pub fn new(include: &str, exclude: &str) -> Result<Self> {
        Ok(Self {
            include: parse_name_specs(include)?,
            exclude: parse_name_specs(exclude)?,
        })
    }

    fn has_no_branch_specs(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    fn is_included(&self, branch: &str) -> bool {
        self.include.is_empty() || self.include.iter().any(|spec| spec.is_match(branch))
    }

    fn is_not_excluded(&self, branch: &str) -> bool {
        !self.exclude.iter().any(|spec| spec.is_match(branch))
    }

    fn allows(&self, branch: &str) -> bool {
        self.is_not_excluded(branch) && self.is_included(branch)
    }
}

impl BranchFilter for NameBasedFilter {
    fn is_branch_allowed(&self, source_branch: &str, target_branch: &str) -> bool {
        self.has_no_branch_specs() || self.allows(source_branch) || self.allows(target_branch)
    }
}

fn parse_name_specs(specs: &str) -> Result<Vec<Regex>> {
    specs
        .split(',')
        .map(str::trim)
        .filter(|spec| !spec.is_empty())
        .map(name_spec_to_regex)
        .collect()
}

/// Translate an ant-style name spec (`release/*`, `v1.**`) into an anchored regex.
fn name_spec_to_regex(spec: &str) -> Result<Regex> {
    let mut pattern = String::from("^");
    let mut chars = spec.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                pattern.push_str(".*");
            }
            '*' => pattern.push_str("[^/]*"),
            '?' => pattern.push_str("[^/]"),
            other => pattern.push_str(&regex::escape(&other.to_string())),
        }
    }
    pattern.push('$');
    Regex::new(&pattern).map_err(|source| TriggerError::InvalidPattern {
        pattern: spec.to_string(),
        source,
    })
}

#[derive(Debug)]
pub struct RegexBasedFilter {
    regex: Option<Regex>,
}

impl RegexBasedFilter {
    /// An empty pattern accepts every ref. Matching is against the whole name.
    pub fn new(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            return Ok(Self { regex: None });
        }
        let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|source| {
            TriggerError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            }
        })?;
        Ok(Self { regex: Some(regex) })
    }
}

impl BranchFilter for RegexBasedFilter {
    fn is_branch_allowed(&self, source_branch: &str, target_branch: &str) -> bool {
        match &self.regex {
            None => true,
            Some(regex) => regex.is_match(source_branch) || regex.is_match(target_branch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_branches_accepts_everything() {
        let filter = BranchFilterConfig::All.build().unwrap();
        assert!(filter.is_branch_allowed("v1.0.0", "v1.0.0"));
        assert!(filter.is_branch_allowed("", ""));
    }

    #[test]
    fn name_based_without_specs_accepts_everything() {
        let filter = NameBasedFilter::new("", " , ").unwrap();
        assert!(filter.is_branch_allowed("anything", "anything"));
    }

    #[test]
    fn name_based_include_and_exclude() {
        let filter = NameBasedFilter::new("v1.*, release/**", "v1.0-rc*").unwrap();
        assert!(filter.is_branch_allowed("v1.2", "v1.2"));
        assert!(filter.is_branch_allowed("release/2024/q1", "release/2024/q1"));
        assert!(!filter.is_branch_allowed("v1.0-rc1", "v1.0-rc1"));
        assert!(!filter.is_branch_allowed("v2.0", "v2.0"));
    }

    #[test]
    fn name_based_single_star_stays_in_segment() {
        let filter = NameBasedFilter::new("release/*", "").unwrap();
        assert!(filter.is_branch_allowed("release/1.0", "release/1.0"));
        assert!(!filter.is_branch_allowed("release/1.0/hotfix", "release/1.0/hotfix"));
    }

    #[test]
    fn name_based_escapes_regex_metacharacters() {
        let filter = NameBasedFilter::new("v1.0.0", "").unwrap();
        assert!(filter.is_branch_allowed("v1.0.0", "v1.0.0"));
        assert!(!filter.is_branch_allowed("v1x0x0", "v1x0x0"));
    }

    #[test]
    fn name_based_matches_source_or_target() {
        let filter = NameBasedFilter::new("main", "").unwrap();
        assert!(filter.is_branch_allowed("feature", "main"));
        assert!(!filter.is_branch_allowed("feature", "develop"));
    }

    #[test]
    fn regex_based_is_full_match() {
        let filter = RegexBasedFilter::new(r"v\d+\.\d+\.\d+").unwrap();
        assert!(filter.is_branch_allowed("v1.0.0", "v1.0.0"));
        assert!(!filter.is_branch_allowed("v1.0.0-beta", "v1.0.0-beta"));
    }

    #[test]
    fn regex_based_empty_pattern_accepts_everything() {
        let filter = RegexBasedFilter::new("").unwrap();
        assert!(filter.is_branch_allowed("whatever", "whatever"));
    }

    #[test]
    fn invalid_regex_is_a_configuration_error() {
        let config = BranchFilterConfig::RegexBased {
            pattern: "v(1".to_string(),
        };
        match config.build() {
            Err(TriggerError::InvalidPattern { pattern, .. }) => assert_eq!(pattern, "v(1"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("invalid pattern was accepted"),
        }
    }

    #[test]
    fn config_deserializes_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            branch_filter: BranchFilterConfig,
        }

        let wrapper: Wrapper = toml::from_str(
            r#"branch_filter = { type = "name_based", include = "v*", exclude = "v0*" }"#,
        )
        .unwrap();
        assert_eq!(
            wrapper.branch_filter,
            BranchFilterConfig::NameBased {
                include: "v*".to_string(),
                exclude: "v0*".to_string(),
            }
        );
    }
}
