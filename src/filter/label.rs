use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;

use super::LabelFilter;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct LabelFilterConfig {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl LabelFilterConfig {
    pub fn build(&self) -> Arc<dyn LabelFilter> {
        if self.include.is_empty() && self.exclude.is_empty() {
            Arc::new(AcceptAllLabels)
        } else {
            Arc::new(LabelsFilter::new(&self.include, &self.exclude))
        }
    }
}

pub struct AcceptAllLabels;

impl LabelFilter for AcceptAllLabels {
    fn is_labels_allowed(&self, _labels: &[String]) -> bool {
        true
    }
}

/// Accepts events that carry no excluded label and, when includes are set, at least one included label.
#[derive(Debug)]
pub struct LabelsFilter {
    include: HashSet<String>,
    exclude: HashSet<String>,
}

impl LabelsFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Self {
        let normalize = |labels: &[String]| -> HashSet<String> {
            labels
                .iter()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect()
        };
        Self {
            include: normalize(include),
            exclude: normalize(exclude),
        }
    }
}

impl LabelFilter for LabelsFilter {
    fn is_labels_allowed(&self, labels: &[String]) -> bool {
        let contains_excluded = labels.iter().any(|l| self.exclude.contains(l));
        let contains_included = labels.iter().any(|l| self.include.contains(l));
        !contains_excluded && (self.include.is_empty() || contains_included)
    }
}
