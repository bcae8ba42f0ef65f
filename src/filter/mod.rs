//! Branch and label predicates applied by trigger handlers
//!
//! Filters are configured once and then treated as pure functions: a dispatch
//! hands the same instances to every handler and no handler may change them.

pub mod branch;
pub mod label;

pub use branch::{AllBranchesFilter, BranchFilterConfig, NameBasedFilter, RegexBasedFilter};
pub use label::{AcceptAllLabels, LabelFilterConfig, LabelsFilter};

/// Decides whether a ref satisfies the configured branch policy.
pub trait BranchFilter: Send + Sync {
    /// `true` means "not filtered out".
    fn is_branch_allowed(&self, source_branch: &str, target_branch: &str) -> bool;
}

/// Decides whether an event's labels satisfy the configured label policy.
pub trait LabelFilter: Send + Sync {
    /// `true` means "not filtered out".
    fn is_labels_allowed(&self, labels: &[String]) -> bool;
}
