//! Merging edited tag records into original objects.
//!
//! The merge is a fixed sequence of pure transformations over the original
//! tags, each available on its own:
//!
//! 1. [`without_ignored`] removes edited columns carrying the ignore prefix;
//! 2. [`overlay`] applies the remaining edited values over the original;
//! 3. [`drop_blank`] removes keys whose value is blank, which is how a
//!    cleared spreadsheet cell deletes a tag.
//!
//! [`MergePolicy::reconcile`] then decides whether the object changed.

mod changefile;

pub use changefile::{write_changefile, ChangeStats, ChangefileWriter, GENERATOR, MODIFY_ACTION};

use crate::object::Tags;

/// Outcome of reconciling one object with its edited record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// No record, or the merge reproduced the original tags.
    Unchanged,
    /// The merged tags differ from the original.
    Modified(Tags),
}

/// Merge settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergePolicy {
    ignore_prefix: Option<String>,
}

impl MergePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignores edited columns whose key starts with `prefix`.
    ///
    /// An empty prefix ignores nothing.
    pub fn with_ignore_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.ignore_prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    pub fn ignore_prefix(&self) -> Option<&str> {
        self.ignore_prefix.as_deref()
    }

    /// Computes the merged tag set of `original` and an edited `record`.
    pub fn merge(&self, original: &Tags, record: &Tags) -> Tags {
        let edits = without_ignored(record, self.ignore_prefix());
        drop_blank(overlay(original, &edits))
    }

    /// Decides whether an object changes, given its edited record if any.
    ///
    /// A missing record and a record without tag columns both leave the
    /// object untouched.
    pub fn reconcile(&self, original: &Tags, record: Option<&Tags>) -> Reconciliation {
        let Some(record) = record.filter(|record| !record.is_empty()) else {
            return Reconciliation::Unchanged;
        };
        let merged = self.merge(original, record);
        if merged == *original {
            Reconciliation::Unchanged
        } else {
            Reconciliation::Modified(merged)
        }
    }
}

/// Returns `record` without the keys starting with `prefix`.
pub fn without_ignored(record: &Tags, prefix: Option<&str>) -> Tags {
    match prefix {
        Some(prefix) => record
            .iter()
            .filter(|(key, _)| !key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
        None => record.clone(),
    }
}

/// Returns `base` with every key of `edits` set to the edited value.
///
/// Keys already in `base` keep their position; new keys are appended in
/// the order of `edits`.
pub fn overlay(base: &Tags, edits: &Tags) -> Tags {
    let mut merged = base.clone();
    for (key, value) in edits {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Removes keys whose value is empty after trimming whitespace.
pub fn drop_blank(tags: Tags) -> Tags {
    tags.into_iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .collect()
}
