//! Shared value types for the milestone rollover domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! meaningful values with invariants (e.g. label colours are six hex digits,
//! the fetch cap is within the tracker's page size) and participate in the
//! reconciliation decisions.

use serde::{Deserialize, Serialize};

use crate::{IssueNumber, LabelName, MilestoneNumber, RolloverError};

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;

/// Prefix shared by every missed-label, whatever milestone it refers to.
pub const MISSED_LABEL_PREFIX: &str = "missed: v";

/// Colour applied to every missed-label the reconciler creates.
pub const MISSED_LABEL_COLOR: &str = "497E76";

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

/// A label colour: six hexadecimal digits without a leading `#`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelColor(String);

impl LabelColor {
    /// Creates a [`LabelColor`], returning `None` unless `value` is exactly six
    /// hex digits.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let v = value.into();
        if v.len() == 6 && v.chars().all(|c| c.is_ascii_hexdigit()) {
            Some(Self(v))
        } else {
            None
        }
    }

    /// The colour used for missed-labels.
    pub fn missed() -> Self {
        Self(MISSED_LABEL_COLOR.to_string())
    }

    /// Returns the colour as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LabelColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------

/// A label to be created on a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSpec {
    /// Label name; the tracker deduplicates on it.
    pub name: LabelName,
    /// Display colour.
    pub color: LabelColor,
}

impl LabelSpec {
    /// Builds the missed-label for a milestone with the given title.
    pub fn missed(milestone_title: &str) -> Self {
        Self {
            name: missed_label_name(milestone_title),
            color: LabelColor::missed(),
        }
    }
}

/// Returns the missed-label name for a milestone title: `"missed: v" + title`.
pub fn missed_label_name(milestone_title: &str) -> LabelName {
    // The prefix alone is non-empty, so construction cannot fail.
    LabelName::new(format!("{MISSED_LABEL_PREFIX}{milestone_title}"))
        .unwrap_or_else(|| unreachable!("missed-label prefix is non-empty"))
}

/// A label attached to an issue. Only the name is read from the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label {
    /// Label name as stored by the tracker.
    pub name: String,
}

impl Label {
    /// Returns `true` if this is a missed-label for any milestone.
    ///
    /// Matches on substring, not on the exact current title, so labels left
    /// behind by earlier milestones count as well.
    pub fn is_missed_label(&self) -> bool {
        self.name.contains(MISSED_LABEL_PREFIX)
    }
}

// ---------------------------------------------------------------------------
// Issues and milestones
// ---------------------------------------------------------------------------

/// An open issue fetched from the current milestone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Issue number.
    pub number: IssueNumber,
    /// The issue's labels (at most 20 are fetched).
    pub labels: Vec<Label>,
}

impl Issue {
    /// Returns `true` if any of the issue's labels is a missed-label.
    pub fn is_already_missed(&self) -> bool {
        self.labels.iter().any(Label::is_missed_label)
    }
}

/// The title of a milestone together with the open issues fetched from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneIssues {
    /// Human-readable milestone title (e.g. `"2.0"`).
    pub title: String,
    /// Open issues, capped by the requested [`IssueLimit`].
    pub issues: Vec<Issue>,
}

// ---------------------------------------------------------------------------
// Fetch cap
// ---------------------------------------------------------------------------

/// Upper bound on the number of open issues fetched in one run.
///
/// Must be in `1..=100`; the tracker's connection API rejects larger pages and
/// no further pagination is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IssueLimit(u32);

impl IssueLimit {
    /// Largest page the tracker returns for a single connection query.
    pub const MAX: u32 = 100;

    /// Creates an [`IssueLimit`], rejecting zero and values above [`IssueLimit::MAX`].
    pub fn new(value: u32) -> Result<Self, RolloverError> {
        if (1..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(RolloverError::Configuration {
                message: format!("issues-count must be between 1 and {}, got {value}", Self::MAX),
            })
        }
    }

    /// Returns the cap as a `u32`.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for IssueLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Run outcome
// ---------------------------------------------------------------------------

/// What happened to the missed-label during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelCreation {
    /// The label did not exist and was created.
    Created,
    /// The tracker reported the label already existed.
    AlreadyExisted,
    /// No issues to process; creation was not attempted.
    Skipped,
}

/// Summary of a completed reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// The milestone that was reconciled.
    pub milestone: MilestoneNumber,
    /// Its title.
    pub title: String,
    /// The milestone issues were moved to, or `None` if it does not exist and
    /// the issues' milestone was cleared.
    pub successor: Option<MilestoneNumber>,
    /// Outcome of the missed-label creation step.
    pub label_creation: LabelCreation,
    /// Number of open issues fetched.
    pub issues_seen: usize,
    /// Number of issues that received the missed-label.
    pub issues_labelled: usize,
    /// Number of issues whose milestone field was set or cleared.
    pub issues_moved: usize,
}
