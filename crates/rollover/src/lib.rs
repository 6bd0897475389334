//! Milestone rollover domain.
//!
//! At the end of a milestone, every issue still open in it is tagged with a
//! `"missed: v<title>"` label and moved to the next milestone (or has its
//! milestone cleared when there is no next one). This crate holds the decision
//! logic; the tracker itself is reached through the [`IssueTracker`] port.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`MilestoneNumber`, `RepositoryRef`, etc.) |
//! | [`types`] | Value types (`Issue`, `LabelSpec`, `IssueLimit`, `ReconcileReport`, etc.) |
//! | [`errors`] | `TrackerError` and run-level `RolloverError` |
//! | [`tracker`] | The `IssueTracker` port trait |
//! | [`reconcile`] | The `Reconciler` |

pub mod errors;
pub mod identifiers;
pub mod reconcile;
pub mod tracker;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::{RolloverError, TrackerError};
pub use identifiers::{
    IssueNumber, LabelName, MilestoneNumber, RepositoryName, RepositoryOwner, RepositoryRef, RunId,
};
pub use reconcile::Reconciler;
pub use tracker::IssueTracker;
pub use types::{
    missed_label_name, Issue, IssueLimit, Label, LabelColor, LabelCreation, LabelSpec,
    MilestoneIssues, ReconcileReport, MISSED_LABEL_COLOR, MISSED_LABEL_PREFIX,
};
