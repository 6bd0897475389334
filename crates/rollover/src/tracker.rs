//! The [`IssueTracker`] port.
//!
//! The reconciler depends only on this trait. The `github` crate supplies the
//! production implementation; tests supply an in-memory one.

use async_trait::async_trait;

use crate::{
    IssueLimit, IssueNumber, LabelName, LabelSpec, MilestoneIssues, MilestoneNumber,
    RepositoryRef, TrackerError,
};

/// Read and write access to the issues, labels, and milestones of a repository.
///
/// Implementations must deserialize every response into the typed values below
/// and report any mismatch as [`TrackerError::Schema`].
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Looks up a milestone by number and returns its title.
    ///
    /// A missing milestone is `Ok(None)`, not an error.
    async fn milestone_title(
        &self,
        repo: &RepositoryRef,
        milestone: MilestoneNumber,
    ) -> Result<Option<String>, TrackerError>;

    /// Fetches a milestone's title and up to `limit` of its open issues, each
    /// with up to 20 labels.
    ///
    /// A missing milestone is `Ok(None)`.
    async fn milestone_issues(
        &self,
        repo: &RepositoryRef,
        milestone: MilestoneNumber,
        limit: IssueLimit,
    ) -> Result<Option<MilestoneIssues>, TrackerError>;

    /// Creates a label on the repository.
    ///
    /// Returns [`TrackerError::AlreadyExists`] if a label with that name exists.
    async fn create_label(&self, repo: &RepositoryRef, label: &LabelSpec)
        -> Result<(), TrackerError>;

    /// Adds labels to an issue, keeping the labels it already has.
    async fn add_labels(
        &self,
        repo: &RepositoryRef,
        issue: IssueNumber,
        labels: &[LabelName],
    ) -> Result<(), TrackerError>;

    /// Sets an issue's milestone, or clears it when `milestone` is `None`.
    async fn set_milestone(
        &self,
        repo: &RepositoryRef,
        issue: IssueNumber,
        milestone: Option<MilestoneNumber>,
    ) -> Result<(), TrackerError>;
}
