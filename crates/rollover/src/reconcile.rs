//! End-of-milestone reconciliation.
//!
//! [`Reconciler::reconcile`] tags every open issue of a milestone with a
//! `"missed: v<title>"` label and moves it to the next milestone, or clears its
//! milestone when there is no next one. All calls are made one at a time and
//! the first failure aborts the run.

use tracing::{debug, info, instrument};

use crate::{
    IssueLimit, IssueTracker, LabelCreation, LabelSpec, MilestoneIssues, MilestoneNumber,
    ReconcileReport, RepositoryRef, RolloverError, TrackerError,
};

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;

/// Applies milestone rollover to a repository through an [`IssueTracker`].
#[derive(Debug)]
pub struct Reconciler<T> {
    tracker: T,
}

impl<T: IssueTracker> Reconciler<T> {
    /// Creates a reconciler backed by `tracker`.
    pub fn new(tracker: T) -> Self {
        Self { tracker }
    }

    /// Returns the underlying tracker.
    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    /// Reconciles `milestone` on `repo`, fetching at most `limit` open issues.
    ///
    /// Reads happen before writes, so [`RolloverError::MilestoneNotFound`]
    /// leaves the tracker untouched. A [`RolloverError::RemoteFailure`] during
    /// the issue loop leaves earlier issues already updated.
    ///
    /// Running this twice against unchanged tracker state gives the same final
    /// labels and milestones as running it once.
    #[instrument(skip(self, repo), fields(repository = %repo, milestone = %milestone))]
    pub async fn reconcile(
        &self,
        repo: &RepositoryRef,
        milestone: MilestoneNumber,
        limit: IssueLimit,
    ) -> Result<ReconcileReport, RolloverError> {
        let successor = self.find_successor(repo, milestone).await?;

        let MilestoneIssues { title, issues } = self
            .tracker
            .milestone_issues(repo, milestone, limit)
            .await
            .map_err(|e| RolloverError::remote(format!("fetch issues of milestone {milestone}"), e))?
            .ok_or_else(|| RolloverError::MilestoneNotFound {
                repository: repo.clone(),
                milestone,
            })?;

        debug!(title = %title, issues = issues.len(), "Fetched milestone");

        let label = LabelSpec::missed(&title);

        let label_creation = if issues.is_empty() {
            info!("Milestone has no open issues; nothing to do");
            LabelCreation::Skipped
        } else {
            self.ensure_label(repo, &label).await?
        };

        let mut issues_labelled = 0;
        let mut issues_moved = 0;

        for issue in &issues {
            if issue.is_already_missed() {
                debug!(issue = %issue.number, "Issue already carries a missed-label");
            } else {
                self.tracker
                    .add_labels(repo, issue.number, std::slice::from_ref(&label.name))
                    .await
                    .map_err(|e| {
                        RolloverError::remote(format!("add label to issue #{}", issue.number), e)
                    })?;
                issues_labelled += 1;
                debug!(issue = %issue.number, label = %label.name, "Labelled issue");
            }

            self.tracker
                .set_milestone(repo, issue.number, successor)
                .await
                .map_err(|e| {
                    RolloverError::remote(format!("update milestone of issue #{}", issue.number), e)
                })?;
            issues_moved += 1;
            debug!(
                issue = %issue.number,
                successor = ?successor.map(MilestoneNumber::as_u64),
                "Updated issue milestone"
            );
        }

        let report = ReconcileReport {
            milestone,
            title,
            successor,
            label_creation,
            issues_seen: issues.len(),
            issues_labelled,
            issues_moved,
        };

        info!(
            title = %report.title,
            successor = ?report.successor.map(MilestoneNumber::as_u64),
            label_creation = ?report.label_creation,
            issues_seen = report.issues_seen,
            issues_labelled = report.issues_labelled,
            issues_moved = report.issues_moved,
            "Milestone reconciled"
        );

        Ok(report)
    }

    /// Returns `milestone + 1` if that milestone exists.
    async fn find_successor(
        &self,
        repo: &RepositoryRef,
        milestone: MilestoneNumber,
    ) -> Result<Option<MilestoneNumber>, RolloverError> {
        let candidate = milestone.successor();
        let title = self
            .tracker
            .milestone_title(repo, candidate)
            .await
            .map_err(|e| RolloverError::remote(format!("look up milestone {candidate}"), e))?;

        match title {
            Some(title) => {
                debug!(successor = %candidate, title = %title, "Next milestone exists");
                Ok(Some(candidate))
            }
            None => {
                debug!(successor = %candidate, "Next milestone does not exist");
                Ok(None)
            }
        }
    }

    /// Creates the missed-label, treating an existing label as success.
    async fn ensure_label(
        &self,
        repo: &RepositoryRef,
        label: &LabelSpec,
    ) -> Result<LabelCreation, RolloverError> {
        match self.tracker.create_label(repo, label).await {
            Ok(()) => {
                info!(label = %label.name, "Created missed-label");
                Ok(LabelCreation::Created)
            }
            Err(TrackerError::AlreadyExists { .. }) => {
                debug!(label = %label.name, "Missed-label already exists");
                Ok(LabelCreation::AlreadyExisted)
            }
            Err(e) => Err(RolloverError::remote(
                format!("create label '{}'", label.name),
                e,
            )),
        }
    }
}
