use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::*;
use crate::{Issue, IssueNumber, Label, LabelName};

// ---------------------------------------------------------------------------
// In-memory tracker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    MilestoneTitle(u64),
    MilestoneIssues(u64, u32),
    CreateLabel(String, String),
    AddLabels(u64, Vec<String>),
    SetMilestone(u64, Option<u64>),
}

impl Call {
    fn is_write(&self) -> bool {
        matches!(
            self,
            Call::CreateLabel(..) | Call::AddLabels(..) | Call::SetMilestone(..)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailOn {
    MilestoneTitle,
    MilestoneIssues,
    CreateLabel,
    AddLabels(u64),
    SetMilestone(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FakeIssue {
    labels: Vec<String>,
    milestone: Option<u64>,
}

#[derive(Debug, Default)]
struct State {
    milestones: BTreeMap<u64, String>,
    issues: BTreeMap<u64, FakeIssue>,
    repo_labels: BTreeMap<String, String>,
    calls: Vec<Call>,
    fail_on: Option<FailOn>,
}

#[derive(Debug, Default)]
struct FakeTracker {
    state: Mutex<State>,
}

impl FakeTracker {
    fn new() -> Self {
        Self::default()
    }

    fn with_milestone(self, number: u64, title: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .milestones
            .insert(number, title.to_string());
        self
    }

    fn with_issue(self, number: u64, milestone: u64, labels: &[&str]) -> Self {
        self.state.lock().unwrap().issues.insert(
            number,
            FakeIssue {
                labels: labels.iter().map(|l| l.to_string()).collect(),
                milestone: Some(milestone),
            },
        );
        self
    }

    fn with_repo_label(self, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .repo_labels
            .insert(name.to_string(), "ffffff".to_string());
        self
    }

    fn failing_on(self, fail_on: FailOn) -> Self {
        self.state.lock().unwrap().fail_on = Some(fail_on);
        self
    }

    fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn issue(&self, number: u64) -> FakeIssue {
        self.state.lock().unwrap().issues[&number].clone()
    }

    fn issues(&self) -> BTreeMap<u64, FakeIssue> {
        self.state.lock().unwrap().issues.clone()
    }

    fn repo_labels(&self) -> BTreeMap<String, String> {
        self.state.lock().unwrap().repo_labels.clone()
    }

    fn check(state: &State, point: FailOn) -> Result<(), TrackerError> {
        if state.fail_on == Some(point) {
            Err(TrackerError::Api {
                status: 502,
                message: "Bad Gateway".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl IssueTracker for FakeTracker {
    async fn milestone_title(
        &self,
        _repo: &RepositoryRef,
        milestone: MilestoneNumber,
    ) -> Result<Option<String>, TrackerError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::MilestoneTitle(milestone.as_u64()));
        Self::check(&state, FailOn::MilestoneTitle)?;
        Ok(state.milestones.get(&milestone.as_u64()).cloned())
    }

    async fn milestone_issues(
        &self,
        _repo: &RepositoryRef,
        milestone: MilestoneNumber,
        limit: IssueLimit,
    ) -> Result<Option<MilestoneIssues>, TrackerError> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(Call::MilestoneIssues(milestone.as_u64(), limit.as_u32()));
        Self::check(&state, FailOn::MilestoneIssues)?;

        let Some(title) = state.milestones.get(&milestone.as_u64()).cloned() else {
            return Ok(None);
        };

        let issues = state
            .issues
            .iter()
            .filter(|(_, issue)| issue.milestone == Some(milestone.as_u64()))
            .take(limit.as_u32() as usize)
            .map(|(number, issue)| Issue {
                number: IssueNumber::new(*number),
                labels: issue
                    .labels
                    .iter()
                    .take(20)
                    .map(|name| Label { name: name.clone() })
                    .collect(),
            })
            .collect();

        Ok(Some(MilestoneIssues { title, issues }))
    }

    async fn create_label(
        &self,
        _repo: &RepositoryRef,
        label: &LabelSpec,
    ) -> Result<(), TrackerError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateLabel(
            label.name.to_string(),
            label.color.to_string(),
        ));
        Self::check(&state, FailOn::CreateLabel)?;

        if state.repo_labels.contains_key(label.name.as_str()) {
            return Err(TrackerError::AlreadyExists {
                resource: format!("label '{}'", label.name),
            });
        }
        state
            .repo_labels
            .insert(label.name.to_string(), label.color.to_string());
        Ok(())
    }

    async fn add_labels(
        &self,
        _repo: &RepositoryRef,
        issue: IssueNumber,
        labels: &[LabelName],
    ) -> Result<(), TrackerError> {
        let mut state = self.state.lock().unwrap();
        let names: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
        state
            .calls
            .push(Call::AddLabels(issue.as_u64(), names.clone()));
        Self::check(&state, FailOn::AddLabels(issue.as_u64()))?;

        let entry = state
            .issues
            .get_mut(&issue.as_u64())
            .expect("issue exists in fake");
        for name in names {
            if !entry.labels.contains(&name) {
                entry.labels.push(name);
            }
        }
        Ok(())
    }

    async fn set_milestone(
        &self,
        _repo: &RepositoryRef,
        issue: IssueNumber,
        milestone: Option<MilestoneNumber>,
    ) -> Result<(), TrackerError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::SetMilestone(
            issue.as_u64(),
            milestone.map(MilestoneNumber::as_u64),
        ));
        Self::check(&state, FailOn::SetMilestone(issue.as_u64()))?;

        let entry = state
            .issues
            .get_mut(&issue.as_u64())
            .expect("issue exists in fake");
        entry.milestone = milestone.map(MilestoneNumber::as_u64);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn repo() -> RepositoryRef {
    "octo-org/widgets".parse().expect("valid repository")
}

fn limit(n: u32) -> IssueLimit {
    IssueLimit::new(n).expect("valid limit")
}

async fn run(tracker: &FakeTracker, milestone: u64) -> Result<ReconcileReport, RolloverError> {
    Reconciler::new(tracker)
        .reconcile(&repo(), MilestoneNumber::new(milestone), limit(50))
        .await
}

// `&FakeTracker` is handed to the reconciler so tests can inspect state afterwards.
#[async_trait]
impl IssueTracker for &FakeTracker {
    async fn milestone_title(
        &self,
        repo: &RepositoryRef,
        milestone: MilestoneNumber,
    ) -> Result<Option<String>, TrackerError> {
        (**self).milestone_title(repo, milestone).await
    }

    async fn milestone_issues(
        &self,
        repo: &RepositoryRef,
        milestone: MilestoneNumber,
        limit: IssueLimit,
    ) -> Result<Option<MilestoneIssues>, TrackerError> {
        (**self).milestone_issues(repo, milestone, limit).await
    }

    async fn create_label(
        &self,
        repo: &RepositoryRef,
        label: &LabelSpec,
    ) -> Result<(), TrackerError> {
        (**self).create_label(repo, label).await
    }

    async fn add_labels(
        &self,
        repo: &RepositoryRef,
        issue: IssueNumber,
        labels: &[LabelName],
    ) -> Result<(), TrackerError> {
        (**self).add_labels(repo, issue, labels).await
    }

    async fn set_milestone(
        &self,
        repo: &RepositoryRef,
        issue: IssueNumber,
        milestone: Option<MilestoneNumber>,
    ) -> Result<(), TrackerError> {
        (**self).set_milestone(repo, issue, milestone).await
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_issue_is_labelled_and_moved_when_successor_exists() {
    let tracker = FakeTracker::new()
        .with_milestone(5, "2.0")
        .with_milestone(6, "2.1")
        .with_issue(42, 5, &[]);

    let report = run(&tracker, 5).await.expect("run succeeds");

    assert_eq!(
        tracker.repo_labels().get("missed: v2.0").map(String::as_str),
        Some("497E76")
    );
    let issue = tracker.issue(42);
    assert_eq!(issue.labels, vec!["missed: v2.0".to_string()]);
    assert_eq!(issue.milestone, Some(6));

    assert_eq!(report.title, "2.0");
    assert_eq!(report.successor, Some(MilestoneNumber::new(6)));
    assert_eq!(report.label_creation, LabelCreation::Created);
    assert_eq!(report.issues_seen, 1);
    assert_eq!(report.issues_labelled, 1);
    assert_eq!(report.issues_moved, 1);
}

#[tokio::test]
async fn test_already_missed_issue_is_not_relabelled_and_milestone_cleared() {
    let tracker = FakeTracker::new()
        .with_milestone(5, "2.0")
        .with_issue(42, 5, &["missed: v1.9"]);

    let report = run(&tracker, 5).await.expect("run succeeds");

    assert!(tracker.repo_labels().contains_key("missed: v2.0"));
    let issue = tracker.issue(42);
    assert_eq!(issue.labels, vec!["missed: v1.9".to_string()]);
    assert_eq!(issue.milestone, None);

    assert!(!tracker
        .calls()
        .iter()
        .any(|c| matches!(c, Call::AddLabels(..))));
    assert_eq!(report.successor, None);
    assert_eq!(report.issues_labelled, 0);
    assert_eq!(report.issues_moved, 1);
}

#[tokio::test]
async fn test_empty_milestone_makes_no_mutations() {
    let tracker = FakeTracker::new()
        .with_milestone(5, "2.0")
        .with_milestone(6, "2.1")
        .with_issue(7, 4, &[]);

    let report = run(&tracker, 5).await.expect("run succeeds");

    assert_eq!(
        tracker.calls(),
        vec![Call::MilestoneTitle(6), Call::MilestoneIssues(5, 50)]
    );
    assert!(tracker.repo_labels().is_empty());
    assert_eq!(report.label_creation, LabelCreation::Skipped);
    assert_eq!(report.issues_seen, 0);
    assert_eq!(report.issues_moved, 0);
}

#[tokio::test]
async fn test_existing_missed_label_does_not_fail_the_run() {
    let tracker = FakeTracker::new()
        .with_milestone(5, "2.0")
        .with_milestone(6, "2.1")
        .with_repo_label("missed: v2.0")
        .with_issue(42, 5, &[]);

    let report = run(&tracker, 5).await.expect("run succeeds");

    assert_eq!(report.label_creation, LabelCreation::AlreadyExisted);
    let issue = tracker.issue(42);
    assert_eq!(issue.labels, vec!["missed: v2.0".to_string()]);
    assert_eq!(issue.milestone, Some(6));
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_second_run_converges_to_same_state() {
    let tracker = FakeTracker::new()
        .with_milestone(5, "2.0")
        .with_issue(1, 5, &["bug"])
        .with_issue(2, 5, &["missed: v1.0"])
        .with_issue(3, 5, &[]);

    run(&tracker, 5).await.expect("first run succeeds");
    let issues_after_first = tracker.issues();
    let labels_after_first = tracker.repo_labels();

    // Without a successor the issues left milestone 5; put them back so the
    // second run sees the same milestone contents as the first.
    {
        let mut state = tracker.state.lock().unwrap();
        for issue in state.issues.values_mut() {
            issue.milestone = Some(5);
        }
    }
    let second = run(&tracker, 5).await.expect("second run succeeds");

    assert_eq!(tracker.issues(), issues_after_first);
    assert_eq!(tracker.repo_labels(), labels_after_first);
    assert_eq!(second.label_creation, LabelCreation::AlreadyExisted);
    assert_eq!(second.issues_labelled, 0);
    assert_eq!(second.issues_moved, 3);
}

#[tokio::test]
async fn test_rerun_after_rollover_finds_nothing_to_do() {
    let tracker = FakeTracker::new()
        .with_milestone(5, "2.0")
        .with_milestone(6, "2.1")
        .with_issue(1, 5, &[])
        .with_issue(2, 5, &["missed: v1.0"]);

    run(&tracker, 5).await.expect("first run succeeds");
    let snapshot = tracker.issues();
    tracker.clear_calls();

    let report = run(&tracker, 5).await.expect("second run succeeds");

    assert_eq!(tracker.issues(), snapshot);
    assert!(!tracker.calls().iter().any(Call::is_write));
    assert_eq!(report.issues_seen, 0);
}

#[tokio::test]
async fn test_every_issue_rolls_over_regardless_of_labelling() {
    let tracker = FakeTracker::new()
        .with_milestone(5, "2.0")
        .with_milestone(6, "2.1")
        .with_issue(1, 5, &["missed: v1.0"])
        .with_issue(2, 5, &["enhancement"])
        .with_issue(3, 5, &["missed: v2.0"])
        .with_issue(4, 5, &[]);

    let report = run(&tracker, 5).await.expect("run succeeds");

    for (number, issue) in tracker.issues() {
        assert_eq!(issue.milestone, Some(6), "issue #{number}");
        assert!(
            issue.labels.iter().any(|l| l.contains("missed: v")),
            "issue #{number} carries a missed-label"
        );
    }
    assert_eq!(report.issues_labelled, 2);
    assert_eq!(report.issues_moved, 4);
}

#[tokio::test]
async fn test_stale_missed_labels_are_kept() {
    let tracker = FakeTracker::new()
        .with_milestone(5, "2.0")
        .with_issue(42, 5, &["missed: v1.8", "missed: v1.9", "bug"]);

    run(&tracker, 5).await.expect("run succeeds");

    assert_eq!(
        tracker.issue(42).labels,
        vec![
            "missed: v1.8".to_string(),
            "missed: v1.9".to_string(),
            "bug".to_string()
        ]
    );
}

#[tokio::test]
async fn test_label_is_created_before_any_issue_is_touched() {
    let tracker = FakeTracker::new()
        .with_milestone(5, "2.0")
        .with_issue(1, 5, &[])
        .with_issue(2, 5, &[]);

    run(&tracker, 5).await.expect("run succeeds");

    let calls = tracker.calls();
    let create = calls
        .iter()
        .position(|c| matches!(c, Call::CreateLabel(..)))
        .expect("label created");
    let first_issue_call = calls
        .iter()
        .position(|c| matches!(c, Call::AddLabels(..) | Call::SetMilestone(..)))
        .expect("issues updated");
    assert!(create < first_issue_call);
    assert_eq!(
        calls[create],
        Call::CreateLabel("missed: v2.0".to_string(), "497E76".to_string())
    );
}

#[tokio::test]
async fn test_fetch_respects_issue_limit() {
    let tracker = FakeTracker::new()
        .with_milestone(5, "2.0")
        .with_issue(1, 5, &[])
        .with_issue(2, 5, &[])
        .with_issue(3, 5, &[]);

    let report = Reconciler::new(&tracker)
        .reconcile(&repo(), MilestoneNumber::new(5), limit(2))
        .await
        .expect("run succeeds");

    assert_eq!(report.issues_seen, 2);
    assert_eq!(tracker.issue(3).milestone, Some(5));
    assert!(tracker.issue(3).labels.is_empty());
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_missing_milestone_aborts_before_any_write() {
    let tracker = FakeTracker::new().with_milestone(6, "2.1");

    let err = run(&tracker, 5).await.expect_err("milestone 5 is missing");

    assert!(matches!(
        err,
        RolloverError::MilestoneNotFound { milestone, .. } if milestone == MilestoneNumber::new(5)
    ));
    assert!(!tracker.calls().iter().any(Call::is_write));
}

#[tokio::test]
async fn test_successor_lookup_failure_is_remote_failure() {
    let tracker = FakeTracker::new()
        .with_milestone(5, "2.0")
        .with_issue(1, 5, &[])
        .failing_on(FailOn::MilestoneTitle);

    let err = run(&tracker, 5).await.expect_err("lookup fails");

    assert!(matches!(err, RolloverError::RemoteFailure { .. }));
    assert_eq!(tracker.calls(), vec![Call::MilestoneTitle(6)]);
}

#[tokio::test]
async fn test_issue_fetch_failure_is_remote_failure() {
    let tracker = FakeTracker::new()
        .with_milestone(5, "2.0")
        .failing_on(FailOn::MilestoneIssues);

    let err = run(&tracker, 5).await.expect_err("fetch fails");

    assert!(matches!(
        err,
        RolloverError::RemoteFailure {
            source: TrackerError::Api { status: 502, .. },
            ..
        }
    ));
}

#[tokio::test]
async fn test_label_creation_failure_stops_before_issues() {
    let tracker = FakeTracker::new()
        .with_milestone(5, "2.0")
        .with_issue(1, 5, &[])
        .failing_on(FailOn::CreateLabel);

    let err = run(&tracker, 5).await.expect_err("label creation fails");

    assert!(err.to_string().contains("create label 'missed: v2.0'"));
    assert_eq!(tracker.issue(1).milestone, Some(5));
    assert!(!tracker
        .calls()
        .iter()
        .any(|c| matches!(c, Call::AddLabels(..) | Call::SetMilestone(..))));
}

#[tokio::test]
async fn test_failure_mid_loop_keeps_earlier_updates() {
    let tracker = FakeTracker::new()
        .with_milestone(5, "2.0")
        .with_milestone(6, "2.1")
        .with_issue(1, 5, &[])
        .with_issue(2, 5, &[])
        .with_issue(3, 5, &[])
        .failing_on(FailOn::AddLabels(2));

    let err = run(&tracker, 5).await.expect_err("second issue fails");

    assert!(err.to_string().contains("issue #2"));
    assert_eq!(tracker.issue(1).milestone, Some(6));
    assert_eq!(tracker.issue(1).labels, vec!["missed: v2.0".to_string()]);
    assert_eq!(tracker.issue(2).milestone, Some(5));
    assert_eq!(tracker.issue(3).milestone, Some(5));
    assert!(!tracker
        .calls()
        .iter()
        .any(|c| matches!(c, Call::AddLabels(3, _) | Call::SetMilestone(3, _))));
}

#[tokio::test]
async fn test_milestone_update_failure_aborts_run() {
    let tracker = FakeTracker::new()
        .with_milestone(5, "2.0")
        .with_issue(1, 5, &[])
        .with_issue(2, 5, &[])
        .failing_on(FailOn::SetMilestone(1));

    let err = run(&tracker, 5).await.expect_err("milestone update fails");

    assert!(err.to_string().contains("update milestone of issue #1"));
    assert!(tracker.issue(1).labels.contains(&"missed: v2.0".to_string()));
    assert!(tracker.issue(2).labels.is_empty());
}
