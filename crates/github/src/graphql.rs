//! GraphQL queries and the strict response schema they decode into.
//!
//! Every response is deserialized into the structs below before anything else
//! looks at it. A body that does not fit is a [`TrackerError::Schema`]; a body
//! with a non-empty `errors` array is a [`TrackerError::GraphQl`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use rollover::{Issue, IssueNumber, Label, MilestoneIssues, TrackerError};

#[cfg(test)]
#[path = "graphql_tests.rs"]
mod tests;

/// Looks up a milestone by number; `milestone` is `null` when it does not exist.
pub(crate) const MILESTONE_TITLE_QUERY: &str = r#"query checkMilestoneExists($owner: String!, $name: String!, $milestone: Int!) {
  repository(owner: $owner, name: $name) {
    milestone(number: $milestone) {
      title
    }
  }
}"#;

/// Fetches a milestone's title and its first `$first` open issues with up to
/// 20 labels each.
pub(crate) const MILESTONE_ISSUES_QUERY: &str = r#"query milestoneIssues($owner: String!, $name: String!, $milestone: Int!, $first: Int!) {
  repository(owner: $owner, name: $name) {
    milestone(number: $milestone) {
      title
      issues(first: $first, states: OPEN) {
        nodes {
          number
          labels(first: 20) {
            nodes {
              name
            }
          }
        }
      }
    }
  }
}"#;

// ---------------------------------------------------------------------------
// Request envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(crate) struct GraphQlRequest<'a, V> {
    pub query: &'a str,
    pub variables: V,
}

#[derive(Debug, Serialize)]
pub(crate) struct MilestoneVariables<'a> {
    pub owner: &'a str,
    pub name: &'a str,
    pub milestone: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct MilestoneIssuesVariables<'a> {
    pub owner: &'a str,
    pub name: &'a str,
    pub milestone: u64,
    pub first: u32,
}

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<serde_json::Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct Connection<T> {
    nodes: Vec<T>,
}

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct MilestoneTitleData {
    repository: RepositoryNode<TitleNode>,
}

impl MilestoneTitleData {
    pub(crate) fn into_title(self) -> Option<String> {
        self.repository.milestone.map(|m| m.title)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct MilestoneIssuesData {
    repository: RepositoryNode<MilestoneNode>,
}

impl MilestoneIssuesData {
    pub(crate) fn into_milestone_issues(self) -> Option<MilestoneIssues> {
        self.repository.milestone.map(|m| MilestoneIssues {
            title: m.title,
            issues: m
                .issues
                .nodes
                .into_iter()
                .map(|issue| Issue {
                    number: IssueNumber::new(issue.number),
                    labels: issue
                        .labels
                        .nodes
                        .into_iter()
                        .map(|l| Label { name: l.name })
                        .collect(),
                })
                .collect(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RepositoryNode<M> {
    milestone: Option<M>,
}

#[derive(Debug, Deserialize)]
struct TitleNode {
    title: String,
}

#[derive(Debug, Deserialize)]
struct MilestoneNode {
    title: String,
    issues: Connection<IssueNode>,
}

#[derive(Debug, Deserialize)]
struct IssueNode {
    number: u64,
    labels: Connection<LabelNode>,
}

#[derive(Debug, Deserialize)]
struct LabelNode {
    name: String,
}

/// Decodes a GraphQL response body into its `data` payload.
///
/// `errors` is checked before `data` is typed, since GitHub returns partial
/// (often `null`) data alongside errors.
pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> Result<T, TrackerError> {
    let response: GraphQlResponse = serde_json::from_str(body).map_err(schema_error)?;

    if !response.errors.is_empty() {
        return Err(TrackerError::GraphQl {
            messages: response.errors.into_iter().map(|e| e.message).collect(),
        });
    }

    let data = response.data.ok_or_else(|| TrackerError::Schema {
        message: "response has neither data nor errors".to_string(),
    })?;
    serde_json::from_value(data).map_err(schema_error)
}

fn schema_error(e: serde_json::Error) -> TrackerError {
    TrackerError::Schema {
        message: e.to_string(),
    }
}
