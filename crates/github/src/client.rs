//! [`GithubClient`]: the [`IssueTracker`] implementation for GitHub.
//!
//! Reads go through the GraphQL API so a milestone's issues and their labels
//! come back in one request. Writes go through the REST API. Nothing is
//! retried; the first failure is returned to the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use rollover::{
    IssueLimit, IssueNumber, IssueTracker, LabelName, LabelSpec, MilestoneIssues,
    MilestoneNumber, RepositoryRef, TrackerError,
};

use crate::graphql::{
    self, GraphQlRequest, MilestoneIssuesData, MilestoneIssuesVariables, MilestoneTitleData,
    MilestoneVariables, MILESTONE_ISSUES_QUERY, MILESTONE_TITLE_QUERY,
};
use crate::GithubError;

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

/// Public GitHub REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Public GitHub GraphQL endpoint.
pub const DEFAULT_GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// REST API version requested on every call.
pub const API_VERSION: &str = "2022-11-28";

const API_VERSION_HEADER: &str = "x-github-api-version";

const DEFAULT_USER_AGENT: &str = concat!("milestone-rollover/", env!("CARGO_PKG_VERSION"));

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Connection settings for [`GithubClient`].
#[derive(Clone)]
pub struct GithubConfig {
    /// Access token sent as a bearer credential.
    pub token: String,
    /// Base URL of the REST API, without a trailing slash.
    pub api_url: String,
    /// Full URL of the GraphQL endpoint.
    pub graphql_url: String,
    /// `User-Agent` header value. GitHub rejects requests without one.
    pub user_agent: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl GithubConfig {
    /// Creates a configuration for github.com with the given token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_url: DEFAULT_API_URL.to_string(),
            graphql_url: DEFAULT_GRAPHQL_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Points the REST calls at another API root (e.g. GitHub Enterprise Server).
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Points the GraphQL calls at another endpoint.
    pub fn with_graphql_url(mut self, url: impl Into<String>) -> Self {
        self.graphql_url = url.into();
        self
    }

    /// Overrides the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for GithubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubConfig")
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("graphql_url", &self.graphql_url)
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// GitHub-backed [`IssueTracker`].
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: Client,
    api_url: String,
    graphql_url: String,
}

impl GithubClient {
    /// Builds a client. Authentication and API-version headers are attached to
    /// every request.
    pub fn new(config: GithubConfig) -> Result<Self, GithubError> {
        if config.token.trim().is_empty() {
            return Err(GithubError::InvalidToken {
                reason: "token is empty".to_string(),
            });
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token)).map_err(|_| {
            GithubError::InvalidToken {
                reason: "token contains characters not allowed in an HTTP header".to_string(),
            }
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            HeaderName::from_static(API_VERSION_HEADER),
            HeaderValue::from_static(API_VERSION),
        );

        let http = Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            graphql_url: config.graphql_url,
        })
    }

    fn repo_url(&self, repo: &RepositoryRef, path: &str) -> String {
        format!(
            "{}/repos/{}/{}{}",
            self.api_url, repo.owner, repo.name, path
        )
    }

    async fn graphql<V, T>(&self, query: &str, variables: V) -> Result<T, TrackerError>
    where
        V: Serialize + Send,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(&self.graphql_url)
            .json(&GraphQlRequest { query, variables })
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(classify_failure(status, &body, "GraphQL query"));
        }

        graphql::decode(&body)
    }

    async fn send(&self, request: RequestBuilder, resource: &str) -> Result<(), TrackerError> {
        let response = request.send().await.map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            debug!(status = status.as_u16(), "GitHub accepted request");
            return Ok(());
        }

        let body = response.text().await.map_err(transport_error)?;
        Err(classify_failure(status, &body, resource))
    }
}

#[async_trait]
impl IssueTracker for GithubClient {
    #[instrument(skip(self, repo), fields(repository = %repo, milestone = %milestone))]
    async fn milestone_title(
        &self,
        repo: &RepositoryRef,
        milestone: MilestoneNumber,
    ) -> Result<Option<String>, TrackerError> {
        let data: MilestoneTitleData = self
            .graphql(
                MILESTONE_TITLE_QUERY,
                MilestoneVariables {
                    owner: repo.owner.as_str(),
                    name: repo.name.as_str(),
                    milestone: milestone.as_u64(),
                },
            )
            .await?;

        Ok(data.into_title())
    }

    #[instrument(skip(self, repo), fields(repository = %repo, milestone = %milestone, limit = %limit))]
    async fn milestone_issues(
        &self,
        repo: &RepositoryRef,
        milestone: MilestoneNumber,
        limit: IssueLimit,
    ) -> Result<Option<MilestoneIssues>, TrackerError> {
        let data: MilestoneIssuesData = self
            .graphql(
                MILESTONE_ISSUES_QUERY,
                MilestoneIssuesVariables {
                    owner: repo.owner.as_str(),
                    name: repo.name.as_str(),
                    milestone: milestone.as_u64(),
                    first: limit.as_u32(),
                },
            )
            .await?;

        Ok(data.into_milestone_issues())
    }

    #[instrument(skip(self, repo, label), fields(repository = %repo, label = %label.name))]
    async fn create_label(
        &self,
        repo: &RepositoryRef,
        label: &LabelSpec,
    ) -> Result<(), TrackerError> {
        let body = serde_json::json!({
            "name": label.name.as_str(),
            "color": label.color.as_str(),
        });
        let request = self.http.post(self.repo_url(repo, "/labels")).json(&body);

        self.send(request, &format!("label '{}'", label.name)).await
    }

    #[instrument(skip(self, repo, labels), fields(repository = %repo, issue = %issue))]
    async fn add_labels(
        &self,
        repo: &RepositoryRef,
        issue: IssueNumber,
        labels: &[LabelName],
    ) -> Result<(), TrackerError> {
        let names: Vec<&str> = labels.iter().map(LabelName::as_str).collect();
        let body = serde_json::json!({ "labels": names });
        let request = self
            .http
            .post(self.repo_url(repo, &format!("/issues/{issue}/labels")))
            .json(&body);

        self.send(request, &format!("labels on issue #{issue}")).await
    }

    #[instrument(skip(self, repo), fields(repository = %repo, issue = %issue))]
    async fn set_milestone(
        &self,
        repo: &RepositoryRef,
        issue: IssueNumber,
        milestone: Option<MilestoneNumber>,
    ) -> Result<(), TrackerError> {
        let body = serde_json::json!({ "milestone": milestone.map(MilestoneNumber::as_u64) });
        let request = self
            .http
            .patch(self.repo_url(repo, &format!("/issues/{issue}")))
            .json(&body);

        self.send(request, &format!("issue #{issue}")).await
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct RestErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<RestErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct RestErrorDetail {
    #[serde(default)]
    code: Option<String>,
}

fn transport_error(e: reqwest::Error) -> TrackerError {
    TrackerError::Transport {
        message: e.to_string(),
    }
}

/// Maps a non-success response to a [`TrackerError`].
///
/// A 422 whose validation errors include `already_exists` becomes
/// [`TrackerError::AlreadyExists`]; everything else is [`TrackerError::Api`].
fn classify_failure(status: StatusCode, body: &str, resource: &str) -> TrackerError {
    let parsed: RestErrorBody = serde_json::from_str(body).unwrap_or_default();

    if status == StatusCode::UNPROCESSABLE_ENTITY
        && parsed
            .errors
            .iter()
            .any(|e| e.code.as_deref() == Some("already_exists"))
    {
        return TrackerError::AlreadyExists {
            resource: resource.to_string(),
        };
    }

    let message = if parsed.message.is_empty() {
        body.trim().to_string()
    } else {
        parsed.message
    };

    TrackerError::Api {
        status: status.as_u16(),
        message,
    }
}
