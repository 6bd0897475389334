//! Command-line and environment configuration.
//!
//! Every option can also be supplied through the environment variable a GitHub
//! Actions runner sets for it (`INPUT_*` for action inputs, `GITHUB_*` for the
//! workflow context), so the binary runs unchanged as an action step.

use std::time::Duration;

use clap::{Parser, ValueEnum};
use github::{GithubConfig, DEFAULT_API_URL, DEFAULT_GRAPHQL_URL};
use rollover::{IssueLimit, MilestoneNumber, RepositoryRef, RolloverError};

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Output format of the log lines written to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

/// Tag still-open issues of a milestone as missed and roll them into the next milestone.
#[derive(Parser)]
#[command(name = "milestone-rollover", version, about)]
pub struct Cli {
    /// Access token used for every GitHub call.
    #[arg(long = "github-token", env = "INPUT_GITHUB-TOKEN", hide_env_values = true)]
    pub github_token: String,

    /// Number of the milestone to reconcile.
    #[arg(long, env = "INPUT_MILESTONE")]
    pub milestone: u64,

    /// Maximum number of open issues to fetch (1-100, single page).
    #[arg(long = "issues-count", env = "INPUT_ISSUES-COUNT")]
    pub issues_count: u32,

    /// Repository in `owner/name` form.
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repository: RepositoryRef,

    /// REST API root.
    #[arg(long = "api-url", env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// GraphQL endpoint.
    #[arg(long = "graphql-url", env = "GITHUB_GRAPHQL_URL", default_value = DEFAULT_GRAPHQL_URL)]
    pub graphql_url: String,

    /// Per-request timeout in seconds.
    #[arg(long = "timeout-secs", env = "ROLLOVER_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Log output format.
    #[arg(long = "log-format", env = "ROLLOVER_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl std::fmt::Debug for Cli {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cli")
            .field("github_token", &"<redacted>")
            .field("milestone", &self.milestone)
            .field("issues_count", &self.issues_count)
            .field("repository", &self.repository)
            .field("api_url", &self.api_url)
            .field("graphql_url", &self.graphql_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("log_format", &self.log_format)
            .finish()
    }
}

/// Validated inputs for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub repository: RepositoryRef,
    pub milestone: MilestoneNumber,
    pub limit: IssueLimit,
    pub github: GithubConfig,
}

impl Cli {
    /// Checks the values clap cannot and assembles a [`RunConfig`].
    pub fn run_config(&self) -> Result<RunConfig, RolloverError> {
        if self.github_token.trim().is_empty() {
            return Err(RolloverError::Configuration {
                message: "github-token must not be empty".to_string(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(RolloverError::Configuration {
                message: "timeout-secs must be greater than zero".to_string(),
            });
        }

        let limit = IssueLimit::new(self.issues_count)?;

        let github = GithubConfig::new(self.github_token.clone())
            .with_api_url(self.api_url.as_str())
            .with_graphql_url(self.graphql_url.as_str())
            .with_timeout(Duration::from_secs(self.timeout_secs));

        Ok(RunConfig {
            repository: self.repository.clone(),
            milestone: MilestoneNumber::new(self.milestone),
            limit,
            github,
        })
    }
}
