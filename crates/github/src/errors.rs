//! Errors raised while constructing a [`crate::GithubClient`].
//!
//! Per-call failures are reported as [`rollover::TrackerError`] so the
//! reconciler never sees GitHub-specific types.

use thiserror::Error;

/// The client could not be built from the supplied configuration.
#[derive(Debug, Error)]
pub enum GithubError {
    /// The access token is empty or contains characters not allowed in a header.
    #[error("invalid access token: {reason}")]
    InvalidToken {
        /// What was wrong with the token. Never contains the token itself.
        reason: String,
    },

    /// The underlying HTTP client could not be initialised.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}
