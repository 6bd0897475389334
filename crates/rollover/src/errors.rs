//! Error types for the milestone rollover domain.
//!
//! [`TrackerError`] is what an [`crate::IssueTracker`] implementation returns
//! for a single failed call. [`RolloverError`] covers conditions that abort a
//! whole reconciliation run; it is the only error a caller of
//! [`crate::Reconciler::reconcile`] ever sees.

use thiserror::Error;

use crate::{MilestoneNumber, RepositoryRef};

// ---------------------------------------------------------------------------
// Tracker-level errors
// ---------------------------------------------------------------------------

/// Failure of a single call to the issue tracker.
///
/// None of these are retried. [`TrackerError::AlreadyExists`] is the one
/// variant the reconciler treats as success (idempotent label creation).
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The request never produced an HTTP response (DNS, TLS, timeout, ...).
    #[error("transport error: {message}")]
    Transport {
        /// Description from the HTTP client.
        message: String,
    },

    /// The tracker answered with a non-success status.
    #[error("tracker API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message from the response body, or the raw body if it had none.
        message: String,
    },

    /// The response did not match the expected schema.
    #[error("unexpected response shape: {message}")]
    Schema {
        /// Decoder error description.
        message: String,
    },

    /// The query was rejected at the GraphQL layer.
    #[error("GraphQL query failed: {}", messages.join("; "))]
    GraphQl {
        /// One message per reported GraphQL error.
        messages: Vec<String>,
    },

    /// The resource being created already exists.
    #[error("{resource} already exists")]
    AlreadyExists {
        /// Description of the colliding resource.
        resource: String,
    },
}

// ---------------------------------------------------------------------------
// Run-level errors
// ---------------------------------------------------------------------------

/// Errors that abort a reconciliation run.
///
/// Mutations applied before the failure stay applied; there is no rollback.
#[derive(Debug, Error)]
pub enum RolloverError {
    /// Input parameters are missing or invalid. Raised before any tracker call.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// The milestone being reconciled does not exist on the repository.
    #[error("Milestone {milestone} not found in {repository}")]
    MilestoneNotFound {
        /// Repository that was queried.
        repository: RepositoryRef,
        /// Milestone number that was requested.
        milestone: MilestoneNumber,
    },

    /// A tracker call failed.
    #[error("Failed to {operation}: {source}")]
    RemoteFailure {
        /// What the reconciler was doing, e.g. `"add label to issue #42"`.
        operation: String,
        /// The underlying tracker error.
        #[source]
        source: TrackerError,
    },
}

impl RolloverError {
    /// Wraps a [`TrackerError`] with the operation that produced it.
    pub fn remote(operation: impl Into<String>, source: TrackerError) -> Self {
        Self::RemoteFailure {
            operation: operation.into(),
            source,
        }
    }
}
