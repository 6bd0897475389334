//! GitHub infrastructure adapter.
//!
//! Implements the [`rollover::IssueTracker`] port on top of GitHub's GraphQL
//! API (milestone and issue reads) and REST API (label and milestone writes),
//! using [`reqwest`].
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules.
//! Authentication headers, API versioning, response decoding, and the mapping
//! of HTTP failures onto [`rollover::TrackerError`] live here; the
//! [`rollover`] crate never sees them.

pub mod client;
pub mod errors;
mod graphql;

pub use client::{GithubClient, GithubConfig, API_VERSION, DEFAULT_API_URL, DEFAULT_GRAPHQL_URL};
pub use errors::GithubError;
