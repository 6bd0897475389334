//! Newtype domain identifiers.
//!
//! Every tracker concept that has an identity is represented as a distinct newtype
//! wrapping a primitive. This prevents accidentally interchanging — for example —
//! an [`IssueNumber`] with a [`MilestoneNumber`] even though both are `u64` under
//! the hood.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::RolloverError;

#[cfg(test)]
#[path = "identifiers_tests.rs"]
mod tests;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Macro for u64-wrapped newtypes (tracker-assigned integers).
// Generates: struct (Copy), new(), as_u64(), Display.
// ---------------------------------------------------------------------------
macro_rules! u64_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Creates a new identifier from a raw integer.
            pub fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the underlying integer value.
            pub fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers — tracker-integer-backed
// ---------------------------------------------------------------------------

u64_id! {
    /// Identifies a milestone by the number the tracker assigned to it.
    ///
    /// Numbers are per repository and start at 1. Titles are free text and are
    /// never used for sequencing.
    MilestoneNumber
}

impl MilestoneNumber {
    /// Returns the candidate successor milestone, `number + 1`.
    ///
    /// Whether the successor actually exists is decided by a tracker lookup.
    pub fn successor(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

u64_id! {
    /// Identifies an issue by its per-repository number.
    IssueNumber
}

// ---------------------------------------------------------------------------
// Identifiers — String-backed
// ---------------------------------------------------------------------------

string_id! {
    /// The account or organisation that owns a repository.
    RepositoryOwner
}

string_id! {
    /// The name of a repository within its owner's namespace.
    RepositoryName
}

string_id! {
    /// The name of a label. The tracker deduplicates labels by name.
    LabelName
}

// ---------------------------------------------------------------------------
// Repository reference
// ---------------------------------------------------------------------------

/// Identifies a repository as an `(owner, name)` pair.
///
/// Resolved once at the process boundary (e.g. from `GITHUB_REPOSITORY`) and
/// passed explicitly to everything that talks to the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryRef {
    /// Owning account or organisation.
    pub owner: RepositoryOwner,
    /// Repository name.
    pub name: RepositoryName,
}

impl RepositoryRef {
    /// Creates a [`RepositoryRef`] from its two halves.
    pub fn new(owner: RepositoryOwner, name: RepositoryName) -> Self {
        Self { owner, name }
    }
}

impl std::fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepositoryRef {
    type Err = RolloverError;

    /// Parses the `"owner/name"` form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RolloverError::Configuration {
            message: format!("invalid repository '{s}', expected 'owner/name'"),
        };

        let (owner, name) = s.split_once('/').ok_or_else(invalid)?;
        if name.contains('/') {
            return Err(invalid());
        }

        let owner = RepositoryOwner::new(owner.trim()).ok_or_else(invalid)?;
        let name = RepositoryName::new(name.trim()).ok_or_else(invalid)?;
        Ok(Self { owner, name })
    }
}

// ---------------------------------------------------------------------------
// Identifiers — UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single reconciliation run.
///
/// Generated fresh for every invocation and recorded on the root span so all
/// tracker calls from one run can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Generates a new random run identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
