//! Core data types and serialization.

use serde::{Deserialize, Serialize};

pub mod plan;

pub use plan::{PlanFile, Reword};

/// A commit selected for message improvement.
///
/// Created by a commit source (local range or push event payload) and
/// read-only afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRef {
    /// Full SHA-1 hash of the commit.
    pub id: String,
    /// The original commit message as written by the author.
    pub original_message: String,
}

/// A commit's diff against its first parent.
///
/// The diff text may be empty (binary-only changes).
#[derive(Debug, Clone)]
pub struct DiffRecord {
    /// Full SHA-1 hash of the commit.
    pub id: String,
    /// Patch-format diff text.
    pub diff: String,
}

/// An improved message produced for a single commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImprovedMessage {
    /// Full SHA-1 hash of the commit the message belongs to.
    pub id: String,
    /// The improved commit message.
    pub message: String,
}

/// Serializes a value to a YAML string.
pub fn to_yaml<T: Serialize>(value: &T) -> anyhow::Result<String> {
    serde_yaml::to_string(value).map_err(Into::into)
}

/// Deserializes a value from a YAML string.
pub fn from_yaml<'de, T: Deserialize<'de>>(yaml: &'de str) -> anyhow::Result<T> {
    serde_yaml::from_str(yaml).map_err(Into::into)
}
