//! CI push-event payload handling.
//!
//! Reads the hosting platform's push event from the environment: the
//! event payload supplies the ordered commit list (oldest first by the
//! platform contract) and the actor supplies the synthetic committer
//! identity used for the rewrite.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::data::CommitRef;
use crate::git::CommitterIdentity;

/// A push event payload.
#[derive(Debug, Deserialize)]
pub struct PushEvent {
    /// The updated ref, e.g. `refs/heads/main`.
    #[serde(rename = "ref")]
    pub git_ref: String,
    /// Tip of the branch before the push.
    pub before: String,
    /// Tip of the branch after the push.
    pub after: String,
    /// Pushed commits, oldest first.
    #[serde(default)]
    pub commits: Vec<EventCommit>,
}

/// A single commit entry in a push event payload.
#[derive(Debug, Deserialize)]
pub struct EventCommit {
    /// Full SHA-1 hash of the commit.
    pub id: String,
    /// The commit message as pushed.
    pub message: String,
}

impl PushEvent {
    /// Loads a push event from a payload file.
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).with_context(|| {
            format!("Failed to read event payload: {}", path.as_ref().display())
        })?;

        serde_json::from_str(&content).context("Failed to parse push event payload")
    }

    /// Returns the pushed commits as commit refs, oldest first.
    pub fn commit_refs(&self) -> Vec<CommitRef> {
        self.commits
            .iter()
            .map(|c| CommitRef {
                id: c.id.clone(),
                original_message: c.message.clone(),
            })
            .collect()
    }

    /// Returns the short branch name of the pushed ref.
    pub fn branch(&self) -> Option<&str> {
        self.git_ref.strip_prefix("refs/heads/")
    }
}

/// Environment context of a CI action run.
#[derive(Debug)]
pub struct ActionContext {
    /// Path to the event payload file.
    pub event_path: PathBuf,
    /// Actor that triggered the event.
    pub actor: String,
    /// Hostname of the hosting platform.
    pub host: String,
    /// Checkout directory of the repository.
    pub workspace: PathBuf,
}

impl ActionContext {
    /// Reads the action context from the environment.
    ///
    /// Fails when the run was not triggered by a push event or the
    /// payload path is missing; both are operator errors, not no-ops.
    pub fn from_env() -> Result<Self> {
        let event_name =
            std::env::var("GITHUB_EVENT_NAME").context("GITHUB_EVENT_NAME is not set")?;
        if event_name != "push" {
            anyhow::bail!(
                "Unsupported event type '{}'; only push events can be rewritten",
                event_name
            );
        }

        let event_path = std::env::var("GITHUB_EVENT_PATH")
            .context("GITHUB_EVENT_PATH is not set")
            .map(PathBuf::from)?;

        let actor = std::env::var("GITHUB_ACTOR").context("GITHUB_ACTOR is not set")?;

        let host = std::env::var("GITHUB_SERVER_URL")
            .ok()
            .map(|url| server_host(&url))
            .unwrap_or_else(|| "github.com".to_string());

        let workspace = std::env::var("GITHUB_WORKSPACE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        Ok(Self {
            event_path,
            actor,
            host,
            workspace,
        })
    }

    /// Derives the synthetic committer identity for the actor.
    ///
    /// Uses the platform's noreply address form so rewritten commits
    /// attribute to the actor without exposing an email address.
    pub fn committer_identity(&self) -> CommitterIdentity {
        CommitterIdentity {
            name: self.actor.clone(),
            email: format!("{}@users.noreply.{}", self.actor, self.host),
        }
    }
}

/// Extracts the bare hostname from a server URL.
fn server_host(url: &str) -> String {
    let stripped = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);

    stripped.trim_end_matches('/').to_string()
}
