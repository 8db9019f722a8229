//! Git repository operations.

use std::path::Path;

use anyhow::{Context, Result};
use git2::Repository;

use crate::data::CommitRef;

/// Git repository wrapper.
pub struct GitRepository {
    repo: Repository,
}

impl GitRepository {
    /// Open repository at current directory.
    pub fn open() -> Result<Self> {
        let repo = Repository::open(".").context("Not in a git repository")?;

        Ok(Self { repo })
    }

    /// Open repository at specified path.
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::open(path).context("Failed to open git repository")?;

        Ok(Self { repo })
    }

    /// Get access to the underlying git2::Repository.
    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Check if working directory is clean.
    pub fn is_working_directory_clean(&self) -> Result<bool> {
        let statuses = self
            .repo
            .statuses(None)
            .context("Failed to get repository status")?;

        let has_changes = statuses.iter().any(|entry| !entry.status().is_ignored());

        Ok(!has_changes)
    }

    /// Get current branch name.
    pub fn current_branch(&self) -> Result<String> {
        let head = self.repo.head().context("Failed to get HEAD reference")?;

        if let Some(name) = head.shorthand() {
            if name != "HEAD" {
                return Ok(name.to_string());
            }
        }

        anyhow::bail!("Repository is in detached HEAD state")
    }

    /// Parse a commit range and return its commits, oldest first.
    ///
    /// Accepts `HEAD`, a single commit hash or reference, or a range
    /// like `HEAD~3..HEAD`. Merge commits are rejected: rewriting a
    /// non-linear range would break the one-message-per-replayed-commit
    /// correspondence.
    pub fn commits_in_range(&self, range: &str) -> Result<Vec<CommitRef>> {
        let mut commits = Vec::new();

        if let Some((start_spec, end_spec)) = range.split_once("..") {
            if start_spec.is_empty() || end_spec.is_empty() || end_spec.starts_with('.') {
                anyhow::bail!("Invalid range format: {}", range);
            }

            let start_obj = self
                .repo
                .revparse_single(start_spec)
                .with_context(|| format!("Failed to parse start commit: {}", start_spec))?;
            let end_obj = self
                .repo
                .revparse_single(end_spec)
                .with_context(|| format!("Failed to parse end commit: {}", end_spec))?;

            let start_commit = start_obj
                .peel_to_commit()
                .context("Failed to peel start object to commit")?;
            let end_commit = end_obj
                .peel_to_commit()
                .context("Failed to peel end object to commit")?;

            // Walk from end_commit back to start_commit (exclusive)
            let mut walker = self.repo.revwalk().context("Failed to create revwalk")?;
            walker
                .push(end_commit.id())
                .context("Failed to push end commit")?;
            walker
                .hide(start_commit.id())
                .context("Failed to hide start commit")?;

            for oid in walker {
                let oid = oid.context("Failed to get commit OID from walker")?;
                let commit = self
                    .repo
                    .find_commit(oid)
                    .context("Failed to find commit")?;

                if commit.parent_count() > 1 {
                    anyhow::bail!(
                        "Range {} contains merge commit {}; only linear history can be rewritten",
                        range,
                        crate::git::short_hash(&oid.to_string())
                    );
                }

                commits.push(commit_ref(&commit));
            }

            // Reverse to get chronological order (oldest first)
            commits.reverse();
        } else {
            // Single commit by hash or reference
            let obj = self
                .repo
                .revparse_single(range)
                .with_context(|| format!("Failed to parse commit: {}", range))?;
            let commit = obj
                .peel_to_commit()
                .context("Failed to peel object to commit")?;

            if commit.parent_count() > 1 {
                anyhow::bail!(
                    "Commit {} is a merge; only linear history can be rewritten",
                    crate::git::short_hash(&commit.id().to_string())
                );
            }

            commits.push(commit_ref(&commit));
        }

        Ok(commits)
    }
}

/// Builds a CommitRef from a git2 commit.
fn commit_ref(commit: &git2::Commit) -> CommitRef {
    CommitRef {
        id: commit.id().to_string(),
        original_message: commit.message().unwrap_or("").to_string(),
    }
}
