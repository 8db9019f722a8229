//! Git operations and history rewriting.

use anyhow::{Context, Result};
use git2::Repository;

pub mod diff;
pub mod repository;
pub mod rewrite;

pub use diff::{DiffSource, LocalDiffSource};
pub use repository::GitRepository;
pub use rewrite::{
    CommitterIdentity, RewriteBackend, RewriteHandler, RewriteOptions, RewriteOutcome,
};

/// Number of hex characters to show in abbreviated commit hashes.
pub const SHORT_HASH_LEN: usize = 8;

/// Checks if the current directory is a git repository.
pub fn check_git_repo() -> Result<()> {
    Repository::open(".").context("Not in a git repository")?;
    Ok(())
}

/// Abbreviates a commit hash for display.
pub(crate) fn short_hash(hash: &str) -> &str {
    &hash[..hash.len().min(SHORT_HASH_LEN)]
}
