//! Per-commit diff retrieval.

use std::future::Future;
use std::pin::Pin;

use anyhow::{Context, Result};
use futures::future::try_join_all;
use git2::{Oid, Repository};

use crate::data::DiffRecord;

/// Source of per-commit diffs.
///
/// One fetch per commit returns the patch-format diff of that commit
/// against its first parent, equivalent to `git show --format= -p`.
pub trait DiffSource {
    /// Fetches the diff for a single commit.
    fn fetch<'a>(&'a self, id: &'a str) -> Pin<Box<dyn Future<Output = Result<DiffRecord>> + 'a>>;

    /// Fetches diffs for all commits, fanning out one request per id.
    ///
    /// Fails atomically: any single failed fetch fails the whole batch.
    /// There is no partial-fetch recovery at this layer; retry policy
    /// lives with message generation, not diff retrieval.
    fn fetch_all<'a>(
        &'a self,
        ids: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<DiffRecord>>> + 'a>> {
        Box::pin(try_join_all(ids.iter().map(|id| self.fetch(id))))
    }
}

/// Diff source backed by the local repository.
pub struct LocalDiffSource {
    repo: Repository,
}

impl LocalDiffSource {
    /// Opens a diff source at the current directory.
    pub fn open() -> Result<Self> {
        let repo = Repository::open(".").context("Not in a git repository")?;
        Ok(Self { repo })
    }

    /// Opens a diff source at the specified path.
    pub fn open_at<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let repo = Repository::open(path).context("Failed to open git repository")?;
        Ok(Self { repo })
    }

    /// Produces the patch text for a commit against its first parent.
    fn patch_for(&self, id: &str) -> Result<String> {
        let oid = Oid::from_str(id).with_context(|| format!("Invalid commit hash: {}", id))?;
        let commit = self
            .repo
            .find_commit(oid)
            .with_context(|| format!("Commit not found: {}", id))?;

        let commit_tree = commit.tree().context("Failed to get commit tree")?;

        let parent_tree = if commit.parent_count() > 0 {
            Some(
                commit
                    .parent(0)
                    .context("Failed to get parent commit")?
                    .tree()
                    .context("Failed to get parent tree")?,
            )
        } else {
            None
        };

        let diff = if let Some(parent_tree) = parent_tree {
            self.repo
                .diff_tree_to_tree(Some(&parent_tree), Some(&commit_tree), None)
                .context("Failed to create diff")?
        } else {
            // Initial commit - diff against empty tree
            self.repo
                .diff_tree_to_tree(None, Some(&commit_tree), None)
                .context("Failed to create diff for initial commit")?
        };

        let mut diff_content = String::new();

        diff.print(git2::DiffFormat::Patch, |_delta, _hunk, line| {
            let content = std::str::from_utf8(line.content()).unwrap_or("<binary>");
            let prefix = match line.origin() {
                '+' => "+",
                '-' => "-",
                ' ' => " ",
                '@' => "@",
                _ => "",
            };
            diff_content.push_str(&format!("{}{}", prefix, content));
            true
        })
        .context("Failed to format diff")?;

        if !diff_content.is_empty() && !diff_content.ends_with('\n') {
            diff_content.push('\n');
        }

        Ok(diff_content)
    }
}

impl DiffSource for LocalDiffSource {
    fn fetch<'a>(&'a self, id: &'a str) -> Pin<Box<dyn Future<Output = Result<DiffRecord>> + 'a>> {
        Box::pin(async move {
            let diff = self.patch_for(id)?;
            Ok(DiffRecord {
                id: id.to_string(),
                diff,
            })
        })
    }
}
