//! Non-interactive history rewriting.
//!
//! Replaces the message of every commit from an anchor through HEAD,
//! oldest first, then force-pushes the rewritten branch. Two backends
//! produce the same history: a direct in-memory reword over the object
//! database, and a compatibility protocol that drives one interactive
//! rebase through a counter file, per-commit message files, and a step
//! script installed as the rebase editor.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result};
use git2::{Oid, Repository, Signature, Time};
use tracing::{debug, info};

use crate::data::Reword;
use crate::git::short_hash;

/// Explicit committer identity for rewritten commits.
///
/// Set explicitly rather than inherited so the synthetic commits carry
/// a deterministic committer independent of the invoking environment's
/// git config.
#[derive(Debug, Clone)]
pub struct CommitterIdentity {
    /// Committer display name.
    pub name: String,
    /// Committer email address.
    pub email: String,
}

/// History rewrite backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteBackend {
    /// Recreate commits directly through the object database.
    Direct,
    /// Drive `git rebase -i` through the message-file/counter/script
    /// protocol. Interoperable with tools that consume the same
    /// on-disk layout.
    SequenceScript,
}

/// Options controlling a history rewrite.
pub struct RewriteOptions {
    /// Backend to rewrite with.
    pub backend: RewriteBackend,
    /// Committer identity; falls back to the repository signature.
    pub committer: Option<CommitterIdentity>,
    /// Remote to force-push to after a successful rewrite; `None`
    /// leaves the rewritten branch local.
    pub push_remote: Option<String>,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            backend: RewriteBackend::Direct,
            committer: None,
            push_remote: None,
        }
    }
}

/// Result of a rewrite attempt.
#[derive(Debug)]
pub enum RewriteOutcome {
    /// Every planned message matched its original; nothing was touched.
    Unchanged,
    /// History was rewritten up to the returned new HEAD.
    Rewritten {
        /// Hash of the rewritten branch tip.
        new_head: String,
    },
}

/// History rewrite handler.
pub struct RewriteHandler {
    repo: Repository,
    workdir: PathBuf,
}

impl RewriteHandler {
    /// Creates a handler for the repository at the current directory.
    pub fn open() -> Result<Self> {
        Self::open_at(".")
    }

    /// Creates a handler for the repository at the given path.
    pub fn open_at<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let repo = Repository::open(path).context("Failed to open git repository")?;
        let workdir = repo
            .workdir()
            .context("Cannot rewrite history in a bare repository")?
            .to_path_buf();

        Ok(Self { repo, workdir })
    }

    /// Applies a rewrite plan to the repository.
    ///
    /// The plan must be in chronological (oldest-first) order and cover
    /// exactly the commits from its first entry through HEAD. If no
    /// planned message differs from its original the repository is not
    /// touched at all: no files are written and no rebase runs.
    pub fn apply(&self, plan: &[Reword], opts: &RewriteOptions) -> Result<RewriteOutcome> {
        if plan.is_empty() || plan.iter().all(|r| r.message == r.original) {
            info!("No message differs from its original; skipping rewrite");
            return Ok(RewriteOutcome::Unchanged);
        }

        self.verify_plan(plan)?;

        // One clock sample shared by both backends so their histories
        // can be compared commit-for-commit
        let when = chrono::Utc::now().timestamp();
        let committer = self.committer_identity(opts)?;

        let new_head = match opts.backend {
            RewriteBackend::Direct => self.reword_in_memory(plan, &committer, when)?,
            RewriteBackend::SequenceScript => self.reword_via_rebase(plan, &committer, when)?,
        };

        info!(
            new_head = %short_hash(&new_head),
            commits = plan.len(),
            "Rewrote commit messages"
        );

        if let Some(remote) = &opts.push_remote {
            self.force_push(remote)?;
        }

        Ok(RewriteOutcome::Rewritten { new_head })
    }

    /// Resolves the committer identity for this rewrite.
    fn committer_identity(&self, opts: &RewriteOptions) -> Result<CommitterIdentity> {
        if let Some(identity) = &opts.committer {
            return Ok(identity.clone());
        }

        let sig = self
            .repo
            .signature()
            .context("No committer identity configured; set user.name and user.email")?;

        Ok(CommitterIdentity {
            name: sig.name().unwrap_or("unknown").to_string(),
            email: sig.email().unwrap_or("unknown@localhost").to_string(),
        })
    }

    /// Verifies the plan matches the repository walk from its anchor to
    /// HEAD: same commits, same order, linear history.
    fn verify_plan(&self, plan: &[Reword]) -> Result<()> {
        let head = self
            .repo
            .head()
            .context("Failed to get HEAD")?
            .peel_to_commit()
            .context("Failed to peel HEAD to commit")?;

        let anchor_oid = Oid::from_str(&plan[0].commit)
            .with_context(|| format!("Invalid commit hash: {}", plan[0].commit))?;
        let anchor = self
            .repo
            .find_commit(anchor_oid)
            .with_context(|| format!("Commit not found: {}", plan[0].commit))?;

        let mut walker = self.repo.revwalk().context("Failed to create revwalk")?;
        walker.push(head.id()).context("Failed to push HEAD")?;
        if let Ok(parent) = anchor.parent(0) {
            walker
                .hide(parent.id())
                .context("Failed to bound walk at rewrite anchor")?;
        }

        let mut ids = Vec::new();
        for oid in walker {
            let oid = oid.context("Failed to walk commit range")?;
            let commit = self
                .repo
                .find_commit(oid)
                .context("Failed to find commit")?;
            if commit.parent_count() > 1 {
                anyhow::bail!(
                    "Merge commit {} in rewrite range; only linear history can be rewritten",
                    short_hash(&oid.to_string())
                );
            }
            ids.push(oid.to_string());
        }
        ids.reverse();

        if ids.len() != plan.len() {
            anyhow::bail!(
                "Rewrite plan has {} commits but the range from {} to HEAD has {}",
                plan.len(),
                short_hash(&plan[0].commit),
                ids.len()
            );
        }

        for (reword, id) in plan.iter().zip(&ids) {
            if reword.commit != *id {
                anyhow::bail!(
                    "Rewrite plan out of order: expected {}, found {}",
                    short_hash(id),
                    short_hash(&reword.commit)
                );
            }
        }

        Ok(())
    }

    /// Recreates each commit with its new message directly through the
    /// object database, then advances the branch ref.
    ///
    /// Trees and authors are preserved, so the working tree and index
    /// remain valid without a checkout.
    fn reword_in_memory(
        &self,
        plan: &[Reword],
        committer: &CommitterIdentity,
        when: i64,
    ) -> Result<String> {
        let committer_sig = Signature::new(&committer.name, &committer.email, &Time::new(when, 0))
            .context("Invalid committer identity")?;

        let anchor = self
            .repo
            .find_commit(Oid::from_str(&plan[0].commit)?)
            .context("Rewrite anchor not found")?;
        let mut parent = anchor.parent(0).ok();
        let mut tip = anchor.id();

        for reword in plan {
            let original = self
                .repo
                .find_commit(Oid::from_str(&reword.commit)?)
                .with_context(|| format!("Commit not found: {}", reword.commit))?;
            let tree = original.tree().context("Failed to get commit tree")?;
            let author = original.author();
            let parents: Vec<&git2::Commit> = parent.as_ref().into_iter().collect();

            let message = normalize_message(&reword.message);
            tip = self
                .repo
                .commit(None, &author, &committer_sig, &message, &tree, &parents)
                .with_context(|| {
                    format!("Failed to rewrite commit {}", short_hash(&reword.commit))
                })?;

            debug!(
                original = %short_hash(&reword.commit),
                rewritten = %short_hash(&tip.to_string()),
                "Reworded commit"
            );

            parent = Some(self.repo.find_commit(tip)?);
        }

        let head_ref = self.repo.head().context("Failed to get HEAD")?;
        let refname = head_ref
            .name()
            .context("HEAD reference has no name")?
            .to_string();
        if !refname.starts_with("refs/heads/") {
            anyhow::bail!("Cannot rewrite history in detached HEAD state");
        }

        self.repo
            .reference(&refname, tip, true, "recommit: reword commit messages")
            .context("Failed to advance branch to rewritten history")?;

        Ok(tip.to_string())
    }

    /// Rewords through one non-interactive `git rebase -i` driven by
    /// the message-file protocol.
    ///
    /// Every commit in the range is marked for reword; the step script
    /// runs once per replayed commit as the rebase editor, installing
    /// the message file whose index equals the counter and then
    /// incrementing the counter. All temporary files are removed after
    /// a successful rebase.
    fn reword_via_rebase(
        &self,
        plan: &[Reword],
        committer: &CommitterIdentity,
        when: i64,
    ) -> Result<String> {
        let dir = &self.workdir;

        let mut message_files = Vec::with_capacity(plan.len());
        for (index, reword) in plan.iter().enumerate() {
            let path = dir.join(format!("commit-{index}.txt"));
            fs::write(&path, normalize_message(&reword.message))
                .with_context(|| format!("Failed to write message file {}", path.display()))?;
            message_files.push(path);
        }

        let count_path = dir.join("count.txt");
        fs::write(&count_path, "0").context("Failed to write counter file")?;

        let script_path = dir.join("reword.sh");
        let script = format!(
            "#!/bin/sh\n\
             set -e\n\
             count=$(cat '{dir}/count.txt')\n\
             cat \"{dir}/commit-$count.txt\" > \"$1\"\n\
             echo $((count + 1)) > '{dir}/count.txt'\n",
            dir = dir.display()
        );
        fs::write(&script_path, script).context("Failed to write rewrite-step script")?;
        make_executable(&script_path)?;

        let anchor = self
            .repo
            .find_commit(Oid::from_str(&plan[0].commit)?)
            .context("Rewrite anchor not found")?;
        let base = if anchor.parent_count() > 0 {
            format!("{}^", plan[0].commit)
        } else {
            "--root".to_string()
        };

        info!(
            base = %base,
            commits = plan.len(),
            "Starting reword rebase"
        );

        let output = Command::new("git")
            .current_dir(dir)
            .args(["rebase", "-i", &base])
            .env("GIT_SEQUENCE_EDITOR", "sed -i -e 's/^pick /reword /'")
            .env("GIT_EDITOR", format!("'{}'", script_path.display()))
            .env("GIT_COMMITTER_NAME", &committer.name)
            .env("GIT_COMMITTER_EMAIL", &committer.email)
            .env("GIT_COMMITTER_DATE", format!("{} +0000", when))
            .output()
            .context("Failed to run git rebase")?;

        if !output.status.success() {
            let error_msg = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "Reword rebase failed and the repository may be mid-rebase: {}\n\
                 Resolve the conflict or run 'git rebase --abort', then remove the \
                 commit-*.txt, count.txt, and reword.sh files before retrying.",
                error_msg.trim()
            );
        }

        // Ephemeral state must not outlive a successful run
        for path in message_files {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        fs::remove_file(&count_path).context("Failed to remove counter file")?;
        fs::remove_file(&script_path).context("Failed to remove rewrite-step script")?;

        let new_head = self
            .repo
            .head()
            .context("Failed to get HEAD after rebase")?
            .peel_to_commit()
            .context("Failed to peel HEAD after rebase")?;

        Ok(new_head.id().to_string())
    }

    /// Force-pushes the current branch to the given remote.
    fn force_push(&self, remote: &str) -> Result<()> {
        let head_ref = self.repo.head().context("Failed to get HEAD")?;
        let branch = head_ref
            .shorthand()
            .filter(|name| *name != "HEAD")
            .context("Cannot push from detached HEAD")?
            .to_string();

        info!(remote = %remote, branch = %branch, "Force-pushing rewritten branch");

        let output = Command::new("git")
            .current_dir(&self.workdir)
            .args(["push", remote, &branch, "--force"])
            .output()
            .context("Failed to run git push")?;

        if !output.status.success() {
            let error_msg = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Force push to {} failed: {}", remote, error_msg.trim());
        }

        Ok(())
    }
}

/// Normalizes a message the way git's commit cleanup does: trailing
/// whitespace dropped, exactly one trailing newline.
fn normalize_message(message: &str) -> String {
    let mut normalized = message.trim_end().to_string();
    normalized.push('\n');
    normalized
}

/// Marks the rewrite-step script executable.
#[cfg(unix)]
fn make_executable(path: &std::path::Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .with_context(|| format!("Failed to make {} executable", path.display()))
}

/// Marks the rewrite-step script executable (no-op off unix).
#[cfg(not(unix))]
fn make_executable(_path: &std::path::Path) -> Result<()> {
    Ok(())
}
