//! Improve command — rewrites a local commit range with AI messages.

use anyhow::{Context, Result};
use clap::Parser;

use crate::ai::{create_generator, GenerationOptions, MessageImprover, RetryPolicy};
use crate::data::PlanFile;
use crate::git::{
    DiffSource, GitRepository, LocalDiffSource, RewriteBackend, RewriteHandler, RewriteOptions,
    RewriteOutcome,
};

/// Improve command options.
#[derive(Parser)]
pub struct ImproveCommand {
    /// Commit range to improve (e.g., HEAD~3..HEAD, abc123..def456).
    #[arg(value_name = "COMMIT_RANGE")]
    pub commit_range: Option<String>,

    /// Model to use (if not specified, uses settings or default).
    #[arg(long)]
    pub model: Option<String>,

    /// Language to write messages in.
    #[arg(long)]
    pub language: Option<String>,

    /// Prefixes each message with a GitMoji.
    #[arg(long)]
    pub emoji: bool,

    /// Adds a short body after each subject line.
    #[arg(long)]
    pub describe: bool,

    /// Saves the rewrite plan to a YAML file without applying it.
    #[arg(long, value_name = "FILE")]
    pub save_only: Option<String>,

    /// Maximum attempts per request chunk (default: retry forever).
    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,

    /// Remote to force-push the rewritten branch to.
    #[arg(long, default_value = "origin")]
    pub remote: String,

    /// Skips the force push after rewriting.
    #[arg(long)]
    pub no_push: bool,

    /// Rewrites through the sequence-script rebase protocol instead of
    /// the object database.
    #[arg(long)]
    pub compat_rebase: bool,
}

impl ImproveCommand {
    /// Executes the improve command.
    pub async fn execute(self) -> Result<()> {
        // Preflight: validate credentials and repository state before
        // any expensive work
        let generator_info =
            crate::utils::preflight::check_rewrite_prerequisites(".", self.model.as_deref())?;
        println!(
            "✓ {} credentials verified (model: {})",
            generator_info.provider, generator_info.model
        );

        let repo = GitRepository::open()?;
        let range = self.commit_range.as_deref().unwrap_or("HEAD");
        let commits = repo
            .commits_in_range(range)
            .with_context(|| format!("Failed to resolve commit range: {}", range))?;

        if commits.is_empty() {
            println!("No commits to improve.");
            return Ok(());
        }

        println!("🪄 Improving {} commit message(s)...", commits.len());

        let ids: Vec<String> = commits.iter().map(|c| c.id.clone()).collect();
        let diff_source = LocalDiffSource::open()?;
        let diffs = diff_source
            .fetch_all(&ids)
            .await
            .context("Failed to fetch commit diffs")?;

        let generator = create_generator(self.model.clone(), self.generation_options())?;
        let mut improver = MessageImprover::new(generator);
        if let Some(max) = self.max_retries {
            improver = improver.with_retry(RetryPolicy::bounded(max));
        }

        let improved = improver
            .improve(&diffs)
            .await
            .context("Failed to generate improved messages")?;

        let plan = PlanFile::from_parts(&commits, &improved)?;

        if let Some(path) = &self.save_only {
            plan.save_to_file(path)
                .with_context(|| format!("Failed to save plan to {}", path))?;
            println!("📄 Saved rewrite plan to {} without applying it", path);
            return Ok(());
        }

        let handler = RewriteHandler::open()?;
        let opts = RewriteOptions {
            backend: if self.compat_rebase {
                RewriteBackend::SequenceScript
            } else {
                RewriteBackend::Direct
            },
            committer: None,
            push_remote: (!self.no_push).then(|| self.remote.clone()),
        };

        match handler.apply(&plan.rewords, &opts)? {
            RewriteOutcome::Unchanged => {
                println!("✨ All commit messages already match; nothing to rewrite.");
            }
            RewriteOutcome::Rewritten { new_head } => {
                println!(
                    "✅ Rewrote {} commit message(s); new HEAD is {}",
                    plan.rewords.len(),
                    &new_head[..crate::git::SHORT_HASH_LEN.min(new_head.len())]
                );
                if self.no_push {
                    println!("Skipped force push (--no-push)");
                }
            }
        }

        Ok(())
    }

    /// Resolves generation options from flags with environment fallback.
    fn generation_options(&self) -> GenerationOptions {
        let mut options = GenerationOptions::from_env();
        if let Some(language) = &self.language {
            options.language = language.clone();
        }
        if self.emoji {
            options.emoji = true;
        }
        if self.describe {
            options.describe = true;
        }
        options
    }
}
