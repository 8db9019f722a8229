//! Action command — rewrites the commits of a CI push event.

use anyhow::{Context, Result};
use clap::Parser;

use crate::ai::{create_generator, GenerationOptions, MessageImprover, RetryPolicy};
use crate::data::PlanFile;
use crate::event::{ActionContext, PushEvent};
use crate::git::{
    DiffSource, LocalDiffSource, RewriteBackend, RewriteHandler, RewriteOptions, RewriteOutcome,
};

/// Action command options.
///
/// Everything else comes from the CI environment: event name and
/// payload path, actor, server URL, and workspace directory.
#[derive(Parser)]
pub struct ActionCommand {
    /// Model to use (if not specified, uses settings or default).
    #[arg(long)]
    pub model: Option<String>,

    /// Maximum attempts per request chunk (default: retry forever).
    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,

    /// Remote to force-push the rewritten branch to.
    #[arg(long, default_value = "origin")]
    pub remote: String,

    /// Rewrites through the sequence-script rebase protocol instead of
    /// the object database.
    #[arg(long)]
    pub compat_rebase: bool,
}

impl ActionCommand {
    /// Executes the action command.
    pub async fn execute(self) -> Result<()> {
        let ctx = ActionContext::from_env()?;
        let event = PushEvent::load_from_file(&ctx.event_path)?;

        let commits = event.commit_refs();
        if commits.is_empty() {
            println!("No new commits found; nothing to improve.");
            return Ok(());
        }

        let generator_info = crate::utils::preflight::check_rewrite_prerequisites(
            &ctx.workspace,
            self.model.as_deref(),
        )?;
        println!(
            "✓ {} credentials verified (model: {})",
            generator_info.provider, generator_info.model
        );
        println!(
            "🪄 Improving {} pushed commit message(s) on {}...",
            commits.len(),
            event.branch().unwrap_or(&event.git_ref)
        );

        let ids: Vec<String> = commits.iter().map(|c| c.id.clone()).collect();
        let diff_source = LocalDiffSource::open_at(&ctx.workspace)?;
        let diffs = diff_source
            .fetch_all(&ids)
            .await
            .context("Failed to fetch commit diffs")?;

        let generator = create_generator(self.model.clone(), GenerationOptions::from_env())?;
        let mut improver = MessageImprover::new(generator);
        if let Some(max) = self.max_retries {
            improver = improver.with_retry(RetryPolicy::bounded(max));
        }

        let improved = improver
            .improve(&diffs)
            .await
            .context("Failed to generate improved messages")?;

        let plan = PlanFile::from_parts(&commits, &improved)?;

        let handler = RewriteHandler::open_at(&ctx.workspace)?;
        let opts = RewriteOptions {
            backend: if self.compat_rebase {
                RewriteBackend::SequenceScript
            } else {
                RewriteBackend::Direct
            },
            committer: Some(ctx.committer_identity()),
            push_remote: Some(self.remote.clone()),
        };

        match handler.apply(&plan.rewords, &opts)? {
            RewriteOutcome::Unchanged => {
                println!("✨ All pushed commit messages already match; nothing to rewrite.");
            }
            RewriteOutcome::Rewritten { new_head } => {
                println!(
                    "✅ Rewrote {} commit message(s) and force-pushed; new HEAD is {}",
                    plan.rewords.len(),
                    &new_head[..crate::git::SHORT_HASH_LEN.min(new_head.len())]
                );
            }
        }

        Ok(())
    }
}
