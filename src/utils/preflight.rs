//! Preflight validation checks for early failure detection
//!
//! This module provides functions to validate required state and
//! credentials before starting expensive operations. Commands should
//! call these checks early to fail fast with clear error messages.

use anyhow::{bail, Context, Result};

use crate::git::GitRepository;

/// Result of generator credential validation.
#[derive(Debug)]
pub struct GeneratorInfo {
    /// The provider that will be used.
    pub provider: String,
    /// The model that will be used.
    pub model: String,
}

/// Validate generator credentials are available before processing
///
/// This performs a lightweight check of environment variables without
/// creating a full client. Use this at the start of commands that
/// require message generation to fail fast if credentials are missing.
pub fn check_generator_credentials(model_override: Option<&str>) -> Result<GeneratorInfo> {
    use crate::utils::settings::{get_env_var, get_env_vars};

    get_env_vars(&["RECOMMIT_API_KEY", "ANTHROPIC_API_KEY", "CLAUDE_API_KEY"]).map_err(|_| {
        anyhow::anyhow!(
            "Generation API key not found.\n\
             Set one of these environment variables:\n\
             - RECOMMIT_API_KEY\n\
             - ANTHROPIC_API_KEY\n\
             - CLAUDE_API_KEY"
        )
    })?;

    let model = model_override
        .map(String::from)
        .or_else(|| get_env_var("RECOMMIT_MODEL").ok())
        .unwrap_or_else(|| "claude-3-5-haiku-20241022".to_string());

    Ok(GeneratorInfo {
        provider: "Anthropic".to_string(),
        model,
    })
}

/// Validate we're in a valid git repository
///
/// This is a lightweight check that opens the repository without
/// loading any commit data.
pub fn check_git_repository<P: AsRef<std::path::Path>>(path: P) -> Result<()> {
    GitRepository::open_at(path).context(
        "Not in a git repository. Please run this command from within a git repository.",
    )?;
    Ok(())
}

/// Validate working directory is clean (no uncommitted changes)
///
/// Use this before operations that rewrite history; a dirty tree would
/// be clobbered or block the rebase midway.
pub fn check_working_directory_clean<P: AsRef<std::path::Path>>(path: P) -> Result<()> {
    let repo = GitRepository::open_at(path).context("Failed to open git repository")?;

    if !repo
        .is_working_directory_clean()
        .context("Failed to get working directory status")?
    {
        bail!(
            "Working directory has uncommitted changes.\n\
             Please commit or stash your changes before proceeding."
        );
    }

    Ok(())
}

/// Refuse to start over a repository stuck mid-rebase
///
/// A previous rewrite that failed leaves an in-progress rebase and its
/// temporary files behind. Starting another rewrite on top would make
/// the state unrecoverable, so the operator has to resolve it first.
pub fn check_no_rebase_in_progress<P: AsRef<std::path::Path>>(path: P) -> Result<()> {
    let repo = GitRepository::open_at(path).context("Failed to open git repository")?;

    let state = repo.repository().state();
    if state != git2::RepositoryState::Clean {
        bail!(
            "Repository is in state {:?}, likely from an interrupted rewrite.\n\
             Run 'git rebase --abort' (or finish the rebase) and remove any leftover \
             commit-*.txt, count.txt, and reword.sh files, then retry.",
            state
        );
    }

    Ok(())
}

/// Combined preflight check for rewrite commands
///
/// Validates:
/// - Git repository access
/// - No rebase already in progress
/// - Clean working directory
/// - Generator credentials
///
/// Returns information about the generator that will be used.
pub fn check_rewrite_prerequisites<P: AsRef<std::path::Path>>(
    path: P,
    model_override: Option<&str>,
) -> Result<GeneratorInfo> {
    let path = path.as_ref();
    check_git_repository(path)?;
    check_no_rebase_in_progress(path)?;
    check_working_directory_clean(path)?;
    check_generator_credentials(model_override)
}
