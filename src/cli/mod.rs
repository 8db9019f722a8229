//! CLI interface for recommit

use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod action;
pub mod improve;

pub use action::ActionCommand;
pub use improve::ImproveCommand;

/// recommit: rewrite git history with AI-improved commit messages
#[derive(Parser)]
#[command(name = "recommit")]
#[command(about = "Rewrites git history with AI-improved commit messages", long_about = None)]
#[command(version)]
pub struct Cli {
    /// The main command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Main command categories
#[derive(Subcommand)]
pub enum Commands {
    /// Improves commit messages for a local commit range.
    Improve(ImproveCommand),
    /// Improves the commits of a CI push event, driven by environment.
    Action(ActionCommand),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Improve(improve_cmd) => improve_cmd.execute().await,
            Commands::Action(action_cmd) => action_cmd.execute().await,
        }
    }
}
