//! AI message generation for commit diffs.

pub mod batch;
pub mod client;
pub mod error;
pub mod improve;
pub mod prompts;
#[cfg(test)]
pub(crate) mod test_utils;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;

pub use client::ClaudeGenerator;
pub use error::GeneratorError;
pub use improve::{MessageImprover, RetryPolicy};

/// HTTP request timeout for generation API calls.
///
/// Long enough for large diffs and slow model responses while still
/// preventing indefinite hangs.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Metadata about a generator implementation.
#[derive(Clone, Debug)]
pub struct GeneratorMetadata {
    /// Service provider name.
    pub provider: String,
    /// Model identifier.
    pub model: String,
}

/// Options controlling the shape of generated messages.
///
/// Resolved once at the CLI boundary (flags, then environment, then
/// settings file) and passed into the generator constructor; the
/// pipeline never reads configuration from ambient state.
#[derive(Clone, Debug)]
pub struct GenerationOptions {
    /// Language the message should be written in.
    pub language: String,
    /// Prefix the message subject with a GitMoji.
    pub emoji: bool,
    /// Follow the subject with a short body describing the change.
    pub describe: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            language: "english".to_string(),
            emoji: false,
            describe: false,
        }
    }
}

impl GenerationOptions {
    /// Resolves options from the environment (with settings-file fallback).
    ///
    /// Recognized variables: `RECOMMIT_LANGUAGE`, `RECOMMIT_EMOJI`,
    /// `RECOMMIT_DESCRIPTION` (the latter two parsed as `"true"`).
    pub fn from_env() -> Self {
        use crate::utils::settings::get_env_var;

        let defaults = Self::default();
        Self {
            language: get_env_var("RECOMMIT_LANGUAGE").unwrap_or(defaults.language),
            emoji: get_env_var("RECOMMIT_EMOJI")
                .map(|v| v == "true")
                .unwrap_or(defaults.emoji),
            describe: get_env_var("RECOMMIT_DESCRIPTION")
                .map(|v| v == "true")
                .unwrap_or(defaults.describe),
        }
    }
}

/// Trait for message generation backends.
///
/// Given a patch-format diff, produce a candidate commit message. May
/// fail transiently; rate limiting must surface as
/// [`GeneratorError::RateLimited`] so the pipeline can back off on it.
pub trait MessageGenerator: Send + Sync {
    /// Generates a commit message for a single diff.
    fn generate<'a>(
        &'a self,
        diff: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

    /// Returns metadata about the generator implementation.
    fn metadata(&self) -> GeneratorMetadata;
}

/// Builds an HTTP client with the standard request timeout.
pub(crate) fn build_http_client() -> Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")
}

/// Creates the default generator from environment credentials.
pub fn create_generator(
    model: Option<String>,
    options: GenerationOptions,
) -> Result<Box<dyn MessageGenerator>> {
    let generator = ClaudeGenerator::from_env(model, options)?;
    Ok(Box::new(generator))
}
