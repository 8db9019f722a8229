//! Generator-specific error handling.

use thiserror::Error;

/// Message generation errors.
#[derive(Error, Debug)]
pub enum GeneratorError {
    /// API key not found in environment variables.
    #[error("API key not found. Set RECOMMIT_API_KEY or ANTHROPIC_API_KEY environment variable")]
    ApiKeyNotFound,

    /// API request failed with error message.
    #[error("Generation request failed: {0}")]
    RequestFailed(String),

    /// The backend reported too many requests.
    ///
    /// Kept distinct from [`RequestFailed`](Self::RequestFailed) so the
    /// pipeline can report rate-limit cooldowns separately from other
    /// failures.
    #[error("Rate limit exceeded. Backing off before retrying")]
    RateLimited,

    /// Invalid response format from the API.
    #[error("Invalid response format from generation API: {0}")]
    InvalidResponseFormat(String),

    /// Network connectivity error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The configured retry bound was exhausted for a chunk.
    #[error("Gave up on chunk after {attempts} attempts: {last_error}")]
    RetryLimitExceeded {
        /// Number of attempts made on the failing chunk.
        attempts: u32,
        /// The error returned by the final attempt.
        last_error: String,
    },
}

// Note: anyhow already has a blanket impl for thiserror::Error types
