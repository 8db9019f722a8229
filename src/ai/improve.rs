//! Chunked, rate-limited message improvement pipeline.
//!
//! Converts an ordered sequence of commit diffs into an equally ordered
//! sequence of improved messages. Requests within a chunk run
//! concurrently; chunks run strictly sequentially with a jittered pause
//! between them. A failed chunk is retried from its starting offset
//! after a long cooldown, so a transient rate limit never costs more
//! than the failed chunk's work.

use std::time::Duration;

use anyhow::Result;
use futures::future::try_join_all;
use rand::Rng;
use tracing::{info, warn};

use crate::ai::batch::{plan_chunks, ParitySizing, SizePolicy};
use crate::ai::error::GeneratorError;
use crate::ai::MessageGenerator;
use crate::data::{DiffRecord, ImprovedMessage};

/// Cooldown before retrying a failed chunk, in milliseconds.
///
/// The backend's minimum rate-limit window, before jitter.
const FAILURE_COOLDOWN_MS: u64 = 60_000;

/// Retry behavior for a failing chunk.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryPolicy {
    /// Maximum attempts per chunk. `None` retries indefinitely.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Retry each failing chunk at most `max_attempts` times in total.
    pub fn bounded(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
        }
    }
}

/// The chunked improvement pipeline.
pub struct MessageImprover {
    generator: Box<dyn MessageGenerator>,
    policy: Box<dyn SizePolicy>,
    retry: RetryPolicy,
}

impl MessageImprover {
    /// Creates an improver with the default sizing policy and unbounded
    /// retry.
    pub fn new(generator: Box<dyn MessageGenerator>) -> Self {
        Self {
            generator,
            policy: Box::new(ParitySizing),
            retry: RetryPolicy::default(),
        }
    }

    /// Replaces the chunk sizing policy.
    pub fn with_policy(mut self, policy: Box<dyn SizePolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Generates one improved message per input record.
    ///
    /// The output sequence has the same length and the same
    /// index-to-id correspondence as the input, regardless of chunk
    /// size or request completion order.
    pub async fn improve(&self, records: &[DiffRecord]) -> Result<Vec<ImprovedMessage>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let chunk_size = self.policy.chunk_size(records.len());
        let spans = plan_chunks(records.len(), chunk_size);
        let mut improved: Vec<ImprovedMessage> = Vec::with_capacity(records.len());

        for (chunk_index, span) in spans.iter().enumerate() {
            let chunk = &records[span.clone()];
            let messages = self.improve_chunk(chunk).await?;

            // try_join_all preserves input order, so zipping restores
            // each result to its original slot
            improved.extend(
                chunk
                    .iter()
                    .zip(messages)
                    .map(|(record, message)| ImprovedMessage {
                        id: record.id.clone(),
                        message,
                    }),
            );

            info!(
                improved = improved.len(),
                total = records.len(),
                "Improved {}/{} commit messages",
                improved.len(),
                records.len()
            );

            if chunk_index + 1 < spans.len() {
                let pause = inter_chunk_delay_ms();
                info!(sleep_ms = pause, "Pausing between request chunks");
                tokio::time::sleep(Duration::from_millis(pause)).await;
            }
        }

        Ok(improved)
    }

    /// Runs one chunk's requests, retrying the whole chunk on failure.
    ///
    /// Partial results from a failed attempt are discarded; every retry
    /// re-issues the full span.
    async fn improve_chunk(&self, chunk: &[DiffRecord]) -> Result<Vec<String>> {
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;

            let requests = chunk.iter().map(|record| self.generator.generate(&record.diff));
            match try_join_all(requests).await {
                Ok(messages) => return Ok(messages),
                Err(err) => {
                    let rate_limited = matches!(
                        err.downcast_ref::<GeneratorError>(),
                        Some(GeneratorError::RateLimited)
                    );

                    if let Some(max) = self.retry.max_attempts {
                        if attempts >= max {
                            return Err(GeneratorError::RetryLimitExceeded {
                                attempts,
                                last_error: err.to_string(),
                            }
                            .into());
                        }
                    }

                    let cooldown = failure_cooldown_ms();
                    if rate_limited {
                        warn!(
                            attempt = attempts,
                            sleep_ms = cooldown,
                            "Rate limited; cooling down before retrying chunk"
                        );
                    } else {
                        warn!(
                            attempt = attempts,
                            sleep_ms = cooldown,
                            error = %err,
                            "Chunk failed; cooling down before retrying"
                        );
                    }
                    tokio::time::sleep(Duration::from_millis(cooldown)).await;
                }
            }
        }
    }
}

/// Jittered pause between successful chunks, in milliseconds.
///
/// `1000·U(1,5) + 100·U(1,5)` with independent draws; an anti-burst
/// measure, not a correctness requirement.
fn inter_chunk_delay_ms() -> u64 {
    let mut rng = rand::thread_rng();
    1_000 * rng.gen_range(1..=5) + 100 * rng.gen_range(1..=5)
}

/// Long cooldown after a failed chunk, in milliseconds.
fn failure_cooldown_ms() -> u64 {
    let mut rng = rand::thread_rng();
    FAILURE_COOLDOWN_MS + 1_000 * rng.gen_range(1..=5)
}
