//! Retry policies for posts that fail to mirror.

use std::time::Duration;

use rand::Rng;
use vbc_core::Post;

use crate::error::PostError;

/// What the poll loop does after a post fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// Stop processing the current batch; the post is retried next poll.
    AbortIteration,
    /// Move on to the next post in the batch.
    ContinueBatch,
}

/// Decides how the poll loop reacts to per-post failures.
///
/// Failed posts are never recorded, so whatever the policy says they come back
/// on a later poll. The policy only controls the rest of the batch and how
/// long to wait before polling again.
pub trait RetryPolicy: Send + Sync {
    /// Called once per failure. `attempts` counts failures of this post so
    /// far, including this one.
    fn on_failure(&self, post: &Post, error: &PostError, attempts: u32) -> FailureAction;

    /// Delay before the next poll, given how many polls in a row had at least
    /// one failure.
    fn next_delay(&self, interval: Duration, consecutive_failures: u32) -> Duration;
}

/// Abort the batch on the first failure and poll again after the fixed
/// interval, forever.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResurfacePolicy;

impl RetryPolicy for ResurfacePolicy {
    fn on_failure(&self, _post: &Post, _error: &PostError, _attempts: u32) -> FailureAction {
        FailureAction::AbortIteration
    }

    fn next_delay(&self, interval: Duration, _consecutive_failures: u32) -> Duration {
        interval
    }
}

/// Exponential backoff with random jitter, capped at `max_delay`.
///
/// Replies and attachment posts are skipped over within a batch since retrying
/// them cannot succeed. Publish failures still abort the batch.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    max_delay: Duration,
    jitter: f64,
}

impl BackoffPolicy {
    /// Jitter defaults to ±20%.
    pub fn new(max_delay: Duration) -> Self {
        Self {
            max_delay,
            jitter: 0.2,
        }
    }

    /// Set the jitter fraction, clamped to `0.0..=1.0`.
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }
}

impl RetryPolicy for BackoffPolicy {
    fn on_failure(&self, post: &Post, error: &PostError, attempts: u32) -> FailureAction {
        match error {
            PostError::Unsupported(_) => {
                tracing::debug!(post = %post.id, attempts, "skipping unsupported post");
                FailureAction::ContinueBatch
            }
            PostError::Publish(_) => FailureAction::AbortIteration,
        }
    }

    fn next_delay(&self, interval: Duration, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return interval;
        }

        let factor = 1u32 << consecutive_failures.min(16);
        let base = interval.saturating_mul(factor).min(self.max_delay);
        if self.jitter == 0.0 {
            return base;
        }

        let scale = rand::thread_rng().gen_range(1.0 - self.jitter..=1.0 + self.jitter);
        Duration::try_from_secs_f64(base.as_secs_f64() * scale)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}
