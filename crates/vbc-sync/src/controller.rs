//! The poll loop.
//!
//! One controller mirrors one account. After bootstrap it polls the account's
//! most recent posts on a fixed interval and publishes anything the ledger has
//! not seen. A post is recorded only after the destination accepted it, so a
//! crash between publish and record can produce a duplicate on restart.

use std::collections::HashMap;
use std::time::Duration;

use vbc_core::{Account, AccountNamespace, DestinationProfile, Post, PostId, PublishedRecord};
use vbc_ledger::{InsertResult, Ledger};

use crate::bootstrap::{bootstrap_account, BootstrapOutcome};
use crate::context::SyncContext;
use crate::destination::DestinationClient;
use crate::error::{PostError, Result, SyncError};
use crate::policy::{FailureAction, ResurfacePolicy, RetryPolicy};
use crate::publish::Publisher;
use crate::source::SourceClient;
use crate::transform::ContentTransformer;

/// Loop tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Base delay between polls.
    pub poll_interval: Duration,
    /// Number of recent posts fetched per poll.
    pub poll_limit: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            poll_limit: 1,
        }
    }
}

/// What one poll did.
#[derive(Debug, Default)]
pub struct PollReport {
    /// Posts returned by the source.
    pub fetched: usize,
    /// Posts skipped because the ledger already had them.
    pub already_mirrored: usize,
    /// Posts published and recorded during this poll.
    pub published: Vec<(PostId, PublishedRecord)>,
    /// Posts that failed; none of them were recorded.
    pub failed: Vec<(PostId, PostError)>,
}

impl PollReport {
    /// True if nothing was published and nothing failed.
    pub fn is_idle(&self) -> bool {
        self.published.is_empty() && self.failed.is_empty()
    }
}

/// Mirrors one source account to the destination.
pub struct SyncController<S, D, L, P = ResurfacePolicy> {
    ctx: SyncContext<S, D, L>,
    ns: AccountNamespace,
    account: Account,
    publisher: Publisher<D>,
    transformer: ContentTransformer,
    policy: P,
    config: SyncConfig,
    attempts: HashMap<PostId, u32>,
    consecutive_failures: u32,
}

impl<S, D, L> SyncController<S, D, L>
where
    S: SourceClient,
    D: DestinationClient,
    L: Ledger,
{
    /// Build a controller using [`ResurfacePolicy`].
    pub fn new(
        ctx: SyncContext<S, D, L>,
        ns: AccountNamespace,
        account: Account,
        profile: DestinationProfile,
        config: SyncConfig,
    ) -> Self {
        let publisher = Publisher::new(ctx.destination.clone(), profile);
        Self {
            ctx,
            ns,
            account,
            publisher,
            transformer: ContentTransformer::new(),
            policy: ResurfacePolicy,
            config,
            attempts: HashMap::new(),
            consecutive_failures: 0,
        }
    }
}

impl<S, D, L, P> SyncController<S, D, L, P>
where
    S: SourceClient,
    D: DestinationClient,
    L: Ledger,
    P: RetryPolicy,
{
    /// Swap the retry policy.
    pub fn with_policy<Q: RetryPolicy>(self, policy: Q) -> SyncController<S, D, L, Q> {
        SyncController {
            ctx: self.ctx,
            ns: self.ns,
            account: self.account,
            publisher: self.publisher,
            transformer: self.transformer,
            policy,
            config: self.config,
            attempts: self.attempts,
            consecutive_failures: self.consecutive_failures,
        }
    }

    pub fn namespace(&self) -> &AccountNamespace {
        &self.ns
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Seed the ledger for this account if needed.
    pub async fn bootstrap(&self) -> Result<BootstrapOutcome> {
        bootstrap_account(&self.ctx, &self.ns, &self.account).await
    }

    /// Run one poll: fetch recent posts and mirror the ones not yet recorded.
    ///
    /// Per-post failures are reported, not returned. Errors are fatal: the
    /// source could not be read or the ledger failed.
    pub async fn poll_once(&mut self) -> Result<PollReport> {
        let posts = self
            .ctx
            .source
            .get_recent_posts(self.account.id, self.config.poll_limit)
            .await
            .map_err(SyncError::PollFetch)?;

        // Attempts are only tracked for posts still in the recent window.
        self.attempts.retain(|id, _| posts.iter().any(|post| post.id == *id));

        let mut report = PollReport {
            fetched: posts.len(),
            ..PollReport::default()
        };

        for post in posts {
            if self.ctx.ledger.exists(&self.ns, post.id).await? {
                report.already_mirrored += 1;
                continue;
            }

            match self.mirror(&post).await {
                Ok(record) => {
                    if self.ctx.ledger.put(&self.ns, post.id, &record).await?
                        == InsertResult::AlreadyExists
                    {
                        tracing::warn!(
                            post = %post.id,
                            "post was recorded concurrently; keeping existing record"
                        );
                    }
                    self.attempts.remove(&post.id);
                    report.published.push((post.id, record));
                }
                Err(e) => {
                    let attempts = self.attempts.entry(post.id).or_insert(0);
                    *attempts += 1;
                    let attempts = *attempts;

                    tracing::error!(
                        post = %post.id,
                        url = %post.display_url(),
                        attempts,
                        error = %e,
                        "failed to mirror post"
                    );
                    let action = self.policy.on_failure(&post, &e, attempts);
                    report.failed.push((post.id, e));

                    if action == FailureAction::AbortIteration {
                        break;
                    }
                }
            }
        }

        if report.failed.is_empty() {
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        }

        Ok(report)
    }

    /// Bootstrap, then poll forever.
    ///
    /// Only returns on a fatal error.
    pub async fn run(&mut self) -> Result<()> {
        self.bootstrap().await?;
        tracing::info!(
            namespace = %self.ns,
            interval_ms = self.config.poll_interval.as_millis() as u64,
            "starting poll loop"
        );

        loop {
            let report = self.poll_once().await?;
            if !report.is_idle() {
                tracing::debug!(
                    fetched = report.fetched,
                    published = report.published.len(),
                    failed = report.failed.len(),
                    "poll finished"
                );
            }

            let delay = self
                .policy
                .next_delay(self.config.poll_interval, self.consecutive_failures);
            tokio::time::sleep(delay).await;
        }
    }

    async fn mirror(&self, post: &Post) -> std::result::Result<PublishedRecord, PostError> {
        let text = self.transformer.transform(post)?;
        let record = self.publisher.publish(&text, post.created_at).await?;
        Ok(record)
    }
}
