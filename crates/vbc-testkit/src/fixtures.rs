//! Test fixtures and helpers.
//!
//! Common setup code for sync and end-to-end tests.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use vbc_core::{
    Account, AccountId, AccountNamespace, DestinationProfile, InstanceName, Post, PostId,
};
use vbc_ledger::MemoryLedger;
use vbc_sync::destination::memory::MemoryDestination;
use vbc_sync::source::memory::MemorySource;
use vbc_sync::{SyncConfig, SyncContext, SyncController};

/// Instance every fixture lives on.
pub const INSTANCE: &str = "https://tiggi.es";

/// A source account, a destination profile and in-memory collaborators.
///
/// The collaborators are shared, so tests can keep scripting the source and
/// inspecting the destination and ledger after handing a context out.
pub struct TestFixture {
    pub account: Account,
    pub namespace: AccountNamespace,
    pub profile: DestinationProfile,
    pub source: Arc<MemorySource>,
    pub destination: Arc<MemoryDestination>,
    pub ledger: Arc<MemoryLedger>,
}

impl TestFixture {
    /// Create a fixture for account 42 (`@mbr`).
    pub fn new() -> Self {
        Self::for_account(AccountId(42), "mbr")
    }

    /// Create a fixture for a specific account.
    pub fn for_account(id: AccountId, handle: &str) -> Self {
        let account = Account {
            id,
            handle: handle.to_string(),
        };
        let profile = DestinationProfile {
            did: format!("did:plc:{}", handle),
            handle: format!("{}.bsky.social", handle),
        };

        let source = Arc::new(MemorySource::new());
        source.add_account(account.clone());
        let destination = Arc::new(MemoryDestination::new());
        destination.add_profile(profile.clone());

        Self {
            namespace: AccountNamespace::new(instance(), id),
            account,
            profile,
            source,
            destination,
            ledger: Arc::new(MemoryLedger::new()),
        }
    }

    /// A context sharing this fixture's collaborators.
    pub fn context(&self) -> SyncContext<MemorySource, MemoryDestination, MemoryLedger> {
        SyncContext::from_shared(
            self.source.clone(),
            self.destination.clone(),
            self.ledger.clone(),
        )
    }

    /// A controller with a short poll interval and the given poll limit.
    pub fn controller(
        &self,
        poll_limit: usize,
    ) -> SyncController<MemorySource, MemoryDestination, MemoryLedger> {
        let config = SyncConfig {
            poll_interval: Duration::from_millis(10),
            poll_limit,
        };
        SyncController::new(
            self.context(),
            self.namespace.clone(),
            self.account.clone(),
            self.profile.clone(),
            config,
        )
    }

    /// Publish a plain post on the source and return it.
    pub fn post(&self, id: i64) -> Post {
        self.push(make_post(id))
    }

    /// Publish a reply on the source and return it.
    pub fn reply(&self, id: i64) -> Post {
        self.push(make_reply(id))
    }

    /// Publish a post carrying `attachments` media items and return it.
    pub fn post_with_media(&self, id: i64, attachments: usize) -> Post {
        self.push(Post {
            attachment_count: attachments,
            ..make_post(id)
        })
    }

    /// Publish `count` plain posts with IDs `1..=count`.
    pub fn history(&self, count: i64) -> Vec<Post> {
        (1..=count).map(|id| self.post(id)).collect()
    }

    fn push(&self, post: Post) -> Post {
        self.source.publish(self.account.id, post.clone());
        post
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// The canonical fixture instance.
pub fn instance() -> InstanceName {
    InstanceName::canonicalize(INSTANCE).expect("fixture instance is a valid URL")
}

/// Deterministic creation time for post `id`.
pub fn created_at(id: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + id.rem_euclid(1_000_000), 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// A plain post with text `post {id}` wrapped in a paragraph.
pub fn make_post(id: i64) -> Post {
    Post {
        id: PostId(id),
        created_at: created_at(id),
        content: format!("<p>post {}</p>", id),
        url: Some(format!("{}/@mbr/{}", INSTANCE, id)),
        in_reply_to: None,
        attachment_count: 0,
    }
}

/// A reply to post `id - 1`.
pub fn make_reply(id: i64) -> Post {
    Post {
        in_reply_to: Some(PostId(id - 1)),
        ..make_post(id)
    }
}
