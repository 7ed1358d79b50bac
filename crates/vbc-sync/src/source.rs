//! Source platform abstraction.
//!
//! The sync engine only ever reads from the source: the mirrored account, its
//! full history (once, at bootstrap) and its most recent posts (every poll).

use async_trait::async_trait;
use vbc_core::{Account, AccountId, Post};

use crate::error::ClientError;

/// Result type for source operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Read access to the source platform.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Look up an account by ID.
    async fn get_account(&self, id: AccountId) -> Result<Account>;

    /// Fetch every post the account has made, following pagination to the
    /// end. Most recent first.
    async fn get_post_history(&self, account: AccountId) -> Result<Vec<Post>>;

    /// Fetch up to `limit` of the account's most recent posts, most recent
    /// first.
    async fn get_recent_posts(&self, account: AccountId, limit: usize) -> Result<Vec<Post>>;
}

/// A scripted in-memory source for testing.
///
/// Posts are added with [`MemorySource::publish`] and served most recent
/// first. Fetches can be made to fail and are counted.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Inner {
        accounts: HashMap<AccountId, Account>,
        posts: HashMap<AccountId, Vec<Post>>,
        history_fetches: usize,
        recent_fetches: usize,
        history_failure: Option<ClientError>,
        recent_failure: Option<ClientError>,
    }

    /// In-memory source implementation.
    #[derive(Default)]
    pub struct MemorySource {
        inner: Mutex<Inner>,
    }

    impl MemorySource {
        /// Create an empty source.
        pub fn new() -> Self {
            Self::default()
        }

        /// Register an account.
        pub fn add_account(&self, account: Account) {
            let mut inner = self.inner.lock().unwrap();
            inner.posts.entry(account.id).or_default();
            inner.accounts.insert(account.id, account);
        }

        /// Make a post visible on the account's timeline.
        pub fn publish(&self, account: AccountId, post: Post) {
            let mut inner = self.inner.lock().unwrap();
            let posts = inner.posts.entry(account).or_default();
            posts.push(post);
            posts.sort_by(|a, b| b.id.cmp(&a.id));
        }

        /// Make every history fetch fail with `error` (or succeed again with `None`).
        pub fn fail_history(&self, error: Option<ClientError>) {
            self.inner.lock().unwrap().history_failure = error;
        }

        /// Make every recent-posts fetch fail with `error` (or succeed again with `None`).
        pub fn fail_recent(&self, error: Option<ClientError>) {
            self.inner.lock().unwrap().recent_failure = error;
        }

        /// Number of history fetches attempted so far.
        pub fn history_fetches(&self) -> usize {
            self.inner.lock().unwrap().history_fetches
        }

        /// Number of recent-posts fetches attempted so far.
        pub fn recent_fetches(&self) -> usize {
            self.inner.lock().unwrap().recent_fetches
        }
    }

    #[async_trait]
    impl SourceClient for MemorySource {
        async fn get_account(&self, id: AccountId) -> Result<Account> {
            let inner = self.inner.lock().unwrap();
            inner
                .accounts
                .get(&id)
                .cloned()
                .ok_or_else(|| ClientError::NotFound(format!("account {}", id)))
        }

        async fn get_post_history(&self, account: AccountId) -> Result<Vec<Post>> {
            let mut inner = self.inner.lock().unwrap();
            inner.history_fetches += 1;

            if let Some(error) = &inner.history_failure {
                return Err(error.clone());
            }
            Ok(inner.posts.get(&account).cloned().unwrap_or_default())
        }

        async fn get_recent_posts(&self, account: AccountId, limit: usize) -> Result<Vec<Post>> {
            let mut inner = self.inner.lock().unwrap();
            inner.recent_fetches += 1;

            if let Some(error) = &inner.recent_failure {
                return Err(error.clone());
            }
            Ok(inner
                .posts
                .get(&account)
                .map(|posts| posts.iter().take(limit).cloned().collect())
                .unwrap_or_default())
        }
    }
}
