//! Destination platform abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use vbc_core::{DestinationProfile, PublishedRecord};

use crate::error::ClientError;

/// Result type for destination operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Write access to the destination platform.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait DestinationClient: Send + Sync {
    /// Resolve the operator's profile by handle.
    async fn resolve_profile(&self, handle: &str) -> Result<DestinationProfile>;

    /// Create one post under `profile`. Not idempotent: every successful call
    /// creates a new record.
    async fn create_post(
        &self,
        profile: &DestinationProfile,
        text: &str,
        created_at: DateTime<Utc>,
    ) -> Result<PublishedRecord>;
}

/// A recording in-memory destination for testing.
pub mod memory {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// A post accepted by [`MemoryDestination`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct CreatedPost {
        pub repo: String,
        pub text: String,
        pub created_at: DateTime<Utc>,
        pub record: PublishedRecord,
    }

    #[derive(Default)]
    struct Inner {
        profiles: HashMap<String, DestinationProfile>,
        created: Vec<CreatedPost>,
        attempts: usize,
        next_failures: VecDeque<ClientError>,
    }

    /// In-memory destination implementation.
    ///
    /// Records every accepted post and hands out sequential record IDs.
    #[derive(Default)]
    pub struct MemoryDestination {
        inner: Mutex<Inner>,
    }

    impl MemoryDestination {
        /// Create a destination with no profiles.
        pub fn new() -> Self {
            Self::default()
        }

        /// Register a profile that `resolve_profile` can find.
        pub fn add_profile(&self, profile: DestinationProfile) {
            self.inner
                .lock()
                .unwrap()
                .profiles
                .insert(profile.handle.clone(), profile);
        }

        /// Fail the next `create_post` call with `error`. Queued failures are
        /// consumed in order.
        pub fn fail_next(&self, error: ClientError) {
            self.inner.lock().unwrap().next_failures.push_back(error);
        }

        /// Posts accepted so far, oldest first.
        pub fn created(&self) -> Vec<CreatedPost> {
            self.inner.lock().unwrap().created.clone()
        }

        /// Number of `create_post` calls, including failed ones.
        pub fn create_attempts(&self) -> usize {
            self.inner.lock().unwrap().attempts
        }
    }

    #[async_trait]
    impl DestinationClient for MemoryDestination {
        async fn resolve_profile(&self, handle: &str) -> Result<DestinationProfile> {
            let inner = self.inner.lock().unwrap();
            inner
                .profiles
                .get(handle)
                .cloned()
                .ok_or_else(|| ClientError::NotFound(format!("profile @{}", handle)))
        }

        async fn create_post(
            &self,
            profile: &DestinationProfile,
            text: &str,
            created_at: DateTime<Utc>,
        ) -> Result<PublishedRecord> {
            let mut inner = self.inner.lock().unwrap();
            inner.attempts += 1;

            if let Some(error) = inner.next_failures.pop_front() {
                return Err(error);
            }

            let n = inner.created.len() + 1;
            let record = PublishedRecord::new(
                format!("bafymemory{:04}", n),
                format!("at://{}/app.bsky.feed.post/{:04}", profile.did, n),
            );
            inner.created.push(CreatedPost {
                repo: profile.did.clone(),
                text: text.to_string(),
                created_at,
                record: record.clone(),
            });

            Ok(record)
        }
    }
}
