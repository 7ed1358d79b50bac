//! Ledger trait: the abstract interface for dedupe persistence.
//!
//! This trait keeps the sync engine storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use vbc_core::{AccountNamespace, AppCredentials, InstanceName, LedgerEntry, PostId, PublishedRecord};

use crate::error::Result;

/// Result of recording a published post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// The entry was written.
    Inserted,
    /// An entry already exists for this post; it was left untouched.
    AlreadyExists,
}

/// Result of bootstrapping an account namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapResult {
    /// The namespace was created together with `inserted` sentinel entries.
    Committed { inserted: usize },
    /// The namespace already existed; nothing was written.
    AlreadyBootstrapped,
}

/// The Ledger trait: async interface for the dedupe store.
///
/// Every method runs in its own short-lived transaction. Methods scoped to an
/// account validate that the account namespace exists inside that same
/// transaction and return [`LedgerError::NamespaceMissing`] otherwise.
///
/// # Design Notes
///
/// - **Write-once entries**: `put` never overwrites. A second `put` for the
///   same post returns `AlreadyExists`.
/// - **Atomic bootstrap**: the namespace and all of its sentinels are created
///   in one transaction, so a partially bootstrapped account is never visible.
/// - **No network inside transactions**: callers fetch before and publish
///   outside of any ledger call.
///
/// [`LedgerError::NamespaceMissing`]: crate::LedgerError::NamespaceMissing
#[async_trait]
pub trait Ledger: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Namespace Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Check whether the account namespace has been created.
    async fn has_namespace(&self, ns: &AccountNamespace) -> Result<bool>;

    /// Create the account namespace seeded with a sentinel for every post.
    ///
    /// Idempotent: if the namespace exists, returns `AlreadyBootstrapped`
    /// without touching it.
    async fn bootstrap(&self, ns: &AccountNamespace, posts: &[PostId]) -> Result<BootstrapResult>;

    // ─────────────────────────────────────────────────────────────────────────
    // Entry Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Check if the ledger has an entry (sentinel or record) for a post.
    async fn exists(&self, ns: &AccountNamespace, post: PostId) -> Result<bool>;

    /// Get the entry for a post.
    async fn get(&self, ns: &AccountNamespace, post: PostId) -> Result<Option<LedgerEntry>>;

    /// Record that a post was mirrored.
    async fn put(
        &self,
        ns: &AccountNamespace,
        post: PostId,
        record: &PublishedRecord,
    ) -> Result<InsertResult>;

    /// Number of entries in the namespace.
    async fn entry_count(&self, ns: &AccountNamespace) -> Result<u64>;

    /// All entries in the namespace, ordered by post ID.
    async fn entries(&self, ns: &AccountNamespace) -> Result<Vec<(PostId, LedgerEntry)>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Instance Operations (reserved keys)
    // ─────────────────────────────────────────────────────────────────────────

    /// Load the registered application credentials for an instance.
    ///
    /// Returns `None` unless both the ID and the secret are stored.
    async fn load_credentials(&self, instance: &InstanceName) -> Result<Option<AppCredentials>>;

    /// Persist application credentials under the instance's reserved keys.
    async fn store_credentials(
        &self,
        instance: &InstanceName,
        credentials: &AppCredentials,
    ) -> Result<()>;
}

/// Extension trait for common ledger patterns.
pub trait LedgerExt: Ledger {
    /// Get the published record for a post, if it was mirrored.
    ///
    /// Sentinels and absent posts both yield `None`.
    fn published_record(
        &self,
        ns: &AccountNamespace,
        post: PostId,
    ) -> impl std::future::Future<Output = Result<Option<PublishedRecord>>> + Send;
}

impl<L: Ledger + ?Sized> LedgerExt for L {
    async fn published_record(
        &self,
        ns: &AccountNamespace,
        post: PostId,
    ) -> Result<Option<PublishedRecord>> {
        Ok(match self.get(ns, post).await? {
            Some(LedgerEntry::Published(record)) => Some(record),
            Some(LedgerEntry::Sentinel) | None => None,
        })
    }
}
