//! In-memory implementation of the Ledger trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence. Values are kept in
//! their encoded form so decoding paths are exercised the same way.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use vbc_core::record::{APP_ID_KEY, APP_SECRET_KEY};
use vbc_core::{AccountNamespace, AppCredentials, InstanceName, LedgerEntry, PostId, PublishedRecord};

use crate::error::{LedgerError, Result};
use crate::traits::{BootstrapResult, InsertResult, Ledger};

/// In-memory ledger implementation.
///
/// All data is lost when the ledger is dropped. Thread-safe via RwLock.
pub struct MemoryLedger {
    inner: RwLock<HashMap<InstanceName, InstanceBucket>>,
}

#[derive(Default)]
struct InstanceBucket {
    /// Reserved keys.
    keys: HashMap<Vec<u8>, Vec<u8>>,

    /// Account namespaces: account key -> (post key -> value).
    accounts: HashMap<Vec<u8>, BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryLedger {
    /// Create a new empty in-memory ledger.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn account<'a>(
    buckets: &'a HashMap<InstanceName, InstanceBucket>,
    ns: &AccountNamespace,
) -> Result<&'a BTreeMap<Vec<u8>, Vec<u8>>> {
    buckets
        .get(&ns.instance)
        .and_then(|bucket| bucket.accounts.get(&ns.account_key()))
        .ok_or_else(|| LedgerError::NamespaceMissing(ns.clone()))
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn has_namespace(&self, ns: &AccountNamespace) -> Result<bool> {
        let inner = self.inner.read().unwrap();
        Ok(account(&inner, ns).is_ok())
    }

    async fn bootstrap(&self, ns: &AccountNamespace, posts: &[PostId]) -> Result<BootstrapResult> {
        let sentinel = LedgerEntry::Sentinel.to_value()?;
        let mut inner = self.inner.write().unwrap();
        let bucket = inner.entry(ns.instance.clone()).or_default();

        if bucket.accounts.contains_key(&ns.account_key()) {
            return Ok(BootstrapResult::AlreadyBootstrapped);
        }

        let mut entries = BTreeMap::new();
        for post in posts {
            entries.insert(post.to_key(), sentinel.clone());
        }
        let inserted = entries.len();
        bucket.accounts.insert(ns.account_key(), entries);

        Ok(BootstrapResult::Committed { inserted })
    }

    async fn exists(&self, ns: &AccountNamespace, post: PostId) -> Result<bool> {
        let inner = self.inner.read().unwrap();
        Ok(account(&inner, ns)?.contains_key(&post.to_key()))
    }

    async fn get(&self, ns: &AccountNamespace, post: PostId) -> Result<Option<LedgerEntry>> {
        let inner = self.inner.read().unwrap();
        account(&inner, ns)?
            .get(&post.to_key())
            .map(|value| LedgerEntry::from_value(value).map_err(LedgerError::from))
            .transpose()
    }

    async fn put(
        &self,
        ns: &AccountNamespace,
        post: PostId,
        record: &PublishedRecord,
    ) -> Result<InsertResult> {
        let value = LedgerEntry::Published(record.clone()).to_value()?;
        let mut inner = self.inner.write().unwrap();

        let entries = inner
            .get_mut(&ns.instance)
            .and_then(|bucket| bucket.accounts.get_mut(&ns.account_key()))
            .ok_or_else(|| LedgerError::NamespaceMissing(ns.clone()))?;

        let key = post.to_key();
        if entries.contains_key(&key) {
            return Ok(InsertResult::AlreadyExists);
        }
        entries.insert(key, value);

        Ok(InsertResult::Inserted)
    }

    async fn entry_count(&self, ns: &AccountNamespace) -> Result<u64> {
        let inner = self.inner.read().unwrap();
        Ok(account(&inner, ns)?.len() as u64)
    }

    async fn entries(&self, ns: &AccountNamespace) -> Result<Vec<(PostId, LedgerEntry)>> {
        let inner = self.inner.read().unwrap();

        let mut entries = account(&inner, ns)?
            .iter()
            .map(|(key, value)| -> Result<(PostId, LedgerEntry)> {
                let post = PostId::from_key(key).map_err(|e| LedgerError::corrupt_key(key, e))?;
                Ok((post, LedgerEntry::from_value(value)?))
            })
            .collect::<Result<Vec<_>>>()?;
        entries.sort_by_key(|(post, _)| *post);

        Ok(entries)
    }

    async fn load_credentials(&self, instance: &InstanceName) -> Result<Option<AppCredentials>> {
        let inner = self.inner.read().unwrap();

        let Some(bucket) = inner.get(instance) else {
            return Ok(None);
        };

        match (bucket.keys.get(APP_ID_KEY), bucket.keys.get(APP_SECRET_KEY)) {
            (Some(id), Some(secret)) => Ok(Some(AppCredentials {
                client_id: String::from_utf8_lossy(id).into_owned(),
                client_secret: String::from_utf8_lossy(secret).into_owned(),
            })),
            _ => Ok(None),
        }
    }

    async fn store_credentials(
        &self,
        instance: &InstanceName,
        credentials: &AppCredentials,
    ) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        let bucket = inner.entry(instance.clone()).or_default();

        bucket
            .keys
            .insert(APP_ID_KEY.to_vec(), credentials.client_id.as_bytes().to_vec());
        bucket.keys.insert(
            APP_SECRET_KEY.to_vec(),
            credentials.client_secret.as_bytes().to_vec(),
        );

        Ok(())
    }
}
