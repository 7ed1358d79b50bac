//! SQLite implementation of the Ledger trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled SQLite,
//! wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use tracing::debug;

use vbc_core::record::{APP_ID_KEY, APP_SECRET_KEY};
use vbc_core::{AccountNamespace, AppCredentials, InstanceName, LedgerEntry, PostId, PublishedRecord};

use crate::error::{LedgerError, Result};
use crate::migration;
use crate::traits::{BootstrapResult, InsertResult, Ledger};

/// SQLite-based ledger implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteLedger {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLedger {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` inside a transaction on the blocking pool.
    ///
    /// The transaction commits only if `f` returns `Ok`; on error it is
    /// dropped, which rolls it back.
    async fn transact<F, T>(&self, behavior: TransactionBehavior, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| LedgerError::Poisoned(e.to_string()))?;
            let tx = conn.transaction_with_behavior(behavior)?;
            let value = f(&tx)?;
            tx.commit()?;
            Ok(value)
        })
        .await
        .map_err(|e| LedgerError::Task(e.to_string()))?
    }

    /// Read-only transaction.
    async fn view<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.transact(TransactionBehavior::Deferred, f).await
    }

    /// Read-write transaction, taking the write lock up front.
    async fn update<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.transact(TransactionBehavior::Immediate, f).await
    }
}

fn namespace_exists(tx: &Transaction<'_>, ns: &AccountNamespace) -> Result<bool> {
    let exists: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM accounts WHERE instance = ?1 AND account_key = ?2)",
        params![ns.instance.as_str(), ns.account_key()],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn require_namespace(tx: &Transaction<'_>, ns: &AccountNamespace) -> Result<()> {
    if namespace_exists(tx, ns)? {
        Ok(())
    } else {
        Err(LedgerError::NamespaceMissing(ns.clone()))
    }
}

fn ensure_instance(tx: &Transaction<'_>, instance: &InstanceName, now: i64) -> Result<()> {
    tx.execute(
        "INSERT OR IGNORE INTO instances (instance, created_at) VALUES (?1, ?2)",
        params![instance.as_str(), now],
    )?;
    Ok(())
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[async_trait]
impl Ledger for SqliteLedger {
    async fn has_namespace(&self, ns: &AccountNamespace) -> Result<bool> {
        let ns = ns.clone();
        self.view(move |tx| namespace_exists(tx, &ns)).await
    }

    async fn bootstrap(&self, ns: &AccountNamespace, posts: &[PostId]) -> Result<BootstrapResult> {
        let ns = ns.clone();
        let posts = posts.to_vec();

        self.update(move |tx| {
            if namespace_exists(tx, &ns)? {
                return Ok(BootstrapResult::AlreadyBootstrapped);
            }

            let now = now_millis();
            let account_key = ns.account_key();
            ensure_instance(tx, &ns.instance, now)?;

            tx.execute(
                "INSERT INTO accounts (instance, account_key, bootstrapped_at) VALUES (?1, ?2, ?3)",
                params![ns.instance.as_str(), account_key, now],
            )?;

            let sentinel = LedgerEntry::Sentinel.to_value()?;
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO entries (instance, account_key, post_key, value, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;

            let mut inserted = 0;
            for post in &posts {
                inserted += stmt.execute(params![
                    ns.instance.as_str(),
                    account_key,
                    post.to_key(),
                    sentinel,
                    now,
                ])?;
            }

            debug!(namespace = %ns, inserted, "account namespace created");
            Ok(BootstrapResult::Committed { inserted })
        })
        .await
    }

    async fn exists(&self, ns: &AccountNamespace, post: PostId) -> Result<bool> {
        let ns = ns.clone();

        self.view(move |tx| {
            require_namespace(tx, &ns)?;

            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM entries
                 WHERE instance = ?1 AND account_key = ?2 AND post_key = ?3)",
                params![ns.instance.as_str(), ns.account_key(), post.to_key()],
                |row| row.get(0),
            )?;

            Ok(exists)
        })
        .await
    }

    async fn get(&self, ns: &AccountNamespace, post: PostId) -> Result<Option<LedgerEntry>> {
        let ns = ns.clone();

        self.view(move |tx| {
            require_namespace(tx, &ns)?;

            let value: Option<Vec<u8>> = tx
                .query_row(
                    "SELECT value FROM entries
                     WHERE instance = ?1 AND account_key = ?2 AND post_key = ?3",
                    params![ns.instance.as_str(), ns.account_key(), post.to_key()],
                    |row| row.get(0),
                )
                .optional()?;

            value
                .map(|v| LedgerEntry::from_value(&v).map_err(LedgerError::from))
                .transpose()
        })
        .await
    }

    async fn put(
        &self,
        ns: &AccountNamespace,
        post: PostId,
        record: &PublishedRecord,
    ) -> Result<InsertResult> {
        let ns = ns.clone();
        let value = LedgerEntry::Published(record.clone()).to_value()?;

        self.update(move |tx| {
            require_namespace(tx, &ns)?;

            let changed = tx.execute(
                "INSERT OR IGNORE INTO entries (instance, account_key, post_key, value, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    ns.instance.as_str(),
                    ns.account_key(),
                    post.to_key(),
                    value,
                    now_millis(),
                ],
            )?;

            Ok(if changed == 0 {
                InsertResult::AlreadyExists
            } else {
                InsertResult::Inserted
            })
        })
        .await
    }

    async fn entry_count(&self, ns: &AccountNamespace) -> Result<u64> {
        let ns = ns.clone();

        self.view(move |tx| {
            require_namespace(tx, &ns)?;

            let count: i64 = tx.query_row(
                "SELECT COUNT(*) FROM entries WHERE instance = ?1 AND account_key = ?2",
                params![ns.instance.as_str(), ns.account_key()],
                |row| row.get(0),
            )?;

            Ok(count as u64)
        })
        .await
    }

    async fn entries(&self, ns: &AccountNamespace) -> Result<Vec<(PostId, LedgerEntry)>> {
        let ns = ns.clone();

        self.view(move |tx| {
            require_namespace(tx, &ns)?;

            let mut stmt = tx.prepare(
                "SELECT post_key, value FROM entries WHERE instance = ?1 AND account_key = ?2",
            )?;

            let rows = stmt
                .query_map(params![ns.instance.as_str(), ns.account_key()], |row| {
                    Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, Vec<u8>>(1)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            // Varint keys do not sort numerically as blobs.
            let mut entries = rows
                .into_iter()
                .map(|(key, value)| -> Result<(PostId, LedgerEntry)> {
                    let post = PostId::from_key(&key).map_err(|e| LedgerError::corrupt_key(&key, e))?;
                    Ok((post, LedgerEntry::from_value(&value)?))
                })
                .collect::<Result<Vec<_>>>()?;
            entries.sort_by_key(|(post, _)| *post);

            Ok(entries)
        })
        .await
    }

    async fn load_credentials(&self, instance: &InstanceName) -> Result<Option<AppCredentials>> {
        let instance = instance.clone();

        self.view(move |tx| {
            let mut stmt =
                tx.prepare("SELECT value FROM instance_keys WHERE instance = ?1 AND key = ?2")?;

            let client_id: Option<Vec<u8>> = stmt
                .query_row(params![instance.as_str(), APP_ID_KEY], |row| row.get(0))
                .optional()?;
            let client_secret: Option<Vec<u8>> = stmt
                .query_row(params![instance.as_str(), APP_SECRET_KEY], |row| row.get(0))
                .optional()?;

            match (client_id, client_secret) {
                (Some(id), Some(secret)) => Ok(Some(AppCredentials {
                    client_id: String::from_utf8_lossy(&id).into_owned(),
                    client_secret: String::from_utf8_lossy(&secret).into_owned(),
                })),
                _ => Ok(None),
            }
        })
        .await
    }

    async fn store_credentials(
        &self,
        instance: &InstanceName,
        credentials: &AppCredentials,
    ) -> Result<()> {
        let instance = instance.clone();
        let credentials = credentials.clone();

        self.update(move |tx| {
            ensure_instance(tx, &instance, now_millis())?;

            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO instance_keys (instance, key, value) VALUES (?1, ?2, ?3)",
            )?;
            stmt.execute(params![
                instance.as_str(),
                APP_ID_KEY,
                credentials.client_id.as_bytes()
            ])?;
            stmt.execute(params![
                instance.as_str(),
                APP_SECRET_KEY,
                credentials.client_secret.as_bytes()
            ])?;

            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::LedgerExt;
    use proptest::prelude::*;
    use vbc_core::AccountId;

    fn namespace(account: i64) -> AccountNamespace {
        AccountNamespace::new(
            InstanceName::canonicalize("https://tiggi.es").unwrap(),
            AccountId(account),
        )
    }

    fn record(n: u32) -> PublishedRecord {
        PublishedRecord::new(
            format!("bafyrei{}", n),
            format!("at://did:plc:test/app.bsky.feed.post/{}", n),
        )
    }

    #[tokio::test]
    async fn test_bootstrap_inserts_sentinels() {
        let ledger = SqliteLedger::open_memory().unwrap();
        let ns = namespace(1);

        let result = ledger
            .bootstrap(&ns, &[PostId(1), PostId(2), PostId(3)])
            .await
            .unwrap();
        assert_eq!(result, BootstrapResult::Committed { inserted: 3 });
        assert_eq!(ledger.entry_count(&ns).await.unwrap(), 3);
        assert_eq!(
            ledger.get(&ns, PostId(2)).await.unwrap(),
            Some(LedgerEntry::Sentinel)
        );
    }

    #[tokio::test]
    async fn test_bootstrap_idempotent() {
        let ledger = SqliteLedger::open_memory().unwrap();
        let ns = namespace(1);

        ledger.bootstrap(&ns, &[PostId(1)]).await.unwrap();
        let second = ledger
            .bootstrap(&ns, &[PostId(1), PostId(2)])
            .await
            .unwrap();

        assert_eq!(second, BootstrapResult::AlreadyBootstrapped);
        assert_eq!(ledger.entry_count(&ns).await.unwrap(), 1);
        assert!(!ledger.exists(&ns, PostId(2)).await.unwrap());
    }

    #[tokio::test]
    async fn test_bootstrap_empty_history() {
        let ledger = SqliteLedger::open_memory().unwrap();
        let ns = namespace(1);

        let result = ledger.bootstrap(&ns, &[]).await.unwrap();
        assert_eq!(result, BootstrapResult::Committed { inserted: 0 });
        assert!(ledger.has_namespace(&ns).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_namespace() {
        let ledger = SqliteLedger::open_memory().unwrap();
        let ns = namespace(1);

        assert!(!ledger.has_namespace(&ns).await.unwrap());
        assert!(matches!(
            ledger.exists(&ns, PostId(1)).await,
            Err(LedgerError::NamespaceMissing(_))
        ));
        assert!(matches!(
            ledger.put(&ns, PostId(1), &record(1)).await,
            Err(LedgerError::NamespaceMissing(_))
        ));
    }

    #[tokio::test]
    async fn test_put_never_overwrites() {
        let ledger = SqliteLedger::open_memory().unwrap();
        let ns = namespace(1);
        ledger.bootstrap(&ns, &[PostId(10)]).await.unwrap();

        let r1 = ledger.put(&ns, PostId(11), &record(1)).await.unwrap();
        assert_eq!(r1, InsertResult::Inserted);

        let r2 = ledger.put(&ns, PostId(11), &record(2)).await.unwrap();
        assert_eq!(r2, InsertResult::AlreadyExists);
        assert_eq!(
            ledger.published_record(&ns, PostId(11)).await.unwrap(),
            Some(record(1))
        );

        // Sentinels are not replaced by records either.
        let r3 = ledger.put(&ns, PostId(10), &record(3)).await.unwrap();
        assert_eq!(r3, InsertResult::AlreadyExists);
        assert!(ledger.get(&ns, PostId(10)).await.unwrap().unwrap().is_sentinel());
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let ledger = SqliteLedger::open_memory().unwrap();
        let a = namespace(1);
        let b = namespace(2);
        let c = AccountNamespace::new(
            InstanceName::canonicalize("https://mastodon.social").unwrap(),
            AccountId(1),
        );

        ledger.bootstrap(&a, &[PostId(5)]).await.unwrap();
        ledger.bootstrap(&b, &[]).await.unwrap();
        ledger.bootstrap(&c, &[]).await.unwrap();

        assert!(ledger.exists(&a, PostId(5)).await.unwrap());
        assert!(!ledger.exists(&b, PostId(5)).await.unwrap());
        assert!(!ledger.exists(&c, PostId(5)).await.unwrap());
    }

    #[tokio::test]
    async fn test_entries_sorted_numerically() {
        let ledger = SqliteLedger::open_memory().unwrap();
        let ns = namespace(1);
        ledger
            .bootstrap(&ns, &[PostId(300), PostId(-2), PostId(64), PostId(1)])
            .await
            .unwrap();
        ledger.put(&ns, PostId(301), &record(1)).await.unwrap();

        let posts: Vec<PostId> = ledger
            .entries(&ns)
            .await
            .unwrap()
            .into_iter()
            .map(|(post, _)| post)
            .collect();
        assert_eq!(
            posts,
            vec![PostId(-2), PostId(1), PostId(64), PostId(300), PostId(301)]
        );
    }

    #[tokio::test]
    async fn test_corrupt_key_reported() {
        let ledger = SqliteLedger::open_memory().unwrap();
        let ns = namespace(1);
        ledger.bootstrap(&ns, &[]).await.unwrap();

        {
            let conn = ledger.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO entries (instance, account_key, post_key, value, recorded_at)
                 VALUES (?1, ?2, X'8080', X'', 0)",
                params![ns.instance.as_str(), ns.account_key()],
            )
            .unwrap();
        }

        assert!(matches!(
            ledger.entries(&ns).await,
            Err(LedgerError::CorruptKey { .. })
        ));
    }

    #[tokio::test]
    async fn test_durable_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vbc.db");
        let ns = namespace(1);

        {
            let ledger = SqliteLedger::open(&path).unwrap();
            ledger.bootstrap(&ns, &[PostId(1)]).await.unwrap();
            ledger.put(&ns, PostId(2), &record(2)).await.unwrap();
        }

        let reopened = SqliteLedger::open(&path).unwrap();
        assert!(reopened.exists(&ns, PostId(1)).await.unwrap());
        assert!(reopened.exists(&ns, PostId(2)).await.unwrap());
        assert_eq!(
            reopened.published_record(&ns, PostId(2)).await.unwrap(),
            Some(record(2))
        );
        assert_eq!(
            reopened.bootstrap(&ns, &[PostId(9)]).await.unwrap(),
            BootstrapResult::AlreadyBootstrapped
        );
    }

    #[tokio::test]
    async fn test_credentials_roundtrip() {
        let ledger = SqliteLedger::open_memory().unwrap();
        let instance = InstanceName::canonicalize("https://tiggi.es").unwrap();

        assert_eq!(ledger.load_credentials(&instance).await.unwrap(), None);

        let creds = AppCredentials {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
        };
        ledger.store_credentials(&instance, &creds).await.unwrap();
        assert_eq!(
            ledger.load_credentials(&instance).await.unwrap(),
            Some(creds)
        );
    }

    #[tokio::test]
    async fn test_credentials_do_not_create_account_namespace() {
        let ledger = SqliteLedger::open_memory().unwrap();
        let ns = namespace(1);
        let creds = AppCredentials {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
        };

        ledger.store_credentials(&ns.instance, &creds).await.unwrap();
        assert!(!ledger.has_namespace(&ns).await.unwrap());
    }

    proptest! {
        #[test]
        fn prop_put_is_write_once(posts in prop::collection::btree_set(any::<i64>(), 1..20)) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let ledger = SqliteLedger::open_memory().unwrap();
                let ns = namespace(1);
                ledger.bootstrap(&ns, &[]).await.unwrap();

                for (n, &post) in posts.iter().enumerate() {
                    let result = ledger.put(&ns, PostId(post), &record(n as u32)).await.unwrap();
                    assert_eq!(result, InsertResult::Inserted);
                }
                for &post in &posts {
                    let again = ledger.put(&ns, PostId(post), &record(999)).await.unwrap();
                    assert_eq!(again, InsertResult::AlreadyExists);
                }

                let stored: Vec<i64> = ledger
                    .entries(&ns)
                    .await
                    .unwrap()
                    .into_iter()
                    .map(|(post, _)| post.0)
                    .collect();
                assert_eq!(stored, posts.iter().copied().collect::<Vec<_>>());
                for (n, &post) in posts.iter().enumerate() {
                    assert_eq!(
                        ledger.published_record(&ns, PostId(post)).await.unwrap(),
                        Some(record(n as u32))
                    );
                }
            });
        }
    }
}
