//! Error types for the ledger.

use thiserror::Error;
use vbc_core::{AccountNamespace, CoreError, VarintError};

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The account has no namespace yet; bootstrap has not run for it.
    #[error("account namespace {0} does not exist")]
    NamespaceMissing(AccountNamespace),

    /// A stored key could not be decoded.
    #[error("corrupt key {key}: {source}")]
    CorruptKey {
        key: String,
        #[source]
        source: VarintError,
    },

    /// A stored value could not be decoded.
    #[error("invalid data: {0}")]
    InvalidData(#[from] CoreError),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// The connection lock was poisoned by a panicking writer.
    #[error("connection lock poisoned: {0}")]
    Poisoned(String),

    /// The blocking task running the transaction did not complete.
    #[error("blocking task failed: {0}")]
    Task(String),
}

impl LedgerError {
    pub(crate) fn corrupt_key(key: &[u8], source: VarintError) -> Self {
        Self::CorruptKey {
            key: hex::encode(key),
            source,
        }
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
