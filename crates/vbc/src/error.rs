//! Error types for the crossposter.

use thiserror::Error;
use vbc_clients::CredentialError;
use vbc_ledger::LedgerError;
use vbc_sync::{ClientError, SyncError};

use crate::config::ConfigError;

/// Errors that can stop the crossposter.
#[derive(Debug, Error)]
pub enum VbcError {
    /// Invalid or missing setting.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The store could not be opened.
    #[error("store error: {0}")]
    Ledger(#[from] LedgerError),

    /// No usable Mastodon application credentials.
    #[error("credential error: {0}")]
    Credentials(#[from] CredentialError),

    /// A platform call made during startup failed.
    #[error("{what}: {source}")]
    Startup {
        what: String,
        #[source]
        source: ClientError,
    },

    /// Bootstrap or the poll loop failed.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),
}

impl VbcError {
    pub(crate) fn startup(what: impl Into<String>) -> impl FnOnce(ClientError) -> Self {
        let what = what.into();
        move |source| Self::Startup { what, source }
    }
}

/// Result type for crossposter operations.
pub type Result<T> = std::result::Result<T, VbcError>;
