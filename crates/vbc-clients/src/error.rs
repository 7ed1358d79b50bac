//! Error types for client setup.

use thiserror::Error;

use vbc_ledger::LedgerError;
use vbc_sync::ClientError;

/// Failure to obtain Mastodon application credentials.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("could not register new app: {0}")]
    Register(#[source] ClientError),

    #[error("could not read app credentials from the store: {0}")]
    Ledger(#[from] LedgerError),
}

/// Result type for credential resolution.
pub type Result<T> = std::result::Result<T, CredentialError>;
