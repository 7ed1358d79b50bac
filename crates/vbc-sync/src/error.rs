//! Error types for the sync engine.
//!
//! [`SyncError`] is fatal: it propagates out of bootstrap or the poll loop and
//! ends the run. [`PostError`] is local to one post and is contained inside a
//! single loop iteration.

use thiserror::Error;

/// Errors reported by a platform client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The request never produced a response.
    #[error("request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    /// The server answered with a non-success status.
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The response body did not have the expected shape.
    #[error("could not decode response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    /// Login or app registration was refused.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The requested account or profile does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Shapes of source post that cannot be mirrored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UnsupportedPost {
    #[error("statuses with replies are not supported")]
    Reply,

    #[error("statuses with attachments are not supported")]
    Attachments,
}

/// Failure to mirror a single post. Never recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PostError {
    /// The post is a reply or carries attachments.
    #[error(transparent)]
    Unsupported(#[from] UnsupportedPost),

    /// The destination rejected or never answered the create call.
    #[error("publish failed: {0}")]
    Publish(#[from] ClientError),
}

/// Fatal errors that end a bootstrap or a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The full history could not be fetched; nothing was written.
    #[error("could not fetch post history for bootstrap: {0}")]
    BootstrapFetch(#[source] ClientError),

    /// The most recent posts could not be fetched during polling.
    #[error("could not fetch recent posts: {0}")]
    PollFetch(#[source] ClientError),

    /// The ledger could not be read or written.
    #[error("ledger error: {0}")]
    Persistence(#[from] vbc_ledger::LedgerError),
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
