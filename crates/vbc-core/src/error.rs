//! Error types for vbc core.

use thiserror::Error;

/// Errors from decoding a varint-encoded key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VarintError {
    /// The buffer ended before a terminating byte was found.
    #[error("kv buffer is too small")]
    BufferTooSmall,

    /// The encoded magnitude does not fit in 64 bits.
    #[error("kv buffer of {consumed} bytes would overflow int64")]
    Overflow { consumed: usize },
}

/// Core errors raised while building or decoding domain values.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("could not parse instance name {input}: {reason}")]
    InvalidInstance { input: String, reason: String },

    #[error("no support for opaque URL: {0}")]
    OpaqueInstance(String),

    #[error("invalid key: {0}")]
    InvalidKey(#[from] VarintError),

    #[error("malformed ledger value ({value}): {reason}")]
    MalformedValue { value: String, reason: String },

    #[error("invalid identifier {0:?}")]
    InvalidId(String),
}
