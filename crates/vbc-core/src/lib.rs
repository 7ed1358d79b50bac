//! # vbc Core
//!
//! Pure primitives for the vbc crossposter: source identities, ledger records,
//! instance canonicalization and the varint key codec.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`AccountId`] / [`PostId`] - Numeric source-platform identifiers
//! - [`Post`] - A single status authored by the mirrored account
//! - [`InstanceName`] - Canonicalized source instance URL
//! - [`AccountNamespace`] - The `(instance, account)` scope of every ledger operation
//! - [`LedgerEntry`] - Either a bootstrap sentinel or a [`PublishedRecord`]
//!
//! ## Keys
//!
//! Ledger keys are zig-zag LEB128 varints. See the [`varint`] module.

pub mod error;
pub mod instance;
pub mod record;
pub mod types;
pub mod varint;

pub use error::{CoreError, VarintError};
pub use instance::InstanceName;
pub use record::{AppCredentials, LedgerEntry, PublishedRecord};
pub use types::{Account, AccountId, AccountNamespace, DestinationProfile, Post, PostId};
pub use varint::{decode_varint, encode_varint};
