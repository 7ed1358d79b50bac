//! # vbc Ledger
//!
//! Dedupe ledger for the vbc crossposter. Provides a trait-based interface
//! recording which source posts have already been mirrored, with SQLite and
//! in-memory implementations.
//!
//! ## Overview
//!
//! The ledger abstracts persistence behind the [`Ledger`] trait, allowing the
//! sync engine to be storage-agnostic. The primary implementation is
//! [`SqliteLedger`], with [`MemoryLedger`] for testing.
//!
//! ## Key Types
//!
//! - [`Ledger`] - The async trait for all ledger operations
//! - [`SqliteLedger`] - SQLite-based persistent storage
//! - [`MemoryLedger`] - In-memory storage for tests
//! - [`InsertResult`] - Result of recording a published post
//! - [`BootstrapResult`] - Result of seeding an account namespace
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vbc_core::{AccountId, AccountNamespace, InstanceName, PostId, PublishedRecord};
//! use vbc_ledger::{Ledger, SqliteLedger};
//!
//! async fn example() {
//!     let ledger = SqliteLedger::open("vbc.db").unwrap();
//!     let instance = InstanceName::canonicalize("https://tiggi.es").unwrap();
//!     let ns = AccountNamespace::new(instance, AccountId(1));
//!
//!     // Seed the baseline, then record new posts as they are mirrored
//!     ledger.bootstrap(&ns, &[PostId(10)]).await.unwrap();
//!     let record = PublishedRecord::new("bafy...", "at://...");
//!     ledger.put(&ns, PostId(11), &record).await.unwrap();
//!     assert!(ledger.exists(&ns, PostId(11)).await.unwrap());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Write-once**: recording the same post twice returns `AlreadyExists`
//! - **Namespaced**: entries are scoped by canonical instance and account ID
//! - **Typed missing namespace**: use before bootstrap is an error value, not a panic

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{LedgerError, Result};
pub use memory::MemoryLedger;
pub use sqlite::SqliteLedger;
pub use traits::{BootstrapResult, InsertResult, Ledger, LedgerExt};
