//! # vbc
//!
//! Mirrors new posts from one Mastodon account to a Bluesky profile.
//!
//! ## Overview
//!
//! On its first run for an account, vbc records every existing post as
//! already handled. From then on it polls the account's most recent post and
//! publishes anything it has not seen, remembering each mirrored post in a
//! SQLite ledger so restarts do not repost.
//!
//! ## Crates
//!
//! - `vbc-core`: identities, ledger records, key encoding
//! - `vbc-ledger`: the dedupe ledger
//! - `vbc-sync`: bootstrap, transformation, publishing, the poll loop
//! - `vbc-clients`: Mastodon and Bluesky HTTP clients
//! - `vbc` (this crate): configuration, logging and wiring
//!
//! ## Usage
//!
//! ```rust,no_run
//! use clap::Parser;
//! use vbc::{app, Args, Config};
//!
//! async fn example() -> vbc::Result<()> {
//!     let config = Config::from_args(Args::parse())?;
//!     let mut crossposter = app::connect(&config).await?;
//!     crossposter.run().await
//! }
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod logging;

pub use app::Crossposter;
pub use config::{Args, Config, ConfigError};
pub use error::{Result, VbcError};

// Re-export component crates for convenience
pub use vbc_clients;
pub use vbc_core;
pub use vbc_ledger;
pub use vbc_sync;
