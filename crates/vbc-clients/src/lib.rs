//! # vbc Clients
//!
//! HTTP implementations of the sync engine's platform traits:
//!
//! - [`MastodonClient`] implements [`vbc_sync::SourceClient`] against the
//!   Mastodon REST API
//! - [`BlueskyClient`] implements [`vbc_sync::DestinationClient`] against the
//!   Bluesky XRPC API
//!
//! [`credentials`] resolves the Mastodon application credentials from the
//! environment, the ledger, or a fresh registration.

pub mod bluesky;
pub mod credentials;
pub mod error;
pub mod http;
pub mod mastodon;

pub use bluesky::BlueskyClient;
pub use credentials::{
    pair_from_env, resolve_app_credentials, AppRegistrar, CredentialSource, MastodonRegistrar,
};
pub use error::{CredentialError, Result};
pub use http::build_http_client;
pub use mastodon::MastodonClient;
