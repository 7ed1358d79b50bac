//! Command-line and environment configuration.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use vbc_clients::bluesky::DEFAULT_SERVER;
use vbc_clients::pair_from_env;
use vbc_core::{AccountId, AppCredentials, CoreError, InstanceName};
use vbc_sync::SyncConfig;

/// Mirror a Mastodon account's new posts to Bluesky.
#[derive(Parser, Clone)]
#[command(name = "vbc")]
#[command(about = "Mirrors a Mastodon account's new posts to Bluesky")]
#[command(version)]
pub struct Args {
    /// Mastodon instance hosting the account
    #[arg(long, env = "VBC_MASTODON_INSTANCE", value_name = "URL")]
    pub mastodon_instance: String,

    /// Numeric ID of the account to mirror
    #[arg(long, env = "VBC_MASTODON_ACCOUNT_ID", value_name = "ID", allow_negative_numbers = true)]
    pub mastodon_account_id: i64,

    /// Registered application ID (requires --mastodon-app-secret)
    #[arg(long, env = "VBC_MASTODON_APP_ID", value_name = "ID", hide_env_values = true)]
    pub mastodon_app_id: Option<String>,

    /// Registered application secret (requires --mastodon-app-id)
    #[arg(long, env = "VBC_MASTODON_APP_SECRET", value_name = "SECRET", hide_env_values = true)]
    pub mastodon_app_secret: Option<String>,

    /// Bluesky handle to post as
    #[arg(long, env = "VBC_BSKY_HANDLE", value_name = "HANDLE")]
    pub bsky_handle: String,

    /// Bluesky app password
    #[arg(long, env = "VBC_BSKY_APP_KEY", value_name = "KEY", hide_env_values = true)]
    pub bsky_app_key: String,

    /// Bluesky server
    #[arg(long, env = "VBC_BSKY_SERVER", value_name = "URL", default_value = DEFAULT_SERVER)]
    pub bsky_server: String,

    /// Path to the ledger store
    #[arg(long, env = "VBC_STORE_FILE", value_name = "PATH", default_value = "vbc.db")]
    pub store_file: PathBuf,

    /// Delay between polls, in milliseconds
    #[arg(long, env = "VBC_POLL_INTERVAL_MS", value_name = "MS", default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Errors in the supplied settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid mastodon instance: {0}")]
    Instance(#[from] CoreError),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,
}

/// Validated settings.
#[derive(Clone)]
pub struct Config {
    pub instance: InstanceName,
    pub account: AccountId,
    /// Present only when both halves were supplied.
    pub app_credentials: Option<AppCredentials>,
    pub bsky_handle: String,
    pub bsky_app_key: String,
    pub bsky_server: String,
    pub store_file: PathBuf,
    pub sync: SyncConfig,
    pub verbose: bool,
}

impl Config {
    /// Validate parsed arguments.
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let instance = InstanceName::canonicalize(&args.mastodon_instance)?;

        let bsky_handle = args.bsky_handle.trim().trim_start_matches('@').to_string();
        if bsky_handle.is_empty() {
            return Err(ConfigError::Empty("bluesky handle"));
        }
        if args.bsky_app_key.is_empty() {
            return Err(ConfigError::Empty("bluesky app key"));
        }
        if args.bsky_server.trim().is_empty() {
            return Err(ConfigError::Empty("bluesky server"));
        }
        if args.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }

        Ok(Self {
            instance,
            account: AccountId(args.mastodon_account_id),
            app_credentials: pair_from_env(args.mastodon_app_id, args.mastodon_app_secret),
            bsky_handle,
            bsky_app_key: args.bsky_app_key,
            bsky_server: args.bsky_server,
            store_file: args.store_file,
            sync: SyncConfig {
                poll_interval: Duration::from_millis(args.poll_interval_ms),
                ..SyncConfig::default()
            },
            verbose: args.verbose,
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("instance", &self.instance)
            .field("account", &self.account)
            .field("app_credentials", &self.app_credentials)
            .field("bsky_handle", &self.bsky_handle)
            .field("bsky_app_key", &"<redacted>")
            .field("bsky_server", &self.bsky_server)
            .field("store_file", &self.store_file)
            .field("sync", &self.sync)
            .field("verbose", &self.verbose)
            .finish()
    }
}
