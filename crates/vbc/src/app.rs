//! The crossposter: wiring from configuration to a running poll loop.

use vbc_clients::{
    build_http_client, resolve_app_credentials, BlueskyClient, MastodonClient, MastodonRegistrar,
};
use vbc_core::{AccountId, AccountNamespace, InstanceName};
use vbc_ledger::{Ledger, SqliteLedger};
use vbc_sync::{
    BootstrapOutcome, DestinationClient, PollReport, SourceClient, SyncConfig, SyncContext,
    SyncController,
};

use crate::config::Config;
use crate::error::{Result, VbcError};

/// One source account being mirrored to one destination profile.
pub struct Crossposter<S, D, L> {
    controller: SyncController<S, D, L>,
}

impl<S, D, L> Crossposter<S, D, L>
where
    S: SourceClient,
    D: DestinationClient,
    L: Ledger,
{
    /// Look up the account and the destination profile, then build the loop.
    pub async fn start(
        ctx: SyncContext<S, D, L>,
        instance: InstanceName,
        account: AccountId,
        handle: &str,
        config: SyncConfig,
    ) -> Result<Self> {
        tracing::info!(account = %account, "querying for source account");
        let account = ctx
            .source
            .get_account(account)
            .await
            .map_err(VbcError::startup(format!("could not query for account {}", account)))?;
        tracing::info!(handle = %account.handle, "found source account");

        tracing::info!(handle = %handle, "fetching destination profile");
        let profile = ctx
            .destination
            .resolve_profile(handle)
            .await
            .map_err(VbcError::startup(format!("could not fetch profile @{}", handle)))?;

        let ns = AccountNamespace::new(instance, account.id);
        Ok(Self {
            controller: SyncController::new(ctx, ns, account, profile, config),
        })
    }

    pub fn namespace(&self) -> &AccountNamespace {
        self.controller.namespace()
    }

    /// Seed the ledger for the account if this is its first run.
    pub async fn bootstrap(&self) -> Result<BootstrapOutcome> {
        Ok(self.controller.bootstrap().await?)
    }

    /// Run a single poll.
    pub async fn poll_once(&mut self) -> Result<PollReport> {
        Ok(self.controller.poll_once().await?)
    }

    /// Bootstrap and poll until a fatal error.
    pub async fn run(&mut self) -> Result<()> {
        Ok(self.controller.run().await?)
    }
}

/// Open the store, authenticate with both platforms and build the crossposter.
pub async fn connect(
    config: &Config,
) -> Result<Crossposter<MastodonClient, BlueskyClient, SqliteLedger>> {
    let ledger = SqliteLedger::open(&config.store_file)?;
    tracing::info!(path = %config.store_file.display(), "using store");

    let http = build_http_client().map_err(VbcError::startup("could not build HTTP client"))?;

    tracing::info!(instance = %config.instance, "using mastodon instance");
    let registrar = MastodonRegistrar::new(http.clone());
    let (credentials, source) = resolve_app_credentials(
        &config.instance,
        config.app_credentials.clone(),
        &ledger,
        &registrar,
    )
    .await?;
    tracing::debug!(?source, "resolved application credentials");

    let mastodon = MastodonClient::connect(http.clone(), config.instance.clone(), &credentials)
        .await
        .map_err(VbcError::startup("could not authenticate with mastodon"))?;

    let bluesky = BlueskyClient::login(
        http,
        &config.bsky_server,
        &config.bsky_handle,
        &config.bsky_app_key,
    )
    .await
    .map_err(VbcError::startup(format!("could not log in to {}", config.bsky_server)))?;

    Crossposter::start(
        SyncContext::new(mastodon, bluesky, ledger),
        config.instance.clone(),
        config.account,
        &config.bsky_handle,
        config.sync,
    )
    .await
}
