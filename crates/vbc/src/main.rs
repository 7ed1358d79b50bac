//! vbc - mirrors a Mastodon account's new posts to Bluesky

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use vbc::{app, logging, Args, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let config = Config::from_args(args).context("invalid configuration")?;
    info!(version = env!("CARGO_PKG_VERSION"), "vbc starting");

    let mut crossposter = app::connect(&config)
        .await
        .context("could not start crossposter")?;

    crossposter.run().await.context("account loop failed")?;
    Ok(())
}
