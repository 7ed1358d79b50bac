//! Print the contents of a vbc store for one account.
//!
//! # Usage
//!
//! ```bash
//! vbc-dump --store-file vbc.db \
//!     --mastodon-instance https://tiggi.es --mastodon-account-id 42
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use vbc::vbc_core::{AccountId, AccountNamespace, InstanceName, LedgerEntry};
use vbc::vbc_ledger::{Ledger, SqliteLedger};

#[derive(Parser, Debug)]
#[command(name = "vbc-dump")]
#[command(about = "Print the mirrored posts recorded in a vbc store")]
struct Args {
    /// Path to the ledger store
    #[arg(long, env = "VBC_STORE_FILE", default_value = "vbc.db")]
    store_file: PathBuf,

    /// Mastodon instance hosting the account
    #[arg(long, env = "VBC_MASTODON_INSTANCE")]
    mastodon_instance: String,

    /// Numeric ID of the account
    #[arg(long, env = "VBC_MASTODON_ACCOUNT_ID", allow_negative_numbers = true)]
    mastodon_account_id: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    vbc::logging::init(false);

    let args = Args::parse();

    if !args.store_file.exists() {
        anyhow::bail!("no store at {}", args.store_file.display());
    }

    let instance = InstanceName::canonicalize(&args.mastodon_instance)
        .context("invalid mastodon instance")?;
    let ledger = SqliteLedger::open(&args.store_file)
        .with_context(|| format!("could not open {}", args.store_file.display()))?;

    let ns = AccountNamespace::new(instance.clone(), AccountId(args.mastodon_account_id));
    println!("Store: {}", args.store_file.display());
    println!("Account: {}", ns);

    if ledger.has_namespace(&ns).await? {
        for (post, entry) in ledger.entries(&ns).await? {
            match entry {
                LedgerEntry::Sentinel => println!("{} sentinel", post),
                LedgerEntry::Published(record) => {
                    println!("{} {} {}", post, record.uri, record.cid)
                }
            }
        }
        println!("Entries: {}", ledger.entry_count(&ns).await?);
    } else {
        println!("Not bootstrapped");
    }

    let credentials = ledger.load_credentials(&instance).await?;
    println!(
        "Application credentials: {}",
        if credentials.is_some() { "stored" } else { "none" }
    );

    Ok(())
}
