//! First-run baseline for an account.
//!
//! Everything the account posted before the first run is recorded as a
//! sentinel so that only posts made afterwards are ever mirrored.

use vbc_core::{Account, AccountNamespace, PostId};
use vbc_ledger::{BootstrapResult, Ledger};

use crate::context::SyncContext;
use crate::error::{Result, SyncError};
use crate::source::SourceClient;

/// What [`bootstrap_account`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The namespace was created with this many sentinel entries.
    Seeded { sentinels: usize },
    /// The namespace already existed; nothing was fetched or written.
    AlreadyBootstrapped,
}

/// Seed the ledger for `account` if it has never been seen.
///
/// The full history is fetched before anything is written, so a failed fetch
/// leaves no namespace behind. The sentinels and the namespace are committed
/// in one ledger transaction.
pub async fn bootstrap_account<S, D, L>(
    ctx: &SyncContext<S, D, L>,
    ns: &AccountNamespace,
    account: &Account,
) -> Result<BootstrapOutcome>
where
    S: SourceClient,
    L: Ledger,
{
    if ctx.ledger.has_namespace(ns).await? {
        tracing::debug!(namespace = %ns, "account already bootstrapped");
        return Ok(BootstrapOutcome::AlreadyBootstrapped);
    }

    tracing::info!(account = %account.handle, "bootstrapping account from full history");
    let history = ctx
        .source
        .get_post_history(account.id)
        .await
        .map_err(SyncError::BootstrapFetch)?;

    let ids: Vec<PostId> = history
        .iter()
        .inspect(|post| {
            tracing::debug!(
                url = %post.display_url(),
                created_at = %post.created_at,
                "ignoring existing post"
            );
        })
        .map(|post| post.id)
        .collect();

    match ctx.ledger.bootstrap(ns, &ids).await? {
        BootstrapResult::Committed { inserted } => {
            tracing::info!(namespace = %ns, sentinels = inserted, "bootstrap complete");
            Ok(BootstrapOutcome::Seeded {
                sentinels: inserted,
            })
        }
        BootstrapResult::AlreadyBootstrapped => Ok(BootstrapOutcome::AlreadyBootstrapped),
    }
}
