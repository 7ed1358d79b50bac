//! Process-level tracing setup.

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directives.
pub const LOG_ENV: &str = "VBC_LOG";

static INIT: OnceLock<()> = OnceLock::new();

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Build the filter from `VBC_LOG`, falling back to `info` (or `debug` when
/// verbose).
pub fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

/// Install the fmt subscriber.
///
/// Safe to call more than once; only the first call has an effect.
pub fn init(verbose: bool) {
    if INIT.get().is_some() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_target(false)
        .try_init();
    let _ = INIT.set(());
}
