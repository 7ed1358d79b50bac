//! Explicit dependencies of the sync engine.

use std::sync::Arc;

/// The collaborators every sync operation needs, passed explicitly instead of
/// living in global state.
pub struct SyncContext<S, D, L> {
    pub source: Arc<S>,
    pub destination: Arc<D>,
    pub ledger: Arc<L>,
}

impl<S, D, L> SyncContext<S, D, L> {
    /// Bundle owned collaborators.
    pub fn new(source: S, destination: D, ledger: L) -> Self {
        Self::from_shared(Arc::new(source), Arc::new(destination), Arc::new(ledger))
    }

    /// Bundle collaborators that are already shared elsewhere (e.g. with a test
    /// that inspects them afterwards).
    pub fn from_shared(source: Arc<S>, destination: Arc<D>, ledger: Arc<L>) -> Self {
        Self {
            source,
            destination,
            ledger,
        }
    }
}

impl<S, D, L> Clone for SyncContext<S, D, L> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            destination: Arc::clone(&self.destination),
            ledger: Arc::clone(&self.ledger),
        }
    }
}
