//! # vbc Sync
//!
//! The crossposting engine: bootstraps an account's baseline, then polls the
//! source for new posts, transforms them and publishes them to the
//! destination, recording each mirrored post in the ledger.
//!
//! ## Flow
//!
//! ```text
//! bootstrap:  source history ──► ledger sentinels (one transaction)
//!
//! each poll:  source recent posts
//!               │
//!               ├─ in ledger? ──► skip
//!               │
//!               └─ transform ──► publish ──► ledger.put(record)
//!                     │              │
//!                     └── failure ───┴──► RetryPolicy (nothing recorded)
//! ```
//!
//! Platform access is behind the [`SourceClient`] and [`DestinationClient`]
//! traits; the in-memory implementations in [`source::memory`] and
//! [`destination::memory`] are used by tests. All collaborators travel
//! together in a [`SyncContext`].
//!
//! ## Guarantees
//!
//! - Posts present at bootstrap are never published
//! - A post is recorded only after the destination accepted it
//! - Delivery is at-least-once: a crash between publish and record can
//!   republish one post on restart

pub mod bootstrap;
pub mod context;
pub mod controller;
pub mod destination;
pub mod error;
pub mod policy;
pub mod publish;
pub mod source;
pub mod transform;

pub use bootstrap::{bootstrap_account, BootstrapOutcome};
pub use context::SyncContext;
pub use controller::{PollReport, SyncConfig, SyncController};
pub use destination::DestinationClient;
pub use error::{ClientError, PostError, Result, SyncError, UnsupportedPost};
pub use policy::{BackoffPolicy, FailureAction, ResurfacePolicy, RetryPolicy};
pub use publish::Publisher;
pub use source::SourceClient;
pub use transform::{render_plain_text, ContentTransformer, RenderError};
