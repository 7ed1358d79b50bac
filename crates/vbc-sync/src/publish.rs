//! Destination publisher.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use vbc_core::{DestinationProfile, PublishedRecord};

use crate::destination::DestinationClient;
use crate::error::ClientError;

/// Publishes text under one resolved destination identity.
///
/// Each call to [`Publisher::publish`] makes exactly one create call. There is
/// no retry and no idempotency token; the poll loop owns retry behavior.
pub struct Publisher<D> {
    destination: Arc<D>,
    profile: DestinationProfile,
}

impl<D: DestinationClient> Publisher<D> {
    pub fn new(destination: Arc<D>, profile: DestinationProfile) -> Self {
        Self {
            destination,
            profile,
        }
    }

    /// Resolve `handle` on the destination and build a publisher for it.
    pub async fn resolve(destination: Arc<D>, handle: &str) -> Result<Self, ClientError> {
        let profile = destination.resolve_profile(handle).await?;
        tracing::info!(did = %profile.did, handle = %profile.handle, "resolved destination profile");
        Ok(Self::new(destination, profile))
    }

    pub fn profile(&self) -> &DestinationProfile {
        &self.profile
    }

    /// Create one post and return its record descriptor.
    pub async fn publish(
        &self,
        text: &str,
        created_at: DateTime<Utc>,
    ) -> Result<PublishedRecord, ClientError> {
        let record = self
            .destination
            .create_post(&self.profile, text, created_at)
            .await?;
        tracing::info!(uri = %record.uri, "published post");
        Ok(record)
    }
}
