use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};

use crate::auth::fingerprint;
use crate::store::{CredentialStore, SnapshotStore};
use crate::types::SubscriptionSnapshot;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Stripe snapshot fetch failed: {0}")]
    Fetch(String),
}

#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    async fn fetch_subscription_snapshot(
        &self,
        stripe_secret_key: &str,
    ) -> Result<SubscriptionSnapshot, IngestError>;
}

/// Placeholder Stripe client. Returns an empty snapshot for every account.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubStripeClient;

#[async_trait]
impl SnapshotFetcher for StubStripeClient {
    async fn fetch_subscription_snapshot(
        &self,
        _stripe_secret_key: &str,
    ) -> Result<SubscriptionSnapshot, IngestError> {
        Ok(SubscriptionSnapshot::default())
    }
}

pub struct IngestionService {
    credentials: Arc<dyn CredentialStore>,
    fetcher: Arc<dyn SnapshotFetcher>,
    snapshots: Arc<dyn SnapshotStore>,
}

impl IngestionService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        fetcher: Arc<dyn SnapshotFetcher>,
        snapshots: Arc<dyn SnapshotStore>,
    ) -> Self {
        Self {
            credentials,
            fetcher,
            snapshots,
        }
    }

    /// Records the credential, pulls a fresh snapshot and caches it.
    ///
    /// The credential is recorded even when the fetch fails.
    #[instrument(skip_all)]
    pub async fn ingest(&self, stripe_secret_key: &str) -> Result<SubscriptionSnapshot, IngestError> {
        self.credentials.save_credential(stripe_secret_key).await;

        let snapshot = self
            .fetcher
            .fetch_subscription_snapshot(stripe_secret_key)
            .await?;
        self.snapshots
            .save_snapshot(stripe_secret_key, snapshot.clone())
            .await;

        info!(
            fingerprint = %fingerprint(stripe_secret_key),
            customers = snapshot.customers.len(),
            subscriptions = snapshot.subscriptions.len(),
            "ingested subscription snapshot"
        );

        Ok(snapshot)
    }
}
