//! Persistence seams. Implementations must hand out independent copies so callers
//! cannot mutate stored state through a returned value.

use async_trait::async_trait;

use crate::types::{StoredCredential, StoredWebhook, SubscriptionSnapshot};

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Records an ingestion for the key. Re-saving refreshes `last_ingested_at` only.
    async fn save_credential(&self, stripe_secret_key: &str) -> StoredCredential;

    async fn list_credentials(&self) -> Vec<StoredCredential>;
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save_snapshot(&self, stripe_secret_key: &str, snapshot: SubscriptionSnapshot);

    async fn get_snapshot(&self, stripe_secret_key: &str) -> Option<SubscriptionSnapshot>;
}

#[async_trait]
pub trait WebhookStore: Send + Sync {
    async fn configure_webhook(&self, stripe_secret_key: &str, webhook_url: &str) -> StoredWebhook;

    async fn get_webhook(&self, stripe_secret_key: &str) -> Option<StoredWebhook>;

    async fn list_webhooks(&self) -> Vec<StoredWebhook>;
}
