use async_trait::async_trait;
use renewal_core::auth::fingerprint;
use renewal_core::clock::{Clock, SystemClock};
use renewal_core::store::WebhookStore;
use renewal_core::types::StoredWebhook;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One Slack incoming webhook per account, in first-configured order.
pub struct WebhookRepository {
    clock: Arc<dyn Clock>,
    webhooks: RwLock<Vec<StoredWebhook>>,
}

impl Default for WebhookRepository {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl WebhookRepository {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            webhooks: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl WebhookStore for WebhookRepository {
    async fn configure_webhook(&self, stripe_secret_key: &str, webhook_url: &str) -> StoredWebhook {
        let fingerprint = fingerprint(stripe_secret_key);
        let now = self.clock.now();
        let mut webhooks = self.webhooks.write().await;

        if let Some(existing) = webhooks.iter_mut().find(|w| w.fingerprint == fingerprint) {
            existing.reconfigure(webhook_url.to_string(), now);
            return existing.clone();
        }

        let stored = StoredWebhook::new(fingerprint, webhook_url.to_string(), now);
        webhooks.push(stored.clone());
        stored
    }

    async fn get_webhook(&self, stripe_secret_key: &str) -> Option<StoredWebhook> {
        let fingerprint = fingerprint(stripe_secret_key);
        self.webhooks
            .read()
            .await
            .iter()
            .find(|w| w.fingerprint == fingerprint)
            .cloned()
    }

    async fn list_webhooks(&self) -> Vec<StoredWebhook> {
        self.webhooks.read().await.clone()
    }
}
