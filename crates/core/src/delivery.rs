use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::auth::fingerprint;
use crate::digest::DigestSource;
use crate::formatter::SlackDigestFormatter;
use crate::slack::WebhookTransport;
use crate::store::WebhookStore;
use crate::types::{Digest, SlackPayload, TransportResponse};

pub const REASON_NOT_CONFIGURED: &str = "slack_webhook_not_configured";
pub const REASON_DELIVERY_FAILED: &str = "slack_delivery_failed";

#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    Delivered {
        fingerprint: String,
        digest: Digest,
        payload: SlackPayload,
        response: TransportResponse,
    },
    NotConfigured {
        fingerprint: String,
    },
    DeliveryFailed {
        fingerprint: String,
        digest: Digest,
        payload: SlackPayload,
        error: String,
    },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }

    pub fn fingerprint(&self) -> &str {
        match self {
            DeliveryOutcome::Delivered { fingerprint, .. }
            | DeliveryOutcome::NotConfigured { fingerprint }
            | DeliveryOutcome::DeliveryFailed { fingerprint, .. } => fingerprint,
        }
    }

    pub fn reason(&self) -> Option<&'static str> {
        match self {
            DeliveryOutcome::Delivered { .. } => None,
            DeliveryOutcome::NotConfigured { .. } => Some(REASON_NOT_CONFIGURED),
            DeliveryOutcome::DeliveryFailed { .. } => Some(REASON_DELIVERY_FAILED),
        }
    }
}

/// Looks up the account's Slack webhook, builds and formats its digest, and sends it once.
///
/// Flow:
/// 1. No webhook configured: return `NotConfigured` without building anything
/// 2. Build the digest and format the payload
/// 3. Post once; a transport error becomes `DeliveryFailed` carrying what would have been sent
pub struct SlackDigestDeliveryService {
    digest_source: Arc<dyn DigestSource>,
    webhook_store: Arc<dyn WebhookStore>,
    transport: Arc<dyn WebhookTransport>,
    formatter: SlackDigestFormatter,
}

impl SlackDigestDeliveryService {
    pub fn new(
        digest_source: Arc<dyn DigestSource>,
        webhook_store: Arc<dyn WebhookStore>,
        transport: Arc<dyn WebhookTransport>,
        formatter: SlackDigestFormatter,
    ) -> Self {
        Self {
            digest_source,
            webhook_store,
            transport,
            formatter,
        }
    }

    #[instrument(skip_all, fields(window_days = window_days))]
    pub async fn deliver_digest(&self, stripe_secret_key: &str, window_days: i64) -> DeliveryOutcome {
        let fingerprint = fingerprint(stripe_secret_key);

        let Some(webhook) = self.webhook_store.get_webhook(stripe_secret_key).await else {
            info!(%fingerprint, "slack webhook not configured, skipping digest");
            return DeliveryOutcome::NotConfigured { fingerprint };
        };

        let digest = self
            .digest_source
            .build_digest(stripe_secret_key, window_days)
            .await;
        let payload = self.formatter.format_digest(&digest);

        match self.transport.post_message(&webhook.webhook_url, &payload).await {
            Ok(response) => {
                info!(
                    %fingerprint,
                    status_code = response.status_code,
                    upcoming = digest.upcoming.upcoming_subscriptions.len(),
                    "slack digest delivered"
                );
                DeliveryOutcome::Delivered {
                    fingerprint,
                    digest,
                    payload,
                    response,
                }
            }
            Err(err) => {
                warn!(%fingerprint, status_code = ?err.status(), error = %err, "slack digest delivery failed");
                DeliveryOutcome::DeliveryFailed {
                    fingerprint,
                    digest,
                    payload,
                    error: err.to_string(),
                }
            }
        }
    }
}
