use renewal_core::clock::{Clock, SystemClock};
use renewal_core::config::Settings;
use renewal_core::delivery::SlackDigestDeliveryService;
use renewal_core::digest::{DigestSource, RenewalDigestService};
use renewal_core::formatter::SlackDigestFormatter;
use renewal_core::ingestion::{IngestionService, SnapshotFetcher, StubStripeClient};
use renewal_core::renewals::SubscriptionRenewalAnalyzer;
use renewal_core::slack::{SlackWebhookClient, WebhookTransport};
use renewal_core::store::{CredentialStore, SnapshotStore, WebhookStore};
use renewal_db::{CredentialRepository, SnapshotRepository, WebhookRepository};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub credentials: Arc<dyn CredentialStore>,
    pub snapshots: Arc<dyn SnapshotStore>,
    pub webhooks: Arc<dyn WebhookStore>,
    pub digests: Arc<dyn DigestSource>,
    pub ingestion: Arc<IngestionService>,
    pub delivery: Arc<SlackDigestDeliveryService>,
}

#[derive(Clone, Debug)]
pub struct RequestId(pub String);

impl AppState {
    pub fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        let transport = SlackWebhookClient::new(Duration::from_secs(settings.slack_timeout_secs))?;
        Ok(Self::new(
            settings,
            Arc::new(SystemClock),
            Arc::new(StubStripeClient),
            Arc::new(transport),
        ))
    }

    pub fn new(
        settings: Settings,
        clock: Arc<dyn Clock>,
        fetcher: Arc<dyn SnapshotFetcher>,
        transport: Arc<dyn WebhookTransport>,
    ) -> Self {
        let credentials: Arc<dyn CredentialStore> = Arc::new(CredentialRepository::new(clock.clone()));
        let snapshots: Arc<dyn SnapshotStore> = Arc::new(SnapshotRepository::new());
        let webhooks: Arc<dyn WebhookStore> = Arc::new(WebhookRepository::new(clock.clone()));

        let digests: Arc<dyn DigestSource> = Arc::new(RenewalDigestService::new(
            snapshots.clone(),
            SubscriptionRenewalAnalyzer::new(clock),
        ));

        let mut formatter = SlackDigestFormatter::new(settings.max_detail_lines);
        if let Some(base) = &settings.stripe_dashboard_url {
            formatter = formatter.with_dashboard_url(base.as_str());
        }

        let ingestion = IngestionService::new(credentials.clone(), fetcher, snapshots.clone());
        let delivery =
            SlackDigestDeliveryService::new(digests.clone(), webhooks.clone(), transport, formatter);

        Self {
            settings: Arc::new(settings),
            credentials,
            snapshots,
            webhooks,
            digests,
            ingestion: Arc::new(ingestion),
            delivery: Arc::new(delivery),
        }
    }
}
