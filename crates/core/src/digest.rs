use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::auth::fingerprint;
use crate::renewals::SubscriptionRenewalAnalyzer;
use crate::store::SnapshotStore;
use crate::types::{Digest, SubscriptionRecord};

#[async_trait]
pub trait DigestSource: Send + Sync {
    async fn build_digest(&self, stripe_secret_key: &str, window_days: i64) -> Digest;
}

/// Builds renewal digests from cached subscription snapshots.
pub struct RenewalDigestService {
    snapshot_store: Arc<dyn SnapshotStore>,
    analyzer: SubscriptionRenewalAnalyzer,
}

impl RenewalDigestService {
    pub fn new(snapshot_store: Arc<dyn SnapshotStore>, analyzer: SubscriptionRenewalAnalyzer) -> Self {
        Self {
            snapshot_store,
            analyzer,
        }
    }
}

#[async_trait]
impl DigestSource for RenewalDigestService {
    async fn build_digest(&self, stripe_secret_key: &str, window_days: i64) -> Digest {
        let account_fingerprint = fingerprint(stripe_secret_key);
        let snapshot = self.snapshot_store.get_snapshot(stripe_secret_key).await;

        let (customer_count, subscriptions) = match &snapshot {
            Some(snapshot) => (snapshot.customers.len(), snapshot.subscriptions.as_slice()),
            None => (0, &[][..]),
        };
        let records: Vec<SubscriptionRecord> =
            subscriptions.iter().map(SubscriptionRecord::from_json).collect();

        let upcoming = self.analyzer.find_upcoming(&records, window_days);

        debug!(
            fingerprint = %account_fingerprint,
            found_snapshot = snapshot.is_some(),
            subscription_count = subscriptions.len(),
            upcoming_count = upcoming.upcoming_subscriptions.len(),
            window_days,
            "built renewal digest"
        );

        Digest {
            account_fingerprint,
            found_snapshot: snapshot.is_some(),
            customer_count,
            subscription_count: subscriptions.len(),
            upcoming,
        }
    }
}
