use async_trait::async_trait;
use renewal_core::auth::fingerprint;
use renewal_core::store::SnapshotStore;
use renewal_core::types::SubscriptionSnapshot;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Latest snapshot per account; a save replaces the previous one.
#[derive(Default)]
pub struct SnapshotRepository {
    snapshots: RwLock<HashMap<String, SubscriptionSnapshot>>,
}

impl SnapshotRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for SnapshotRepository {
    async fn save_snapshot(&self, stripe_secret_key: &str, snapshot: SubscriptionSnapshot) {
        self.snapshots
            .write()
            .await
            .insert(fingerprint(stripe_secret_key), snapshot);
    }

    async fn get_snapshot(&self, stripe_secret_key: &str) -> Option<SubscriptionSnapshot> {
        self.snapshots
            .read()
            .await
            .get(&fingerprint(stripe_secret_key))
            .cloned()
    }
}
