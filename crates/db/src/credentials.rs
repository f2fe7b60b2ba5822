use async_trait::async_trait;
use renewal_core::auth::fingerprint;
use renewal_core::clock::{Clock, SystemClock};
use renewal_core::store::CredentialStore;
use renewal_core::types::StoredCredential;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Credentials in first-ingested order. Only fingerprints are kept.
pub struct CredentialRepository {
    clock: Arc<dyn Clock>,
    credentials: RwLock<Vec<StoredCredential>>,
}

impl Default for CredentialRepository {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl CredentialRepository {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            credentials: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CredentialStore for CredentialRepository {
    async fn save_credential(&self, stripe_secret_key: &str) -> StoredCredential {
        let fingerprint = fingerprint(stripe_secret_key);
        let now = self.clock.now();
        let mut credentials = self.credentials.write().await;

        if let Some(existing) = credentials.iter_mut().find(|c| c.fingerprint == fingerprint) {
            existing.last_ingested_at = now;
            return existing.clone();
        }

        let stored = StoredCredential {
            fingerprint,
            created_at: now,
            last_ingested_at: now,
        };
        credentials.push(stored.clone());
        stored
    }

    async fn list_credentials(&self) -> Vec<StoredCredential> {
        self.credentials.read().await.clone()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Yields each time in turn, then repeats the last one.
    pub(crate) fn sequence_clock(times: Vec<DateTime<Utc>>) -> Arc<dyn Clock> {
        let last = *times.last().unwrap();
        let queue = Mutex::new(VecDeque::from(times));
        Arc::new(move || queue.lock().unwrap().pop_front().unwrap_or(last))
    }

    #[tokio::test]
    async fn test_list_credentials_returns_copy_with_timestamp() {
        let repo = CredentialRepository::default();

        repo.save_credential("sk_test_example").await;

        let mut credentials = repo.list_credentials().await;
        assert_eq!(credentials.len(), 1);
        let stored = &credentials[0];
        assert_eq!(stored.fingerprint, fingerprint("sk_test_example"));
        assert_eq!(stored.last_ingested_at, stored.created_at);

        credentials.clear();
        assert_eq!(repo.list_credentials().await.len(), 1);
    }

    #[tokio::test]
    async fn test_resave_refreshes_last_ingested_at_without_duplicating() {
        let first = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let refreshed = first + Duration::minutes(5);
        let repo = CredentialRepository::new(sequence_clock(vec![first, refreshed]));

        let initial = repo.save_credential("sk_test_example").await;
        let updated = repo.save_credential("sk_test_example").await;

        let all = repo.list_credentials().await;
        assert_eq!(all.len(), 1);
        assert_eq!(initial.created_at, first);
        assert_eq!(updated.created_at, first);
        assert_eq!(updated.last_ingested_at, refreshed);
        assert_eq!(all[0], updated);
    }

    #[tokio::test]
    async fn test_list_keeps_insertion_order() {
        let repo = CredentialRepository::default();

        for key in ["sk_test_b", "sk_test_a", "sk_test_c", "sk_test_a"] {
            repo.save_credential(key).await;
        }

        let fingerprints: Vec<String> = repo
            .list_credentials()
            .await
            .into_iter()
            .map(|c| c.fingerprint)
            .collect();
        assert_eq!(
            fingerprints,
            vec![fingerprint("sk_test_b"), fingerprint("sk_test_a"), fingerprint("sk_test_c")]
        );
    }

    #[tokio::test]
    async fn test_raw_key_is_never_stored() {
        let repo = CredentialRepository::default();

        let stored = repo.save_credential("sk_live_secret").await;

        assert_ne!(stored.fingerprint, "sk_live_secret");
        assert!(!format!("{:?}", repo.list_credentials().await).contains("sk_live_secret"));
    }
}
