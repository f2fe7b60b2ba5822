use axum::{
    extract::{Path, Query, State},
    routing::get,
    Extension, Json, Router,
};
use renewal_core::types::Digest;
use serde::Deserialize;

use crate::{
    error::ApiResult,
    routes::resolve_window_days,
    state::{AppState, RequestId},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/digest/{stripe_secret_key}", get(get_digest))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct DigestQuery {
    window_days: Option<i64>,
}

async fn get_digest(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(stripe_secret_key): Path<String>,
    Query(query): Query<DigestQuery>,
) -> ApiResult<Json<Digest>> {
    let window_days = resolve_window_days(query.window_days, &state, &request_id)?;
    let digest = state.digests.build_digest(&stripe_secret_key, window_days).await;
    Ok(Json(digest))
}

#[cfg(test)]
mod tests {
    use crate::routes::{app, testing::*};
    use axum::http::StatusCode;
    use chrono::Duration;
    use renewal_core::auth::fingerprint;
    use renewal_core::types::SubscriptionSnapshot;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_get_digest_returns_digest_summary() {
        let state = test_state(Arc::new(RecordingTransport::default()));
        let inside = as_of() + Duration::days(3);
        state
            .snapshots
            .save_snapshot(
                "sk_test_digest",
                SubscriptionSnapshot {
                    customers: vec![json!({"id": "cus_123"})],
                    subscriptions: vec![
                        json!({
                            "id": "sub_in_window",
                            "current_period_end": inside.to_rfc3339(),
                            "status": "active",
                            "amount_due": 2500,
                        }),
                        json!({
                            "id": "sub_outside_window",
                            "current_period_end": (as_of() + Duration::days(10)).to_rfc3339(),
                            "status": "active",
                            "amount_due": 5000,
                        }),
                    ],
                },
            )
            .await;

        let (status, _, body) =
            send(app(state), get_request("/digest/sk_test_digest?window_days=5")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stripe_credential_fingerprint"], fingerprint("sk_test_digest"));
        assert_eq!(body["found_snapshot"], true);
        assert_eq!(body["customer_count"], 1);
        assert_eq!(body["subscription_count"], 2);
        assert_eq!(
            body["upcoming"],
            json!({
                "as_of": "2024-06-01T00:00:00+00:00",
                "window_days": 5,
                "total_amount_due": 2500.0,
                "upcoming_subscriptions": [{
                    "id": "sub_in_window",
                    "current_period_end": "2024-06-04T00:00:00+00:00",
                    "status": "active",
                    "amount_due": 2500.0,
                }],
            })
        );
    }

    #[tokio::test]
    async fn test_get_digest_missing_snapshot_uses_default_window() {
        let state = test_state(Arc::new(RecordingTransport::default()));

        let (status, _, body) = send(app(state), get_request("/digest/sk_missing_digest")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["found_snapshot"], false);
        assert_eq!(body["customer_count"], 0);
        assert_eq!(body["subscription_count"], 0);
        assert_eq!(body["upcoming"]["window_days"], 7);
        assert_eq!(body["upcoming"]["total_amount_due"], 0.0);
        assert_eq!(body["upcoming"]["upcoming_subscriptions"], json!([]));
    }

    #[tokio::test]
    async fn test_get_digest_rejects_negative_window() {
        let state = test_state(Arc::new(RecordingTransport::default()));

        let (status, _, body) =
            send(app(state), get_request("/digest/sk_test_digest?window_days=-1")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_request");
    }
}
