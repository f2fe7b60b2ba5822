use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use renewal_core::auth::{fingerprint, is_valid_secret_key};
use renewal_core::types::{StoredCredential, SubscriptionSnapshot};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    error::{ApiResult, AppError},
    state::{AppState, RequestId},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ingest", post(ingest))
        .route("/credentials", get(list_credentials))
        .route("/snapshots/{stripe_secret_key}", get(get_snapshot))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct IngestRequest {
    stripe_secret_key: String,
}

#[derive(Debug, Serialize)]
struct IngestResponse {
    ok: bool,
    subscription_snapshot: SubscriptionSnapshot,
}

#[derive(Debug, Serialize)]
struct CredentialListResponse {
    credentials: Vec<StoredCredential>,
}

#[derive(Debug, Serialize)]
struct SnapshotResponse {
    stripe_credential_fingerprint: String,
    subscription_snapshot: SubscriptionSnapshot,
}

async fn ingest(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(payload): Json<IngestRequest>,
) -> ApiResult<Json<IngestResponse>> {
    if !is_valid_secret_key(&payload.stripe_secret_key) {
        return Err(AppError::Unprocessable(
            "stripe_secret_key must be a Stripe secret or restricted key".to_string(),
        )
        .with_request_id(&request_id.0));
    }

    let snapshot = state
        .ingestion
        .ingest(&payload.stripe_secret_key)
        .await
        .map_err(|err| {
            warn!(error = %err, "ingestion failed");
            AppError::Internal.with_request_id(&request_id.0)
        })?;

    Ok(Json(IngestResponse {
        ok: true,
        subscription_snapshot: snapshot,
    }))
}

async fn list_credentials(State(state): State<AppState>) -> Json<CredentialListResponse> {
    Json(CredentialListResponse {
        credentials: state.credentials.list_credentials().await,
    })
}

async fn get_snapshot(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(stripe_secret_key): Path<String>,
) -> ApiResult<Json<SnapshotResponse>> {
    let snapshot = state
        .snapshots
        .get_snapshot(&stripe_secret_key)
        .await
        .ok_or_else(|| {
            AppError::NotFound("Snapshot not found".to_string()).with_request_id(&request_id.0)
        })?;

    Ok(Json(SnapshotResponse {
        stripe_credential_fingerprint: fingerprint(&stripe_secret_key),
        subscription_snapshot: snapshot,
    }))
}
