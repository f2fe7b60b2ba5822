use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use renewal_core::delivery::DeliveryOutcome;
use renewal_core::types::{Digest, SlackPayload, StoredWebhook, TransportResponse};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::{
    error::{ApiResult, AppError},
    routes::resolve_window_days,
    state::{AppState, RequestId},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/slack/webhook", post(configure_webhook))
        .route("/slack/webhook/{stripe_secret_key}", get(get_webhook))
        .route("/slack/digest", post(deliver_digest))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ConfigureWebhookRequest {
    stripe_secret_key: String,
    webhook_url: String,
}

#[derive(Debug, Serialize)]
struct OkResponse {
    ok: bool,
}

#[derive(Debug, Serialize)]
struct WebhookResponse {
    webhook: StoredWebhook,
}

#[derive(Debug, Deserialize)]
struct DeliverDigestRequest {
    stripe_secret_key: String,
    window_days: Option<i64>,
}

#[derive(Debug, Serialize)]
struct DeliveryResponse {
    ok: bool,
    stripe_credential_fingerprint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    digest: Option<Digest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    slack_payload: Option<SlackPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    slack_response: Option<TransportResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<DeliveryOutcome> for DeliveryResponse {
    fn from(outcome: DeliveryOutcome) -> Self {
        let ok = outcome.is_delivered();
        let reason = outcome.reason();
        let mut resp = DeliveryResponse {
            ok,
            stripe_credential_fingerprint: outcome.fingerprint().to_string(),
            reason,
            digest: None,
            slack_payload: None,
            slack_response: None,
            error: None,
        };

        match outcome {
            DeliveryOutcome::Delivered {
                digest,
                payload,
                response,
                ..
            } => {
                resp.digest = Some(digest);
                resp.slack_payload = Some(payload);
                resp.slack_response = Some(response);
            }
            DeliveryOutcome::DeliveryFailed {
                digest,
                payload,
                error,
                ..
            } => {
                resp.digest = Some(digest);
                resp.slack_payload = Some(payload);
                resp.error = Some(error);
            }
            DeliveryOutcome::NotConfigured { .. } => {}
        }

        resp
    }
}

async fn configure_webhook(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(payload): Json<ConfigureWebhookRequest>,
) -> ApiResult<Json<OkResponse>> {
    if payload.stripe_secret_key.trim().is_empty() {
        return Err(AppError::BadRequest("stripe_secret_key required".to_string())
            .with_request_id(&request_id.0));
    }
    let url = validate_url(&payload.webhook_url, state.settings.is_production())
        .map_err(|msg| AppError::BadRequest(msg.to_string()).with_request_id(&request_id.0))?;

    state
        .webhooks
        .configure_webhook(&payload.stripe_secret_key, url)
        .await;

    Ok(Json(OkResponse { ok: true }))
}

async fn get_webhook(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(stripe_secret_key): Path<String>,
) -> ApiResult<Json<WebhookResponse>> {
    let webhook = state
        .webhooks
        .get_webhook(&stripe_secret_key)
        .await
        .ok_or_else(|| {
            AppError::NotFound("Slack webhook not found".to_string()).with_request_id(&request_id.0)
        })?;

    Ok(Json(WebhookResponse { webhook }))
}

/// Always 200: an unconfigured webhook or failed post is reported in the body.
async fn deliver_digest(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(payload): Json<DeliverDigestRequest>,
) -> ApiResult<Json<DeliveryResponse>> {
    let window_days = resolve_window_days(payload.window_days, &state, &request_id)?;
    let outcome = state
        .delivery
        .deliver_digest(&payload.stripe_secret_key, window_days)
        .await;

    Ok(Json(outcome.into()))
}

fn validate_url(url: &str, production: bool) -> Result<&str, &'static str> {
    let url = url.trim();
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or("webhook_url must start with http:// or https://")?;
    let host = webhook_host(rest);
    if host.is_empty() {
        return Err("webhook_url must include a host");
    }
    if production && is_local_host(&host) {
        return Err("webhook_url cannot target localhost in production");
    }
    Ok(url)
}

/// Host part of the authority, lowercased, with userinfo and port removed.
/// IPv6 literals keep their brackets.
fn webhook_host(rest: &str) -> String {
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..end];
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    let host = if host_port.starts_with('[') {
        host_port.find(']').map_or(host_port, |close| &host_port[..=close])
    } else {
        host_port.split_once(':').map_or(host_port, |(host, _)| host)
    };
    host.trim_end_matches('.').to_ascii_lowercase()
}

fn is_local_host(host: &str) -> bool {
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }
    let literal = host.trim_start_matches('[').trim_end_matches(']');
    literal
        .parse::<IpAddr>()
        .is_ok_and(|ip| ip.is_loopback() || ip.is_unspecified())
}

#[cfg(test)]
mod tests {
    use super::validate_url;
    use crate::routes::{app, testing::*};
    use axum::http::StatusCode;
    use renewal_core::auth::fingerprint;
    use renewal_core::config::Settings;
    use serde_json::json;
    use std::sync::Arc;

    const HOOK: &str = "https://hooks.slack.com/services/dummy";

    #[tokio::test]
    async fn test_configure_webhook_saves_webhook() {
        let state = test_state(Arc::new(RecordingTransport::default()));

        let (status, _, body) = send(
            app(state.clone()),
            post_json(
                "/slack/webhook",
                json!({"stripe_secret_key": "sk_test_dummy", "webhook_url": HOOK}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"ok": true}));

        let stored = state.webhooks.get_webhook("sk_test_dummy").await.unwrap();
        assert_eq!(stored.fingerprint, fingerprint("sk_test_dummy"));
        assert_eq!(stored.webhook_url, HOOK);
        assert_eq!(stored.created_at, as_of());
        assert_eq!(stored.last_configured_at, as_of());
    }

    #[tokio::test]
    async fn test_configure_webhook_rejects_non_http_url() {
        let state = test_state(Arc::new(RecordingTransport::default()));

        let (status, _, body) = send(
            app(state.clone()),
            post_json(
                "/slack/webhook",
                json!({"stripe_secret_key": "sk_test_dummy", "webhook_url": "ftp://example.com"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_request");
        assert!(state.webhooks.list_webhooks().await.is_empty());
    }

    #[tokio::test]
    async fn test_get_webhook_returns_stored_webhook() {
        let state = test_state(Arc::new(RecordingTransport::default()));
        state.webhooks.configure_webhook("sk_test_dummy", HOOK).await;

        let (status, _, body) =
            send(app(state), get_request("/slack/webhook/sk_test_dummy")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"webhook": {
                "stripe_credential_fingerprint": fingerprint("sk_test_dummy"),
                "webhook_url": HOOK,
                "created_at": "2024-06-01T00:00:00+00:00",
                "last_configured_at": "2024-06-01T00:00:00+00:00",
            }})
        );
    }

    #[tokio::test]
    async fn test_get_webhook_missing_is_404() {
        let state = test_state(Arc::new(RecordingTransport::default()));

        let (status, _, body) = send(app(state), get_request("/slack/webhook/sk_missing")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], "Slack webhook not found");
    }

    #[tokio::test]
    async fn test_deliver_digest_not_configured() {
        let transport = Arc::new(RecordingTransport::default());
        let state = test_state(transport.clone());

        let (status, _, body) = send(
            app(state),
            post_json("/slack/digest", json!({"stripe_secret_key": "sk_test_window", "window_days": 14})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "ok": false,
                "stripe_credential_fingerprint": fingerprint("sk_test_window"),
                "reason": "slack_webhook_not_configured",
            })
        );
        assert!(transport.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deliver_digest_uses_default_window_and_posts() {
        let transport = Arc::new(RecordingTransport::default());
        let state = test_state(transport.clone());
        state.webhooks.configure_webhook("sk_test_default", HOOK).await;

        let (status, _, body) = send(
            app(state),
            post_json("/slack/digest", json!({"stripe_secret_key": "sk_test_default"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert!(body.get("reason").is_none());
        assert_eq!(body["digest"]["upcoming"]["window_days"], 7);
        assert_eq!(body["slack_response"], json!({"status_code": 200, "body": "ok"}));
        assert!(body["slack_payload"]["text"]
            .as_str()
            .unwrap()
            .contains("in the next 7 days"));

        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, HOOK);
    }

    #[tokio::test]
    async fn test_deliver_digest_failure_is_reported_in_body() {
        let transport = Arc::new(RecordingTransport {
            fail_with: Some(500),
            ..Default::default()
        });
        let state = test_state(transport.clone());
        state.webhooks.configure_webhook("sk_test_fail", HOOK).await;

        let (status, _, body) = send(
            app(state),
            post_json("/slack/digest", json!({"stripe_secret_key": "sk_test_fail", "window_days": 3})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], false);
        assert_eq!(body["reason"], "slack_delivery_failed");
        assert_eq!(body["digest"]["upcoming"]["window_days"], 3);
        assert!(body["slack_payload"]["blocks"].is_array());
        assert!(body["error"].as_str().unwrap().contains("500"));
        assert!(body.get("slack_response").is_none());
    }

    #[tokio::test]
    async fn test_deliver_digest_rejects_negative_window() {
        let transport = Arc::new(RecordingTransport::default());
        let state = test_state(transport.clone());

        let (status, _, _) = send(
            app(state),
            post_json("/slack/digest", json!({"stripe_secret_key": "sk_test_x", "window_days": -2})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(transport.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dashboard_links_follow_settings() {
        let transport = Arc::new(RecordingTransport::default());
        let settings = Settings {
            stripe_dashboard_url: Some("https://dashboard.stripe.com".to_string()),
            ..Settings::default()
        };
        let state = test_state_with(settings, transport.clone());
        state.webhooks.configure_webhook("sk_test_links", HOOK).await;
        state
            .snapshots
            .save_snapshot(
                "sk_test_links",
                renewal_core::types::SubscriptionSnapshot {
                    customers: vec![],
                    subscriptions: vec![json!({
                        "id": "sub_1",
                        "current_period_end": "2024-06-02T00:00:00Z",
                        "status": "active",
                        "amount_due": 10,
                    })],
                },
            )
            .await;

        send(
            app(state),
            post_json("/slack/digest", json!({"stripe_secret_key": "sk_test_links"})),
        )
        .await;

        let calls = transport.calls.lock().unwrap();
        assert!(calls[0].1.blocks[1]
            .text
            .text
            .ends_with("<https://dashboard.stripe.com/subscriptions/sub_1|View in Stripe>"));
    }

    #[test]
    fn test_validate_url() {
        assert_eq!(validate_url(" https://hooks.slack.com/x ", false), Ok("https://hooks.slack.com/x"));
        assert!(validate_url("http://localhost:8080/hook", false).is_ok());
        assert!(validate_url("http://localhost:8080/hook", true).is_err());
        assert!(validate_url("https://127.0.0.1/hook", true).is_err());
        assert!(validate_url("https://", false).is_err());
        assert!(validate_url("hooks.slack.com/x", false).is_err());
        assert!(validate_url("http://user@/hook", false).is_err());
    }

    #[test]
    fn test_validate_url_local_hosts_behind_authority_tricks() {
        let local = [
            "http://user@localhost/hook",
            "http://user:pw@127.0.0.1:9000/hook",
            "http://[::1]/hook",
            "http://[::1]:8080/hook",
            "http://LOCALHOST:80/x",
            "http://localhost./x",
            "http://api.localhost/x",
            "http://127.0.0.2/x",
            "http://0.0.0.0/x",
            "http://localhost?x=1",
        ];
        for url in local {
            assert!(validate_url(url, true).is_err(), "{url} should be rejected in production");
            assert!(validate_url(url, false).is_ok(), "{url} should be accepted outside production");
        }

        assert!(validate_url("https://localhost.example.com/x", true).is_ok());
        assert!(validate_url("https://hooks.slack.com/services/T0/B0/x?user=a@localhost", true).is_ok());
    }
}
