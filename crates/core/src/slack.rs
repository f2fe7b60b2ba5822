use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::time::Duration;
use thiserror::Error;

use crate::types::{SlackPayload, TransportResponse};

const BODY_EXCERPT_CHARS: usize = 512;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Slack webhook returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Slack webhook request failed: {0}")]
    Request(reqwest::Error),
}

// The webhook URL is a credential; keep it out of the error text.
impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        DeliveryError::Request(err.without_url())
    }
}

impl DeliveryError {
    pub fn status(&self) -> Option<u16> {
        match self {
            DeliveryError::Status { status, .. } => Some(*status),
            DeliveryError::Request(err) => err.status().map(|s| s.as_u16()),
        }
    }
}

/// One POST per call. No retries; a timeout surfaces as `DeliveryError::Request`.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn post_message(
        &self,
        webhook_url: &str,
        payload: &SlackPayload,
    ) -> Result<TransportResponse, DeliveryError>;
}

pub struct SlackWebhookClient {
    client: reqwest::Client,
}

impl SlackWebhookClient {
    pub fn new(timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WebhookTransport for SlackWebhookClient {
    async fn post_message(
        &self,
        webhook_url: &str,
        payload: &SlackPayload,
    ) -> Result<TransportResponse, DeliveryError> {
        let resp = self.client.post(webhook_url).json(payload).send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if status.is_client_error() || status.is_server_error() {
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body: text.chars().take(BODY_EXCERPT_CHARS).collect(),
            });
        }

        Ok(TransportResponse {
            status_code: status.as_u16(),
            body: parse_body(text),
        })
    }
}

fn parse_body(text: String) -> JsonValue {
    serde_json::from_str(&text).unwrap_or(JsonValue::String(text))
}
