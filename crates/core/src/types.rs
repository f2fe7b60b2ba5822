use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// RFC 3339 timestamps with a numeric `+00:00` offset instead of `Z`.
/// Fractional seconds, when present, are always rendered as microseconds.
pub mod iso8601 {
    use chrono::{DateTime, SecondsFormat, Timelike, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(value: &DateTime<Utc>) -> String {
        let precision = if value.nanosecond() == 0 {
            SecondsFormat::Secs
        } else {
            SecondsFormat::Micros
        };
        value.to_rfc3339_opts(precision, false)
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

/// A point-in-time capture of an account's customers and subscriptions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
    #[serde(default)]
    pub customers: Vec<JsonValue>,
    #[serde(default)]
    pub subscriptions: Vec<JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCredential {
    #[serde(rename = "stripe_credential_fingerprint")]
    pub fingerprint: String,
    #[serde(with = "iso8601")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "iso8601")]
    pub last_ingested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredWebhook {
    #[serde(rename = "stripe_credential_fingerprint")]
    pub fingerprint: String,
    pub webhook_url: String,
    #[serde(with = "iso8601")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "iso8601")]
    pub last_configured_at: DateTime<Utc>,
}

impl StoredWebhook {
    pub fn new(fingerprint: String, webhook_url: String, now: DateTime<Utc>) -> Self {
        Self {
            fingerprint,
            webhook_url,
            created_at: now,
            last_configured_at: now,
        }
    }

    pub fn reconfigure(&mut self, webhook_url: String, now: DateTime<Utc>) {
        self.webhook_url = webhook_url;
        self.last_configured_at = now;
    }
}

/// Raw `current_period_end` as it arrives from a snapshot or a caller.
#[derive(Debug, Clone, PartialEq)]
pub enum PeriodEnd {
    Aware(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
    Epoch(f64),
    Text(String),
}

impl PeriodEnd {
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::Number(number) => number.as_f64().map(PeriodEnd::Epoch),
            JsonValue::String(text) => Some(PeriodEnd::Text(text.clone())),
            _ => None,
        }
    }
}

impl From<DateTime<Utc>> for PeriodEnd {
    fn from(value: DateTime<Utc>) -> Self {
        PeriodEnd::Aware(value.fixed_offset())
    }
}

impl From<DateTime<FixedOffset>> for PeriodEnd {
    fn from(value: DateTime<FixedOffset>) -> Self {
        PeriodEnd::Aware(value)
    }
}

impl From<NaiveDateTime> for PeriodEnd {
    fn from(value: NaiveDateTime) -> Self {
        PeriodEnd::Naive(value)
    }
}

impl From<&str> for PeriodEnd {
    fn from(value: &str) -> Self {
        PeriodEnd::Text(value.to_string())
    }
}

impl From<i64> for PeriodEnd {
    fn from(value: i64) -> Self {
        PeriodEnd::Epoch(value as f64)
    }
}

impl From<f64> for PeriodEnd {
    fn from(value: f64) -> Self {
        PeriodEnd::Epoch(value)
    }
}

/// Raw `amount_due`: a number or a numeric string.
#[derive(Debug, Clone, PartialEq)]
pub enum AmountDue {
    Number(f64),
    Text(String),
}

impl AmountDue {
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::Number(number) => number.as_f64().map(AmountDue::Number),
            JsonValue::String(text) => Some(AmountDue::Text(text.clone())),
            _ => None,
        }
    }
}

impl From<f64> for AmountDue {
    fn from(value: f64) -> Self {
        AmountDue::Number(value)
    }
}

impl From<i64> for AmountDue {
    fn from(value: i64) -> Self {
        AmountDue::Number(value as f64)
    }
}

impl From<&str> for AmountDue {
    fn from(value: &str) -> Self {
        AmountDue::Text(value.to_string())
    }
}

/// Loosely-typed subscription as stored in a snapshot. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionRecord {
    pub id: Option<String>,
    pub current_period_end: Option<PeriodEnd>,
    pub status: Option<String>,
    pub amount_due: Option<AmountDue>,
}

impl SubscriptionRecord {
    /// Non-object values yield a record with every field absent.
    pub fn from_json(value: &JsonValue) -> Self {
        let Some(fields) = value.as_object() else {
            return Self::default();
        };

        Self {
            id: fields.get("id").and_then(json_text),
            current_period_end: fields.get("current_period_end").and_then(PeriodEnd::from_json),
            status: fields.get("status").and_then(json_text),
            amount_due: fields.get("amount_due").and_then(AmountDue::from_json),
        }
    }
}

fn json_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(text) => Some(text.clone()),
        JsonValue::Number(number) => Some(number.to_string()),
        JsonValue::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpcomingRenewal {
    pub id: Option<String>,
    #[serde(with = "iso8601")]
    pub current_period_end: DateTime<Utc>,
    pub status: Option<String>,
    pub amount_due: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(with = "iso8601")]
    pub as_of: DateTime<Utc>,
    pub window_days: i64,
    pub total_amount_due: f64,
    pub upcoming_subscriptions: Vec<UpcomingRenewal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Digest {
    #[serde(rename = "stripe_credential_fingerprint")]
    pub account_fingerprint: String,
    pub found_snapshot: bool,
    pub customer_count: usize,
    pub subscription_count: usize,
    pub upcoming: AnalysisResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextObject {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: TextObject,
}

impl Block {
    pub fn mrkdwn_section(text: impl Into<String>) -> Self {
        Self {
            kind: "section".to_string(),
            text: TextObject {
                kind: "mrkdwn".to_string(),
                text: text.into(),
            },
        }
    }
}

/// Chat message body accepted by a Slack incoming webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlackPayload {
    pub text: String,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportResponse {
    pub status_code: u16,
    pub body: JsonValue,
}
