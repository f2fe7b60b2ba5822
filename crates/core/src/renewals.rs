use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use std::sync::Arc;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::types::{AmountDue, AnalysisResult, PeriodEnd, SubscriptionRecord, UpcomingRenewal};

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z"];

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Filters subscriptions for renewals falling inside a forward-looking window.
#[derive(Clone)]
pub struct SubscriptionRenewalAnalyzer {
    clock: Arc<dyn Clock>,
}

impl Default for SubscriptionRenewalAnalyzer {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl SubscriptionRenewalAnalyzer {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn find_upcoming<'a, I>(&self, subscriptions: I, window_days: i64) -> AnalysisResult
    where
        I: IntoIterator<Item = &'a SubscriptionRecord>,
    {
        find_upcoming(subscriptions, window_days, self.clock.now())
    }
}

/// Selects records whose period end lies in `[as_of, as_of + window_days]`, both ends
/// inclusive, preserving input order.
pub fn find_upcoming<'a, I>(subscriptions: I, window_days: i64, as_of: DateTime<Utc>) -> AnalysisResult
where
    I: IntoIterator<Item = &'a SubscriptionRecord>,
{
    let window_end = window_end(as_of, window_days);

    let mut upcoming = Vec::new();
    let mut total_amount_due = 0.0;

    for subscription in subscriptions {
        let Some(period_end) = subscription.current_period_end.as_ref().and_then(parse_period_end)
        else {
            debug!(id = ?subscription.id, "skipping subscription without a usable period end");
            continue;
        };

        if period_end < as_of || period_end > window_end {
            continue;
        }

        let amount_due = subscription.amount_due.as_ref().and_then(parse_amount);
        if let Some(amount) = amount_due {
            total_amount_due += amount;
        }

        upcoming.push(UpcomingRenewal {
            id: subscription.id.clone(),
            current_period_end: period_end,
            status: subscription.status.clone(),
            amount_due,
        });
    }

    AnalysisResult {
        as_of,
        window_days,
        total_amount_due,
        upcoming_subscriptions: upcoming,
    }
}

fn window_end(as_of: DateTime<Utc>, window_days: i64) -> DateTime<Utc> {
    TimeDelta::try_days(window_days)
        .and_then(|span| as_of.checked_add_signed(span))
        .unwrap_or(if window_days < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
}

/// Normalizes any accepted period-end shape to UTC. `None` means "no period end".
pub fn parse_period_end(value: &PeriodEnd) -> Option<DateTime<Utc>> {
    match value {
        PeriodEnd::Aware(ts) => Some(ts.with_timezone(&Utc)),
        PeriodEnd::Naive(ts) => Some(ts.and_utc()),
        PeriodEnd::Epoch(seconds) => from_epoch_seconds(*seconds),
        PeriodEnd::Text(raw) => parse_iso8601(raw),
    }
}

/// Numbers pass through; numeric strings are parsed. Non-finite values count as unknown.
pub fn parse_amount(value: &AmountDue) -> Option<f64> {
    let amount = match value {
        AmountDue::Number(n) => *n,
        AmountDue::Text(raw) => raw.trim().parse::<f64>().ok()?,
    };
    amount.is_finite().then_some(amount)
}

fn from_epoch_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }

    let mut whole = seconds.floor();
    let mut nanos = ((seconds - whole) * 1e9).round() as u32;
    if nanos >= 1_000_000_000 {
        whole += 1.0;
        nanos = 0;
    }

    if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp(whole as i64, nanos)
}

fn parse_iso8601(raw: &str) -> Option<DateTime<Utc>> {
    let normalized = normalize_iso8601(raw);

    if let Some(parsed) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(&normalized, fmt).ok())
    {
        return Some(parsed.with_timezone(&Utc));
    }

    if let Some(parsed) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&normalized, fmt).ok())
    {
        return Some(parsed.and_utc());
    }

    NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}

/// Brings accepted ISO-8601 variants into the `T`-separated, minute-or-finer
/// shape that `OFFSET_FORMATS` and `NAIVE_FORMATS` parse.
fn normalize_iso8601(raw: &str) -> String {
    let mut text = match raw.strip_suffix('Z') {
        Some(head) => format!("{head}+00:00"),
        None => raw.to_string(),
    };

    if text.as_bytes().get(10) == Some(&b' ') {
        text.replace_range(10..11, "T");
    }

    // `2024-06-05T12` -> `2024-06-05T12:00`
    if text.as_bytes().get(10) == Some(&b'T') {
        let hour_only = text.get(11..).is_some_and(|time| {
            let digits = time.find(|c: char| !c.is_ascii_digit()).unwrap_or(time.len());
            digits == 2 && !time[digits..].starts_with(':')
        });
        if hour_only {
            text.insert_str(13, ":00");
        }
    }

    text
}
