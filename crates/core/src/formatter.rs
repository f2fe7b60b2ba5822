use crate::config::DEFAULT_MAX_DETAIL_LINES;
use crate::types::{iso8601, Block, Digest, SlackPayload, UpcomingRenewal};

/// Renders renewal digests into Slack `mrkdwn` payloads.
#[derive(Debug, Clone)]
pub struct SlackDigestFormatter {
    max_detail_lines: usize,
    dashboard_url: Option<String>,
}

impl Default for SlackDigestFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DETAIL_LINES)
    }
}

impl SlackDigestFormatter {
    pub fn new(max_detail_lines: usize) -> Self {
        Self {
            max_detail_lines,
            dashboard_url: None,
        }
    }

    /// Appends a `View in Stripe` link to each detail line that has an id.
    pub fn with_dashboard_url(mut self, base_url: impl Into<String>) -> Self {
        self.dashboard_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn format_digest(&self, digest: &Digest) -> SlackPayload {
        let upcoming = &digest.upcoming;
        let summary = summary_text(
            non_blank(&digest.account_fingerprint).unwrap_or("unknown"),
            upcoming.upcoming_subscriptions.len(),
            upcoming.window_days,
            Some(upcoming.total_amount_due),
        );

        let mut blocks = vec![Block::mrkdwn_section(summary.clone())];
        let detail_lines = self.detail_lines(&upcoming.upcoming_subscriptions);
        if !detail_lines.is_empty() {
            blocks.push(Block::mrkdwn_section(detail_lines.join("\n")));
        }

        SlackPayload {
            text: strip_emphasis(&summary),
            blocks,
        }
    }

    fn detail_lines(&self, subscriptions: &[UpcomingRenewal]) -> Vec<String> {
        let shown = subscriptions.len().min(self.max_detail_lines);

        let mut lines: Vec<String> = subscriptions[..shown]
            .iter()
            .map(|subscription| self.detail_line(subscription))
            .collect();

        let remaining = subscriptions.len() - shown;
        if remaining > 0 {
            lines.push(format!(
                "- ...and {remaining} more subscription{}",
                plural(remaining)
            ));
        }

        lines
    }

    fn detail_line(&self, subscription: &UpcomingRenewal) -> String {
        let id = subscription.id.as_deref().and_then(non_blank);
        let status = subscription
            .status
            .as_deref()
            .and_then(non_blank)
            .unwrap_or("status unknown");

        let mut line = format!(
            "- `{}` | {} | renews {} | {}",
            id.unwrap_or("(no id)"),
            status,
            iso8601::format(&subscription.current_period_end),
            format_currency(subscription.amount_due),
        );

        if let (Some(base), Some(id)) = (self.dashboard_url.as_deref(), id) {
            line.push_str(&format!(" | <{base}/subscriptions/{id}|View in Stripe>"));
        }

        line
    }
}

fn summary_text(
    fingerprint: &str,
    subscription_count: usize,
    window_days: i64,
    total_amount_due: Option<f64>,
) -> String {
    let days = if window_days == 1 { "day" } else { "days" };
    format!(
        "*Renewal digest for* `{fingerprint}`\n\
         *{subscription_count}* upcoming subscription{} in the next {window_days} {days} | \
         Projected total: {}",
        plural(subscription_count),
        format_currency(total_amount_due),
    )
}

fn strip_emphasis(text: &str) -> String {
    text.replace('*', "")
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// `$1,234.50`, or `n/a` when the amount is unknown.
pub fn format_currency(amount: Option<f64>) -> String {
    let Some(amount) = amount else {
        return "n/a".to_string();
    };

    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if amount < 0.0 { "-" } else { "" };

    format!("${sign}{}.{cents}", group_thousands(whole))
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
