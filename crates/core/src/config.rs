use serde::Deserialize;

pub const DEFAULT_WINDOW_DAYS: i64 = 7;
pub const DEFAULT_SLACK_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_MAX_DETAIL_LINES: usize = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub renewal_env: String,
    pub api_bind: String,
    pub window_days: i64,
    pub slack_timeout_secs: u64,
    pub max_detail_lines: usize,
    pub stripe_dashboard_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            renewal_env: "development".to_string(),
            api_bind: "0.0.0.0:3000".to_string(),
            window_days: DEFAULT_WINDOW_DAYS,
            slack_timeout_secs: DEFAULT_SLACK_TIMEOUT_SECS,
            max_detail_lines: DEFAULT_MAX_DETAIL_LINES,
            stripe_dashboard_url: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let renewal_env = lookup("RENEWAL_ENV").unwrap_or(defaults.renewal_env);
        let api_bind = lookup("RENEWAL_API_BIND").unwrap_or(defaults.api_bind);
        let window_days = lookup("RENEWAL_WINDOW_DAYS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.window_days);
        let slack_timeout_secs = lookup("RENEWAL_SLACK_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.slack_timeout_secs);
        let max_detail_lines = lookup("RENEWAL_MAX_DETAIL_LINES")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_detail_lines);
        let stripe_dashboard_url = lookup("RENEWAL_STRIPE_DASHBOARD_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty());

        Self {
            renewal_env,
            api_bind,
            window_days,
            slack_timeout_secs,
            max_detail_lines,
            stripe_dashboard_url,
        }
    }

    pub fn is_production(&self) -> bool {
        self.renewal_env == "production"
    }
}
