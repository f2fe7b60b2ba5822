use renewal_core::config::Settings;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

mod error;
mod middleware;
mod routes;
mod state;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let settings = Settings::from_env();
    let addr: SocketAddr = settings.api_bind.parse()?;

    info!(
        env = %settings.renewal_env,
        window_days = settings.window_days,
        slack_timeout_secs = settings.slack_timeout_secs,
        dashboard_links = settings.stripe_dashboard_url.is_some(),
        "loaded settings"
    );

    let state = AppState::from_settings(settings)?;
    let app = routes::app(state);

    info!(%addr, "starting api");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
