pub mod digest;
pub mod health;
pub mod ingest;
pub mod slack;

use axum::{middleware::from_fn, Router};

use crate::error::{ApiResult, AppError};
use crate::middleware::request_id::request_id;
use crate::state::{AppState, RequestId};

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(health::router(state.clone()))
        .merge(ingest::router(state.clone()))
        .merge(digest::router(state.clone()))
        .merge(slack::router(state))
        .layer(from_fn(request_id))
}

/// Falls back to the configured default; negative windows are rejected.
pub(crate) fn resolve_window_days(
    requested: Option<i64>,
    state: &AppState,
    request_id: &RequestId,
) -> ApiResult<i64> {
    let window_days = requested.unwrap_or(state.settings.window_days);
    if window_days < 0 {
        return Err(
            AppError::BadRequest("window_days must be zero or greater".to_string())
                .with_request_id(&request_id.0),
        );
    }
    Ok(window_days)
}
