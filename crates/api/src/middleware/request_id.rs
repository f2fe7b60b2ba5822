use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use nanoid::nanoid;
use tracing::{info_span, Instrument};

use crate::state::RequestId;

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Tags every request with a `req_` id, echoed back in `X-Request-Id`.
///
/// Handlers read it through `Extension<RequestId>`; log lines emitted while
/// serving the request carry it via the surrounding span. The path is left
/// out of the span since it can contain a raw Stripe key.
pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
    let id = format!("req_{}", nanoid!(16));
    req.extensions_mut().insert(RequestId(id.clone()));

    let span = info_span!("request", request_id = %id, method = %req.method());
    let mut resp = next.run(req).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        resp.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    resp
}
