use axum::extract::Request;
use tracing::{Span, info_span};

use crate::utils::security::mask_uri_token;

pub fn make_log_span(request: &Request) -> Span {
    let masked_uri = mask_uri_token(&request.uri().to_string());
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-");

    info_span!(
        "request",
        method = ?request.method(),
        uri = %masked_uri,
        version = ?request.version(),
        request_id = %request_id,
    )
}
