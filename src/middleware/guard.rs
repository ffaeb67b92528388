use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    GateState,
    error::AppError,
    services::{
        auth::{TokenCipher, TokenKind, cookie::extract_cookie},
        routing::login_redirect,
    },
};

const SESSION_COOKIES: [TokenKind; 2] = [TokenKind::Access, TokenKind::Refresh];

/// Lets a request through when its path is public or when either auth cookie decrypts to a
/// non-empty value. Pages are redirected to login with the original target preserved; JSON
/// endpoints under `/api/` get a 401 instead.
pub async fn require_session(
    State(state): State<GateState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();

    if state.public_paths.is_public(path) || has_session(request.headers(), &state.cipher) {
        return next.run(request).await;
    }

    if path.starts_with("/api/") {
        tracing::debug!(path, "Rejecting API request without session");
        return AppError::Unauthorized.into_response();
    }

    let target = request
        .uri()
        .path_and_query()
        .map(|path_and_query| path_and_query.as_str())
        .unwrap_or(path);
    let location = login_redirect(&state.config.server.login_path, target);

    tracing::debug!(path, location = %location, "Redirecting to login");
    Redirect::to(&location).into_response()
}

pub fn has_session(headers: &HeaderMap, cipher: &TokenCipher) -> bool {
    SESSION_COOKIES.iter().any(|kind| {
        extract_cookie(headers, kind.name())
            .and_then(|sealed| cipher.decrypt(&sealed))
            .is_some_and(|token| !token.is_empty())
    })
}
