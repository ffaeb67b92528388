use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::{
    GateState,
    error::{AppError, Result},
    services::auth::{
        Claims, HeaderCookieJar, TokenKind, TokenStore, cookie::extract_cookie, decode_claims,
    },
};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Claims of the access cookie, for coarse UI gating only.
pub async fn session(State(state): State<GateState>, headers: HeaderMap) -> Result<Json<Claims>> {
    let claims = extract_cookie(&headers, TokenKind::Access.name())
        .and_then(|sealed| state.cipher.decrypt(&sealed))
        .and_then(|token| decode_claims(&token))
        .ok_or(AppError::Unauthorized)?;

    Ok(Json(claims))
}

/// Expires every token cookie the client may hold.
pub async fn logout(State(state): State<GateState>, headers: HeaderMap) -> Response {
    let names = TokenKind::ALL.map(|kind| kind.name());
    let jar = std::sync::Arc::new(HeaderCookieJar::from_headers(
        &headers,
        &names,
        state.config.server.secure_cookies,
    ));

    let store = TokenStore::new(jar.clone(), state.cipher.clone(), state.config.tokens.clone());
    store.clear_all_tokens();
    tracing::info!("Cleared session cookies");

    let mut response = StatusCode::NO_CONTENT.into_response();
    for cookie in jar.take_set_cookies() {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    response
}

#[derive(Deserialize)]
pub struct LoginQuery {
    pub redirect: Option<String>,
}

#[derive(Serialize)]
pub struct LoginSurface {
    pub login: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

/// Placeholder for the login page. Only same-origin redirect targets are echoed back.
pub async fn login_surface(Query(query): Query<LoginQuery>) -> Json<LoginSurface> {
    let redirect = query
        .redirect
        .filter(|target| target.starts_with('/') && !target.starts_with("//"));

    Json(LoginSurface {
        login: true,
        redirect,
    })
}

pub async fn not_found(uri: Uri) -> Response {
    tracing::debug!(path = %uri.path(), "No route");
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "code": 404, "message": "Not found" })),
    )
        .into_response()
}
