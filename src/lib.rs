pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod gate;
pub mod media;
pub mod middleware;
pub mod services;
pub mod utils;

use std::sync::Arc;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::{
    config::Config,
    gate::handlers,
    services::{auth::TokenCipher, routing::PublicPaths},
};

#[derive(Clone)]
pub struct GateState {
    pub config: Arc<Config>,
    pub cipher: Arc<TokenCipher>,
    pub public_paths: Arc<PublicPaths>,
}

impl GateState {
    pub fn new(config: Config) -> Self {
        let cipher = TokenCipher::new(&config.tokens.client_secret);
        let mut patterns = config.server.public_paths.clone();
        patterns.push(config.server.login_path.clone());
        let public_paths = PublicPaths::new(&patterns);

        Self {
            config: Arc::new(config),
            cipher: Arc::new(cipher),
            public_paths: Arc::new(public_paths),
        }
    }
}

pub fn build_router(state: GateState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/session", get(handlers::session))
        .route("/api/auth/logout", post(handlers::logout))
        .route(&state.config.server.login_path, get(handlers::login_surface))
        .fallback(handlers::not_found)
        .layer(from_fn_with_state(
            state.clone(),
            middleware::guard::require_session,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::logging::make_log_span)
                .on_request(())
                .on_eos(()),
        )
        .layer(CompressionLayer::new())
        .layer(ConcurrencyLimitLayer::new(
            state.config.server.max_concurrent_requests,
        ))
        .with_state(state)
}
