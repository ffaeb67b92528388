//! Shared helpers for the client integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use iter_bene::{
    client::{ApiClient, ChannelNavigator, Navigation},
    config::Config,
    services::auth::{CredentialPair, MemoryCookieJar},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::broadcast::{Receiver, error::TryRecvError};
use wiremock::MockServer;

pub const CLIENT_SECRET: &str = "iter-bene-test-client-secret-0123456789";

/// Signed with a key the client never sees; the client only reads the payload.
pub fn mint_jwt(user_id: &str, ttl_secs: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    encode(
        &Header::default(),
        &json!({
            "userId": user_id,
            "email": format!("{user_id}@iterbene.com"),
            "role": "user",
            "iat": now,
            "exp": now + ttl_secs,
            "jti": uuid::Uuid::new_v4().to_string(),
        }),
        &EncodingKey::from_secret(b"api-server-signing-key"),
    )
    .unwrap()
}

pub fn test_config(server: &MockServer) -> Config {
    Config::with_defaults(&server.uri(), CLIENT_SECRET)
}

pub struct TestClient {
    pub client: Arc<ApiClient>,
    pub jar: Arc<MemoryCookieJar>,
    pub navigator: Arc<ChannelNavigator>,
    pub navigations: Receiver<Navigation>,
}

impl TestClient {
    pub fn new(config: &Config, current_path: &str) -> Self {
        let jar = Arc::new(MemoryCookieJar::new());
        let navigator = Arc::new(ChannelNavigator::new(current_path));
        let navigations = navigator.subscribe();
        let client = ApiClient::new(config, jar.clone(), navigator.clone()).unwrap();

        Self {
            client: Arc::new(client),
            jar,
            navigator,
            navigations,
        }
    }

    pub fn for_server(server: &MockServer, current_path: &str) -> Self {
        Self::new(&test_config(server), current_path)
    }

    pub fn sign_in(&self, access_token: &str, refresh_token: &str) {
        self.client
            .begin_session(&CredentialPair::new(access_token, refresh_token));
    }

    /// Every navigation published so far.
    pub fn drain_navigations(&mut self) -> Vec<String> {
        let mut targets = Vec::new();
        loop {
            match self.navigations.try_recv() {
                Ok(navigation) => targets.push(navigation.target),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => return targets,
            }
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct Profile {
    pub username: String,
}

pub fn profile_body(username: &str) -> Value {
    json!({ "data": { "id": "u1", "attributes": { "username": username } } })
}

pub fn refresh_body(access_token: &str, refresh_token: Option<&str>) -> Value {
    match refresh_token {
        Some(refresh_token) => json!({
            "data": { "tokens": { "accessToken": access_token, "refreshToken": refresh_token } }
        }),
        None => json!({ "data": { "tokens": { "accessToken": access_token } } }),
    }
}
