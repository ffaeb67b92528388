use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    cache::{Cache, keys::CacheKey},
    client::{
        dispatcher::{ApiRequest, Dispatcher},
        refresh::RefreshCoordinator,
        teardown::{Navigator, SessionTeardown},
    },
    config::Config,
    error::{ApiFailure, AppError, FailureKind, Result},
    media::VideoRegistry,
    services::auth::{CookieJar, CredentialPair, TokenCipher, TokenStore},
};

/// Authenticated REST client.
///
/// Every authenticated call attaches the stored access token. A 401 is turned into one shared
/// refresh followed by a single retry; a failed refresh ends the session.
pub struct ApiClient {
    dispatcher: Dispatcher,
    store: TokenStore,
    coordinator: Arc<RefreshCoordinator>,
    teardown: Arc<SessionTeardown>,
    cache: Arc<Cache>,
    videos: Arc<VideoRegistry>,
}

impl ApiClient {
    pub fn new(
        config: &Config,
        jar: Arc<dyn CookieJar>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let dispatcher = Dispatcher::new(&config.api)?;
        let store = TokenStore::new(
            jar,
            Arc::new(TokenCipher::new(&config.tokens.client_secret)),
            config.tokens.clone(),
        );
        let cache = Arc::new(Cache::init(config));
        let videos = Arc::new(VideoRegistry::new());
        let coordinator = Arc::new(RefreshCoordinator::new(
            dispatcher.clone(),
            store.clone(),
            &config.api,
        ));
        let teardown = Arc::new(SessionTeardown::new(
            store.clone(),
            cache.clone(),
            coordinator.clone(),
            videos.clone(),
            navigator,
            &config.server,
        ));

        Ok(Self {
            dispatcher,
            store,
            coordinator,
            teardown,
            cache,
            videos,
        })
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    pub fn teardown(&self) -> &Arc<SessionTeardown> {
        &self.teardown
    }

    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    pub fn videos(&self) -> &Arc<VideoRegistry> {
        &self.videos
    }

    /// Persists a freshly issued pair and re-arms teardown for the new session.
    pub fn begin_session(&self, pair: &CredentialPair) {
        self.coordinator.reset();
        self.teardown.arm();
        self.store.store_credentials(pair);
        tracing::info!("Session started");
    }

    pub async fn end_session(&self, reason: &str) -> bool {
        self.teardown.run(reason).await
    }

    pub async fn request<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        decode(self.request_value(request).await?)
    }

    pub async fn request_value(&self, request: ApiRequest) -> Result<Value> {
        let (token, refreshed) = match self.store.access_token() {
            Some(token) => (token, false),
            None if self.store.refresh_token().is_some() => {
                tracing::debug!("Access token missing, refreshing before request");
                (self.await_refresh().await?.access_token, true)
            }
            None => {
                self.teardown.run("no credentials").await;
                return Err(AppError::Unauthorized);
            }
        };

        if refreshed {
            return self.retry(&request, &token).await;
        }

        match self.send(&request, Some(&token)).await {
            Ok(payload) => {
                self.coordinator.record_success();
                Ok(payload)
            }
            Err(failure) if failure.is_unauthorized() => self.recover(&request, &token).await,
            Err(failure) => Err(failure.into()),
        }
    }

    /// Unauthenticated call: no bearer, no refresh, no teardown.
    pub async fn public_request<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let payload = self.send(&request, None).await?;
        decode(payload)
    }

    /// Authenticated GET read through the query cache.
    pub async fn cached_get<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let key = CacheKey::request(&request.path, &request.query);

        if let Some(hit) = self.cache.queries.get(&key).await {
            tracing::trace!(key = %key, "Query cache hit");
            return decode(hit.as_ref().clone());
        }

        let generation = self.teardown.generation();
        let payload = self.request_value(request).await?;
        if self.teardown.is_live(generation) {
            self.cache.queries.insert(key, payload.clone()).await;
        } else {
            tracing::debug!(key = %key, "Session ended during request, not caching");
        }
        decode(payload)
    }

    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> std::result::Result<Value, ApiFailure> {
        self.dispatcher
            .send(request, bearer, self.dispatcher.request_timeout())
            .await
    }

    async fn recover(&self, request: &ApiRequest, rejected: &str) -> Result<Value> {
        let token = match self.store.access_token() {
            Some(stored) if stored != rejected => {
                tracing::debug!("Token already refreshed, retrying with stored token");
                stored
            }
            _ => self.await_refresh().await?.access_token,
        };

        self.retry(request, &token).await
    }

    /// The one retry a request gets after a refresh. A second 401 is final.
    async fn retry(&self, request: &ApiRequest, token: &str) -> Result<Value> {
        if self.teardown.is_torn_down() {
            tracing::debug!("Session ended before retry, not sending");
            return Err(AppError::SessionExpired);
        }

        match self.send(request, Some(token)).await {
            Ok(payload) => {
                self.coordinator.record_success();
                Ok(payload)
            }
            Err(failure) if failure.is_unauthorized() => {
                if self.coordinator.record_rejected_after_refresh() {
                    self.teardown.run("refreshed tokens keep being rejected").await;
                }
                Err(failure.into())
            }
            Err(failure) => Err(failure.into()),
        }
    }

    async fn await_refresh(&self) -> Result<CredentialPair> {
        let generation = self.teardown.generation();
        match self.coordinator.refresh().await {
            Ok(pair) => Ok(pair),
            Err(failure) => {
                tracing::debug!(failure = %failure, "Refresh episode failed");
                // A newer login superseded the episode; its session must survive.
                if self.teardown.generation() == generation {
                    self.teardown.run("refresh failed").await;
                }
                Err(AppError::SessionExpired)
            }
        }
    }
}

fn decode<T: DeserializeOwned>(payload: Value) -> Result<T> {
    serde_json::from_value(payload).map_err(|e| {
        tracing::warn!(error = %e, "Unexpected response shape");
        AppError::Api(ApiFailure::of_kind(FailureKind::Parse))
    })
}
