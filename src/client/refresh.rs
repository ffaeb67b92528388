use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, AtomicU64, Ordering},
    },
    time::Duration,
};

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::{
    api::types::auth::{RefreshRequest, RefreshResponse},
    client::dispatcher::{ApiRequest, Dispatcher},
    config::ApiConfig,
    error::{ApiFailure, FailureKind},
    services::auth::{CredentialPair, TokenStore},
};

pub const REFRESH_PATH: &str = "/auth/refresh-token";

pub type RefreshOutcome = std::result::Result<CredentialPair, ApiFailure>;

/// One refresh episode, awaited by every caller that joined it.
pub type RefreshEpisode = Shared<BoxFuture<'static, RefreshOutcome>>;

#[derive(Default)]
struct EpisodeSlot {
    epoch: u64,
    pending: Option<RefreshEpisode>,
}

/// Turns any number of concurrent authorization failures into a single refresh call.
///
/// The in-flight slot is checked and filled under one synchronous lock, so two callers can never
/// both start an episode. The exchange itself runs on a spawned task and finishes even when every
/// waiter has gone away.
///
/// A session-level breaker counts requests that were rejected again right after a successful
/// refresh. Once it trips, no further episodes start until [`RefreshCoordinator::reset`].
pub struct RefreshCoordinator {
    dispatcher: Dispatcher,
    store: TokenStore,
    refresh_timeout: Duration,
    breaker_threshold: u32,
    slot: Mutex<EpisodeSlot>,
    rejected_after_refresh: AtomicU32,
    episodes_started: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(dispatcher: Dispatcher, store: TokenStore, api_config: &ApiConfig) -> Self {
        Self {
            dispatcher,
            store,
            refresh_timeout: api_config.refresh_timeout,
            breaker_threshold: api_config.refresh_breaker_threshold,
            slot: Mutex::new(EpisodeSlot::default()),
            rejected_after_refresh: AtomicU32::new(0),
            episodes_started: AtomicU64::new(0),
        }
    }

    /// Joins the episode in flight, or starts one.
    pub fn refresh(self: &Arc<Self>) -> RefreshEpisode {
        if self.is_tripped() {
            tracing::warn!("Refresh breaker is open, refusing to refresh");
            return futures::future::ready(Err(ApiFailure::of_kind(FailureKind::Unauthorized)))
                .boxed()
                .shared();
        }

        let mut slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(pending) = &slot.pending {
            tracing::debug!("Joining refresh in flight");
            return pending.clone();
        }

        slot.epoch += 1;
        let epoch = slot.epoch;
        self.episodes_started.fetch_add(1, Ordering::Relaxed);

        let coordinator = Arc::clone(self);
        let task = tokio::spawn(async move {
            let outcome = coordinator.exchange(epoch).await;
            coordinator.finish(epoch);
            outcome
        });

        let episode = async move {
            task.await.unwrap_or_else(|e| {
                tracing::error!(error = %e, "Refresh task failed");
                Err(ApiFailure::of_kind(FailureKind::Unauthorized))
            })
        }
        .boxed()
        .shared();

        slot.pending = Some(episode.clone());
        episode
    }

    pub fn is_refreshing(&self) -> bool {
        self.slot
            .lock()
            .map(|slot| slot.pending.is_some())
            .unwrap_or(false)
    }

    /// Number of refresh exchanges started since construction.
    pub fn episodes_started(&self) -> u64 {
        self.episodes_started.load(Ordering::Relaxed)
    }

    /// Records a request rejected with a token that a refresh had just issued. Returns `true` when
    /// this trips the breaker.
    pub fn record_rejected_after_refresh(&self) -> bool {
        let count = self.rejected_after_refresh.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::warn!(
            count,
            threshold = self.breaker_threshold,
            "Refreshed token rejected"
        );
        count >= self.breaker_threshold
    }

    pub fn record_success(&self) {
        self.rejected_after_refresh.store(0, Ordering::SeqCst);
    }

    pub fn is_tripped(&self) -> bool {
        self.rejected_after_refresh.load(Ordering::SeqCst) >= self.breaker_threshold
    }

    /// Forgets the episode in flight and closes the breaker. Called when the session ends.
    pub fn reset(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        slot.epoch += 1;
        slot.pending = None;
        self.rejected_after_refresh.store(0, Ordering::SeqCst);
    }

    fn finish(&self, epoch: u64) {
        let mut slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.epoch == epoch {
            slot.pending = None;
        }
    }

    /// Writes the grant only while `epoch` is still current. A grant that arrives after
    /// [`RefreshCoordinator::reset`] belongs to an ended session and is dropped.
    fn persist(&self, epoch: u64, access_token: &str, rotated: Option<&str>) -> bool {
        let slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.epoch != epoch {
            return false;
        }

        self.store.store_access_token(access_token);
        if let Some(rotated) = rotated {
            self.store.store_refresh_token(rotated);
        }
        true
    }

    async fn exchange(&self, epoch: u64) -> RefreshOutcome {
        let Some(refresh_token) = self.store.refresh_token() else {
            tracing::info!("No refresh token, cannot refresh session");
            return Err(ApiFailure::of_kind(FailureKind::Unauthorized));
        };

        tracing::info!("Refreshing session");

        let request = ApiRequest::post(REFRESH_PATH)
            .json(&RefreshRequest {
                refresh_token: &refresh_token,
            })
            .map_err(ApiFailure::from)?;

        let payload = self
            .dispatcher
            .send(&request, None, self.refresh_timeout)
            .await
            .inspect_err(|failure| tracing::warn!(failure = %failure, "Refresh rejected"))?;

        let grant = serde_json::from_value::<RefreshResponse>(payload)
            .map_err(|e| {
                tracing::warn!(error = %e, "Malformed refresh response");
                ApiFailure::of_kind(FailureKind::Parse)
            })?
            .data
            .tokens;

        if grant.access_token.is_empty() {
            tracing::warn!("Refresh response carried an empty access token");
            return Err(ApiFailure::of_kind(FailureKind::Parse));
        }

        let rotated = grant.refresh_token.filter(|rotated| !rotated.is_empty());
        if !self.persist(epoch, &grant.access_token, rotated.as_deref()) {
            tracing::info!("Session ended during refresh, discarding issued tokens");
            return Err(ApiFailure::of_kind(FailureKind::Unauthorized));
        }
        let refresh_token = rotated.unwrap_or(refresh_token);

        tracing::info!("Session refreshed");
        Ok(CredentialPair::new(grant.access_token, refresh_token))
    }
}
