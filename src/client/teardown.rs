use std::sync::{
    Arc, RwLock,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use serde::Serialize;
use tokio::sync::broadcast::{self, Receiver, Sender};

use crate::{
    cache::Cache,
    client::refresh::RefreshCoordinator,
    config::ServerConfig,
    media::VideoRegistry,
    services::{
        auth::TokenStore,
        routing::{PublicPaths, session_end_target},
    },
};

/// Where the user is, and how to move them.
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;
    fn navigate(&self, target: &str);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Navigation {
    pub target: String,
}

/// Navigator that publishes every navigation on a broadcast channel.
pub struct ChannelNavigator {
    current: RwLock<String>,
    sender: Sender<Navigation>,
}

impl ChannelNavigator {
    pub fn new(initial_path: impl Into<String>) -> Self {
        const NAVIGATION_BUFFER_SIZE: usize = 16;

        let (sender, _) = broadcast::channel(NAVIGATION_BUFFER_SIZE);
        Self {
            current: RwLock::new(initial_path.into()),
            sender,
        }
    }

    pub fn set_current_path(&self, path: impl Into<String>) {
        if let Ok(mut current) = self.current.write() {
            *current = path.into();
        }
    }

    pub fn subscribe(&self) -> Receiver<Navigation> {
        self.sender.subscribe()
    }
}

impl Navigator for ChannelNavigator {
    fn current_path(&self) -> String {
        self.current
            .read()
            .map(|current| current.clone())
            .unwrap_or_else(|_| "/".to_string())
    }

    fn navigate(&self, target: &str) {
        self.set_current_path(target);
        let _ = self.sender.send(Navigation {
            target: target.to_string(),
        });
    }
}

/// The single unrecoverable path: drop every trace of the session and send the user to login.
///
/// Runs its side effects once per session. [`SessionTeardown::arm`] re-enables it after a new
/// login.
pub struct SessionTeardown {
    store: TokenStore,
    cache: Arc<Cache>,
    coordinator: Arc<RefreshCoordinator>,
    videos: Arc<VideoRegistry>,
    navigator: Arc<dyn Navigator>,
    login_path: String,
    public_paths: PublicPaths,
    done: AtomicBool,
    generation: AtomicU64,
}

impl SessionTeardown {
    pub fn new(
        store: TokenStore,
        cache: Arc<Cache>,
        coordinator: Arc<RefreshCoordinator>,
        videos: Arc<VideoRegistry>,
        navigator: Arc<dyn Navigator>,
        server_config: &ServerConfig,
    ) -> Self {
        Self {
            store,
            cache,
            coordinator,
            videos,
            navigator,
            login_path: server_config.login_path.clone(),
            public_paths: PublicPaths::new(&server_config.public_paths),
            done: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    /// Returns `true` for the call that actually tore the session down.
    pub async fn run(&self, reason: &str) -> bool {
        if self.done.swap(true, Ordering::SeqCst) {
            tracing::debug!(reason, "Session already torn down");
            return false;
        }

        tracing::warn!(reason, "Tearing down session");

        // The coordinator goes first so an exchange in flight cannot write tokens back.
        self.coordinator.reset();
        self.store.clear_all_tokens();
        self.videos.reset();
        self.cache.clear_session_data().await;

        let current = self.navigator.current_path();
        match session_end_target(&self.login_path, &self.public_paths, &current) {
            Some(target) => {
                tracing::info!(from = %current, to = %target, "Redirecting to login");
                self.navigator.navigate(&target);
            }
            None => tracing::debug!("Already on the login surface"),
        }

        true
    }

    pub fn arm(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.done.store(false, Ordering::SeqCst);
    }

    /// Bumped by every [`SessionTeardown::arm`]. Work that started under an older generation
    /// belongs to a session that no longer exists.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Whether the session that was live at `generation` is still live.
    pub fn is_live(&self, generation: u64) -> bool {
        !self.is_torn_down() && self.generation() == generation
    }

    pub fn is_torn_down(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }
}
