pub mod keys;
pub mod local;

use crate::cache::local::{LocalStorage, QueryCache};
use crate::config::Config;

pub struct Cache {
    pub queries: QueryCache,
    pub storage: LocalStorage,
}

impl Cache {
    pub fn init(config: &Config) -> Self {
        Self {
            queries: QueryCache::new(&config.cache),
            storage: LocalStorage::new(config.cache.storage_namespace.clone()),
        }
    }

    /// Drops every cached response and every app-namespaced storage entry.
    pub async fn clear_session_data(&self) {
        self.queries.invalidate_all();
        let removed = self.storage.clear_namespace().await;
        tracing::debug!(removed, "Cleared app storage");
    }
}
