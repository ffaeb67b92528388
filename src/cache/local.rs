use std::{collections::HashMap, sync::Arc};

use moka::future::Cache;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::config::CacheConfig;

/// Response cache of the client-side data layer. Emptied on session teardown so that no
/// authenticated data outlives the session.
pub struct QueryCache {
    responses: Cache<String, Arc<Value>>,
}

impl QueryCache {
    pub fn new(cache_config: &CacheConfig) -> Self {
        Self {
            responses: Cache::builder()
                .max_capacity(cache_config.query_max_capacity)
                .time_to_live(cache_config.query_ttl)
                .build(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<Arc<Value>> {
        self.responses.get(key).await
    }

    pub async fn insert(&self, key: String, value: Value) {
        self.responses.insert(key, Arc::new(value)).await;
    }

    pub async fn invalidate(&self, key: &str) {
        self.responses.invalidate(key).await;
    }

    pub fn invalidate_all(&self) {
        self.responses.invalidate_all();
    }

    pub async fn entry_count(&self) -> u64 {
        self.responses.run_pending_tasks().await;
        self.responses.entry_count()
    }
}

/// Key/value storage shared with other code on the same origin. Only keys under this app's
/// namespace are ever cleared.
pub struct LocalStorage {
    namespace: String,
    entries: RwLock<HashMap<String, String>>,
}

impl LocalStorage {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    pub async fn set_item(&self, key: &str, value: impl Into<String>) {
        let key = self.namespaced(key);
        self.entries.write().await.insert(key, value.into());
    }

    pub async fn get_item(&self, key: &str) -> Option<String> {
        self.entries.read().await.get(&self.namespaced(key)).cloned()
    }

    pub async fn remove_item(&self, key: &str) {
        self.entries.write().await.remove(&self.namespaced(key));
    }

    /// Writes a key outside the app namespace.
    pub async fn set_raw(&self, key: &str, value: impl Into<String>) {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.into());
    }

    pub async fn get_raw(&self, key: &str) -> Option<String> {
        self.entries.read().await.get(key).cloned()
    }

    /// Returns how many entries were removed.
    pub async fn clear_namespace(&self) -> usize {
        let prefix = format!("{}:", self.namespace);
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(&prefix));
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
