//! In-memory store backend.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ActionStore, CacheStore};
use crate::Result;
use crate::types::{DeferredAction, StoredResponse};

/// One named cache: entries plus an insertion-order key list.
///
/// Overwriting a key moves it to the back of the order, so FIFO eviction
/// treats a refreshed entry as newly inserted.
#[derive(Default)]
struct NamedCache {
    entries: HashMap<String, StoredResponse>,
    order: Vec<String>,
}

impl NamedCache {
    fn insert(&mut self, key: &str, response: StoredResponse) {
        if self.entries.insert(key.to_owned(), response).is_some() {
            self.order.retain(|k| k != key);
        }
        self.order.push(key.to_owned());
    }

    fn remove(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
            true
        } else {
            false
        }
    }
}

/// In-memory [`CacheStore`] + [`ActionStore`].
///
/// The builder default. Safe for concurrent use; all state is lost when
/// the process exits.
#[derive(Default)]
pub struct MemoryStore {
    caches: RwLock<HashMap<String, NamedCache>>,
    actions: RwLock<HashMap<String, DeferredAction>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn open(&self, cache: &str) -> Result<()> {
        self.caches
            .write()
            .await
            .entry(cache.to_owned())
            .or_default();
        Ok(())
    }

    async fn get(&self, cache: &str, key: &str) -> Result<Option<StoredResponse>> {
        let caches = self.caches.read().await;
        Ok(caches
            .get(cache)
            .and_then(|c| c.entries.get(key))
            .cloned())
    }

    async fn put(&self, cache: &str, key: &str, response: StoredResponse) -> Result<()> {
        let mut caches = self.caches.write().await;
        caches
            .entry(cache.to_owned())
            .or_default()
            .insert(key, response);
        Ok(())
    }

    async fn delete(&self, cache: &str, key: &str) -> Result<bool> {
        let mut caches = self.caches.write().await;
        Ok(caches.get_mut(cache).is_some_and(|c| c.remove(key)))
    }

    async fn keys(&self, cache: &str) -> Result<Vec<String>> {
        let caches = self.caches.read().await;
        Ok(caches.get(cache).map(|c| c.order.clone()).unwrap_or_default())
    }

    async fn delete_cache(&self, cache: &str) -> Result<bool> {
        Ok(self.caches.write().await.remove(cache).is_some())
    }

    async fn cache_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.caches.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl ActionStore for MemoryStore {
    async fn put_action(&self, action: DeferredAction) -> Result<()> {
        self.actions
            .write()
            .await
            .insert(action.tag.clone(), action);
        Ok(())
    }

    async fn get_action(&self, tag: &str) -> Result<Option<DeferredAction>> {
        Ok(self.actions.read().await.get(tag).cloned())
    }

    async fn delete_action(&self, tag: &str) -> Result<bool> {
        Ok(self.actions.write().await.remove(tag).is_some())
    }

    async fn list_actions(&self) -> Result<Vec<DeferredAction>> {
        let mut actions: Vec<DeferredAction> =
            self.actions.read().await.values().cloned().collect();
        actions.sort_by_key(|a| a.created_at);
        Ok(actions)
    }
}
