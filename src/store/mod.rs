//! Persistent named-cache storage.
//!
//! Two backends behind the same trait pair:
//!
//! - [`MemoryStore`] — in-process maps with insertion-order tracking. The
//!   builder default; state dies with the process.
//!
//! - [`SqliteStore`] — sqlite-backed store that survives restarts. Also
//!   holds the deferred-action table.
//!
//! Absence is a normal result everywhere in this layer: a missing entry is
//! `Ok(None)`, a missing cache is an empty key list, a delete of nothing is
//! `Ok(false)`. Errors mean quota or I/O faults and propagate as
//! [`FafnirError::Storage`](crate::FafnirError::Storage) — they are never
//! swallowed here.

pub mod expiry;
pub mod memory;
pub mod sqlite;

pub use expiry::ExpirationPolicy;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::Result;
use crate::types::{DeferredAction, StoredResponse};

/// Named key→response cache store.
///
/// Caches are partitioned by name; keys are unique within a cache and key
/// listing preserves insertion order (an overwrite counts as re-insertion).
/// A `put` is atomic — the entry is either fully stored or not stored.
/// Concurrent `get`/`put` on the same entry is last-writer-wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Ensure a named cache exists, even if empty.
    async fn open(&self, cache: &str) -> Result<()>;

    /// Look up an entry. `Ok(None)` on miss.
    async fn get(&self, cache: &str, key: &str) -> Result<Option<StoredResponse>>;

    /// Store (or overwrite) an entry.
    async fn put(&self, cache: &str, key: &str, response: StoredResponse) -> Result<()>;

    /// Delete an entry. Returns whether it existed.
    async fn delete(&self, cache: &str, key: &str) -> Result<bool>;

    /// Keys of a cache in insertion order. Empty for an unknown cache.
    async fn keys(&self, cache: &str) -> Result<Vec<String>>;

    /// Delete a whole named cache. Returns whether it existed.
    async fn delete_cache(&self, cache: &str) -> Result<bool>;

    /// Names of all known caches, sorted.
    async fn cache_names(&self) -> Result<Vec<String>>;
}

/// Durable keyed table for deferred actions, one pending record per tag.
#[async_trait]
pub trait ActionStore: Send + Sync {
    /// Store a pending action, overwriting any record under the same tag.
    async fn put_action(&self, action: DeferredAction) -> Result<()>;

    /// Load the pending action for a tag. `Ok(None)` if there is none.
    async fn get_action(&self, tag: &str) -> Result<Option<DeferredAction>>;

    /// Remove the record for a tag. Returns whether it existed.
    async fn delete_action(&self, tag: &str) -> Result<bool>;

    /// All pending actions, oldest first.
    async fn list_actions(&self) -> Result<Vec<DeferredAction>>;
}
