//! Expiration policies for named caches.

use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use super::CacheStore;
use crate::telemetry;
use crate::Result;

/// Bounds on a named cache: a maximum entry count, a maximum entry age,
/// or both.
///
/// ```rust
/// # use fafnir::ExpirationPolicy;
/// # use std::time::Duration;
/// let policy = ExpirationPolicy::new()
///     .max_entries(60)
///     .max_age(Duration::from_secs(30 * 24 * 3600));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpirationPolicy {
    /// Maximum number of entries; oldest-inserted evicted first.
    pub max_entries: Option<u64>,
    /// Maximum entry age measured from capture time.
    pub max_age: Option<Duration>,
}

impl ExpirationPolicy {
    /// Create an unbounded policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the number of entries (FIFO eviction beyond the cap).
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = Some(n);
        self
    }

    /// Cap entry age; older entries are purged on the next enforcement
    /// pass regardless of the count limit.
    pub fn max_age(mut self, age: Duration) -> Self {
        self.max_age = Some(age);
        self
    }

    /// Whether this policy bounds anything at all.
    pub fn is_noop(&self) -> bool {
        self.max_entries.is_none() && self.max_age.is_none()
    }

    /// Run one enforcement pass against a cache: purge over-age entries,
    /// then trim the oldest-inserted entries beyond the count cap.
    ///
    /// Idempotent, and safe to run concurrently with ordinary get/put —
    /// it only ever deletes entries, never resurrects them. Returns the
    /// number of evicted entries.
    pub async fn enforce(&self, store: &dyn CacheStore, cache: &str) -> Result<u64> {
        if self.is_noop() {
            return Ok(0);
        }
        let mut evicted = 0;

        if let Some(max_age) = self.max_age {
            let cutoff = chrono::Duration::from_std(max_age)
                .unwrap_or_else(|_| chrono::Duration::MAX);
            let now = Utc::now();
            for key in store.keys(cache).await? {
                let Some(entry) = store.get(cache, &key).await? else {
                    continue; // deleted concurrently
                };
                if now.signed_duration_since(entry.captured_at) > cutoff {
                    if store.delete(cache, &key).await? {
                        evicted += 1;
                        metrics::counter!(telemetry::EVICTIONS_TOTAL,
                            "cache" => cache.to_owned(), "reason" => "age")
                        .increment(1);
                    }
                }
            }
        }

        if let Some(max_entries) = self.max_entries {
            let keys = store.keys(cache).await?;
            let excess = keys.len().saturating_sub(max_entries as usize);
            for key in keys.into_iter().take(excess) {
                if store.delete(cache, &key).await? {
                    evicted += 1;
                    metrics::counter!(telemetry::EVICTIONS_TOTAL,
                        "cache" => cache.to_owned(), "reason" => "count")
                    .increment(1);
                }
            }
        }

        if evicted > 0 {
            debug!(cache, evicted, "expiration pass evicted entries");
        }
        Ok(evicted)
    }
}
