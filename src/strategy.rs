//! The caching strategies.
//!
//! Each strategy is an async algorithm over the same two sources — the
//! named-cache store and the network — differing only in which source is
//! consulted first and what happens on failure. All of them share the
//! fetch-validate-store path in [`StrategyExecutor::fetch_and_store`], so
//! the cacheability gate lives in exactly one place.
//!
//! # Validity gate
//!
//! A response is written to a cache only when it is a clean success:
//! 2xx status and a final URL on the requested origin. Anything else is
//! [`InvalidResponse`](crate::FafnirError::InvalidResponse) — never
//! cached, and treated as a network failure when deciding fallbacks.
//!
//! # Revalidation
//!
//! `stale-while-revalidate` resolves the cache read *before* spawning the
//! background fetch, so the returned value can never race the write-back;
//! the store itself is last-writer-wins. The background task is detached
//! — the caller may drop the handle (fire-and-forget) or await it, which
//! is what the tests do.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::FafnirError;
use crate::net::{FetchedResponse, NetworkFetcher};
use crate::routing::ResolvedRoute;
use crate::store::{CacheStore, ExpirationPolicy};
use crate::telemetry;
use crate::types::{ResourceRequest, StoredResponse};
use crate::Result;

/// Default bound on a single network fetch.
pub const DEFAULT_NETWORK_TIMEOUT: Duration = Duration::from_secs(5);

/// How a request is resolved between cache and network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// Cache hit wins outright; miss fetches and populates.
    CacheFirst,
    /// Network wins; cache is the fallback.
    NetworkFirst,
    /// Serve stale immediately, refresh in the background.
    StaleWhileRevalidate,
    /// Cache or nothing.
    CacheOnly,
    /// Network or nothing; never touches the cache.
    NetworkOnly,
}

impl StrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::CacheFirst => "cache-first",
            StrategyKind::NetworkFirst => "network-first",
            StrategyKind::StaleWhileRevalidate => "stale-while-revalidate",
            StrategyKind::CacheOnly => "cache-only",
            StrategyKind::NetworkOnly => "network-only",
        }
    }
}

/// Outcome of one strategy execution.
#[derive(Debug)]
pub struct StrategyResult {
    pub response: StoredResponse,
    /// Handle of the detached revalidation task, present only on a
    /// stale-while-revalidate cache hit. Dropping it leaves the task
    /// running to completion.
    pub revalidation: Option<JoinHandle<()>>,
}

impl StrategyResult {
    fn done(response: StoredResponse) -> Self {
        Self {
            response,
            revalidation: None,
        }
    }
}

/// Executes caching strategies against a store and a fetcher.
pub struct StrategyExecutor {
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn NetworkFetcher>,
    default_timeout: Duration,
}

impl StrategyExecutor {
    pub fn new(store: Arc<dyn CacheStore>, fetcher: Arc<dyn NetworkFetcher>) -> Self {
        Self {
            store,
            fetcher,
            default_timeout: DEFAULT_NETWORK_TIMEOUT,
        }
    }

    /// Override the default network timeout (routes may still override
    /// per-route).
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Run the resolved policy for a request.
    pub async fn execute(
        &self,
        route: &ResolvedRoute,
        request: &ResourceRequest,
    ) -> Result<StrategyResult> {
        let timeout = route.timeout.unwrap_or(self.default_timeout);
        let result = match route.strategy {
            StrategyKind::CacheFirst => self.cache_first(request, route, timeout).await,
            StrategyKind::NetworkFirst => self.network_first(request, route, timeout).await,
            StrategyKind::StaleWhileRevalidate => {
                self.stale_while_revalidate(request, route, timeout).await
            }
            StrategyKind::CacheOnly => self.cache_only(request, &route.cache).await,
            StrategyKind::NetworkOnly => self.network_only(request, timeout).await,
        };
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(telemetry::REQUESTS_TOTAL,
            "strategy" => route.strategy.as_str(), "status" => status)
        .increment(1);
        result
    }

    async fn cache_first(
        &self,
        request: &ResourceRequest,
        route: &ResolvedRoute,
        timeout: Duration,
    ) -> Result<StrategyResult> {
        if let Some(hit) = self.lookup(&route.cache, request).await? {
            return Ok(StrategyResult::done(hit));
        }
        let stored = self
            .fetch_and_store(request, &route.cache, timeout, route.expiration.as_ref())
            .await?;
        Ok(StrategyResult::done(stored))
    }

    async fn network_first(
        &self,
        request: &ResourceRequest,
        route: &ResolvedRoute,
        timeout: Duration,
    ) -> Result<StrategyResult> {
        match self
            .fetch_and_store(request, &route.cache, timeout, route.expiration.as_ref())
            .await
        {
            Ok(stored) => Ok(StrategyResult::done(stored)),
            Err(e) if e.is_network_failure() => {
                debug!(key = %request.cache_key(), error = %e, "network-first falling back to cache");
                match self.lookup(&route.cache, request).await? {
                    Some(hit) => Ok(StrategyResult::done(hit)),
                    None => Err(FafnirError::NoSource(request.cache_key())),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn stale_while_revalidate(
        &self,
        request: &ResourceRequest,
        route: &ResolvedRoute,
        timeout: Duration,
    ) -> Result<StrategyResult> {
        // Read before spawning the refresh: the returned value must not
        // race the background write to the same key.
        match self.lookup(&route.cache, request).await? {
            Some(hit) => {
                let handle = self.spawn_revalidation(
                    request.clone(),
                    route.cache.clone(),
                    timeout,
                    route.expiration.clone(),
                );
                Ok(StrategyResult {
                    response: hit,
                    revalidation: Some(handle),
                })
            }
            None => {
                let stored = self
                    .fetch_and_store(request, &route.cache, timeout, route.expiration.as_ref())
                    .await?;
                Ok(StrategyResult::done(stored))
            }
        }
    }

    async fn cache_only(&self, request: &ResourceRequest, cache: &str) -> Result<StrategyResult> {
        match self.lookup(cache, request).await? {
            Some(hit) => Ok(StrategyResult::done(hit)),
            None => Err(FafnirError::NoSource(request.cache_key())),
        }
    }

    async fn network_only(
        &self,
        request: &ResourceRequest,
        timeout: Duration,
    ) -> Result<StrategyResult> {
        // Pass-through: no validity gate, no cache write. A non-success
        // response is still a response.
        let fetched = self.fetcher.fetch(request, timeout).await?;
        Ok(StrategyResult::done(fetched.into_stored()))
    }

    /// Cache lookup with hit/miss metrics.
    async fn lookup(
        &self,
        cache: &str,
        request: &ResourceRequest,
    ) -> Result<Option<StoredResponse>> {
        let hit = self.store.get(cache, &request.cache_key()).await?;
        let counter = if hit.is_some() {
            telemetry::CACHE_HITS_TOTAL
        } else {
            telemetry::CACHE_MISSES_TOTAL
        };
        metrics::counter!(counter, "cache" => cache.to_owned()).increment(1);
        Ok(hit)
    }

    /// Fetch, gate, store, enforce bounds. The shared tail of every
    /// strategy that populates a cache.
    async fn fetch_and_store(
        &self,
        request: &ResourceRequest,
        cache: &str,
        timeout: Duration,
        expiration: Option<&ExpirationPolicy>,
    ) -> Result<StoredResponse> {
        let fetched = self.fetcher.fetch(request, timeout).await?;
        let stored = validate(request, fetched)?;
        self.store
            .put(cache, &request.cache_key(), stored.clone())
            .await?;
        if let Some(policy) = expiration {
            // The response is already stored and about to be served; a
            // failed trim pass is logged, not escalated.
            if let Err(e) = policy.enforce(self.store.as_ref(), cache).await {
                warn!(cache, error = %e, "expiration enforcement failed");
            }
        }
        Ok(stored)
    }

    fn spawn_revalidation(
        &self,
        request: ResourceRequest,
        cache: String,
        timeout: Duration,
        expiration: Option<ExpirationPolicy>,
    ) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let fetcher = Arc::clone(&self.fetcher);
        tokio::spawn(async move {
            let fetched = match fetcher.fetch(&request, timeout).await {
                Ok(fetched) => fetched,
                Err(e) => {
                    debug!(key = %request.cache_key(), error = %e, "revalidation fetch failed");
                    return;
                }
            };
            let stored = match validate(&request, fetched) {
                Ok(stored) => stored,
                Err(e) => {
                    debug!(key = %request.cache_key(), error = %e, "revalidation response not cacheable");
                    return;
                }
            };
            if let Err(e) = store.put(&cache, &request.cache_key(), stored).await {
                warn!(%cache, key = %request.cache_key(), error = %e, "revalidation write failed");
                return;
            }
            if let Some(policy) = expiration {
                if let Err(e) = policy.enforce(store.as_ref(), &cache).await {
                    warn!(%cache, error = %e, "expiration enforcement failed");
                }
            }
        })
    }
}

/// The cacheability gate: clean same-origin success or nothing.
fn validate(request: &ResourceRequest, fetched: FetchedResponse) -> Result<StoredResponse> {
    if !fetched.is_success() {
        return Err(FafnirError::InvalidResponse {
            url: request.url.to_string(),
            reason: format!("status {}", fetched.status),
        });
    }
    if !fetched.same_origin_as(&request.url) {
        return Err(FafnirError::InvalidResponse {
            url: request.url.to_string(),
            reason: format!("cross-origin response from {}", fetched.final_url),
        });
    }
    Ok(fetched.into_stored())
}
