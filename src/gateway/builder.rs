//! Builder for configuring gateway instances

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use url::Url;

use super::Gateway;
use crate::net::{HttpFetcher, NetworkFetcher};
use crate::routing::{Route, RouteTable};
use crate::store::{ActionStore, CacheStore, MemoryStore, SqliteStore};
use crate::strategy::{StrategyExecutor, DEFAULT_NETWORK_TIMEOUT};
use crate::sync::{DeferredActionQueue, HttpSyncDispatcher, SyncDispatcher};
use crate::types::{ResourceRequest, VersionToken};
use crate::{FafnirError, Result};

/// Base name of the primary cache holding the precache manifest.
pub(crate) const PRECACHE: &str = "precache";

/// Main entry point for creating gateway instances.
pub struct Fafnir;

impl Fafnir {
    /// Create a new builder for configuring the gateway.
    pub fn builder() -> FafnirBuilder {
        FafnirBuilder::new()
    }
}

/// Builder for configuring gateway instances.
pub struct FafnirBuilder {
    version: Option<VersionToken>,
    routes: Vec<Route>,
    precache: Vec<String>,
    offline_fallback: Option<String>,
    skip_waiting: bool,
    network_timeout: Option<Duration>,
    cache_store: Option<Arc<dyn CacheStore>>,
    action_store: Option<Arc<dyn ActionStore>>,
    fetcher: Option<Arc<dyn NetworkFetcher>>,
    dispatcher: Option<Arc<dyn SyncDispatcher>>,
    sync_endpoints: Vec<(String, String)>,
    connectivity: Option<watch::Receiver<bool>>,
}

impl FafnirBuilder {
    pub fn new() -> Self {
        Self {
            version: None,
            routes: Vec::new(),
            precache: Vec::new(),
            offline_fallback: None,
            skip_waiting: false,
            network_timeout: None,
            cache_store: None,
            action_store: None,
            fetcher: None,
            dispatcher: None,
            sync_endpoints: Vec::new(),
            connectivity: None,
        }
    }

    /// Set the cache generation token (default: the package version).
    pub fn version(mut self, token: impl Into<String>) -> Self {
        self.version = Some(VersionToken::new(token));
        self
    }

    /// Append a routing rule. Rules match in declaration order.
    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// Set the precache manifest: absolute URLs of the critical static
    /// resources populated on install.
    pub fn precache<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.precache.extend(urls.into_iter().map(Into::into));
        self
    }

    /// Set the offline fallback document, served when a document request
    /// exhausts every source. Added to the precache manifest if absent.
    pub fn offline_fallback(mut self, url: impl Into<String>) -> Self {
        self.offline_fallback = Some(url.into());
        self
    }

    /// Skip the waiting state: activate immediately after a successful
    /// install.
    pub fn skip_waiting(mut self, skip: bool) -> Self {
        self.skip_waiting = skip;
        self
    }

    /// Default network timeout for all fetches (routes may override).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.network_timeout = Some(timeout);
        self
    }

    /// Inject a cache store (default: a fresh [`MemoryStore`]).
    pub fn cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache_store = Some(store);
        self
    }

    /// Inject an action store for deferred actions (default: shares the
    /// in-memory store).
    pub fn action_store(mut self, store: Arc<dyn ActionStore>) -> Self {
        self.action_store = Some(store);
        self
    }

    /// Use one sqlite store for both caches and deferred actions.
    pub fn sqlite_store(mut self, store: Arc<SqliteStore>) -> Self {
        self.cache_store = Some(store.clone());
        self.action_store = Some(store);
        self
    }

    /// Inject a network fetcher (default: [`HttpFetcher`]).
    pub fn fetcher(mut self, fetcher: Arc<dyn NetworkFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Inject a sync dispatcher, replacing the HTTP one assembled from
    /// [`sync_endpoint`](Self::sync_endpoint) calls.
    pub fn dispatcher(mut self, dispatcher: Arc<dyn SyncDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Register the remote endpoint a deferred action tag is POSTed to.
    pub fn sync_endpoint(mut self, tag: impl Into<String>, url: impl Into<String>) -> Self {
        self.sync_endpoints.push((tag.into(), url.into()));
        self
    }

    /// Wire up a connectivity signal (`true` = online) that triggers
    /// deferred action replays.
    pub fn connectivity(mut self, signal: watch::Receiver<bool>) -> Self {
        self.connectivity = Some(signal);
        self
    }

    /// Build the gateway.
    pub fn build(self) -> Result<Gateway> {
        let version = self.version.unwrap_or_default();
        let network_timeout = self.network_timeout.unwrap_or(DEFAULT_NETWORK_TIMEOUT);

        let mut manifest_urls = self.precache;
        if let Some(fallback) = &self.offline_fallback {
            if !manifest_urls.iter().any(|u| u == fallback) {
                manifest_urls.push(fallback.clone());
            }
        }
        let precache_manifest = manifest_urls
            .iter()
            .map(|raw| {
                Url::parse(raw)
                    .map(ResourceRequest::get)
                    .map_err(|e| FafnirError::Configuration(format!("precache URL {raw:?}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        let offline_fallback = self
            .offline_fallback
            .map(|raw| {
                Url::parse(&raw).map(ResourceRequest::get).map_err(|e| {
                    FafnirError::Configuration(format!("offline fallback URL {raw:?}: {e}"))
                })
            })
            .transpose()?;

        let (cache_store, action_store) = match (self.cache_store, self.action_store) {
            (Some(cache), Some(action)) => (cache, action),
            (cache, action) => {
                let shared = Arc::new(MemoryStore::new());
                (
                    cache.unwrap_or_else(|| shared.clone() as Arc<dyn CacheStore>),
                    action.unwrap_or(shared),
                )
            }
        };
        let fetcher = self
            .fetcher
            .unwrap_or_else(|| Arc::new(HttpFetcher::new()));

        let dispatcher = match self.dispatcher {
            Some(dispatcher) => dispatcher,
            None => {
                let mut http = HttpSyncDispatcher::new();
                for (tag, raw) in &self.sync_endpoints {
                    let url = Url::parse(raw).map_err(|e| {
                        FafnirError::Configuration(format!("sync endpoint {raw:?}: {e}"))
                    })?;
                    http = http.endpoint(tag.clone(), url);
                }
                Arc::new(http)
            }
        };

        let mut routes = RouteTable::new(version.clone());
        for route in self.routes {
            routes.push(route);
        }

        let executor = StrategyExecutor::new(cache_store.clone(), fetcher.clone())
            .default_timeout(network_timeout);

        let mut sync = DeferredActionQueue::new(action_store, dispatcher);
        if let Some(signal) = self.connectivity {
            sync = sync.with_connectivity(signal);
        }

        let precache_cache = version.qualify(PRECACHE);
        Ok(Gateway::new(
            version,
            routes,
            executor,
            cache_store,
            fetcher,
            precache_manifest,
            precache_cache,
            offline_fallback,
            self.skip_waiting,
            network_timeout,
            sync,
        ))
    }
}

impl Default for FafnirBuilder {
    fn default() -> Self {
        Self::new()
    }
}
