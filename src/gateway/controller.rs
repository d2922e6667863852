//! The lifecycle controller.
//!
//! [`Gateway`] owns the routing table, strategy executor, store, and
//! deferred-action queue, and drives the install → waiting → activating →
//! active lifecycle. Request handling never lets a strategy failure out:
//! whatever goes wrong, the caller receives *some* response — a last
//! cached copy, the offline fallback document, or a placeholder.

use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::error::FafnirError;
use crate::net::NetworkFetcher;
use crate::routing::RouteTable;
use crate::store::CacheStore;
use crate::strategy::StrategyExecutor;
use crate::sync::DeferredActionQueue;
use crate::telemetry;
use crate::types::{
    ControlMessage, ControlReply, Destination, Notice, ResourceRequest, StoredResponse,
    VersionToken,
};
use crate::{version, Result};

/// Lifecycle states of a gateway generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Installing,
    Waiting,
    Activating,
    Active,
}

/// The resource caching gateway.
///
/// Built via [`Fafnir::builder()`](crate::Fafnir::builder). All methods
/// take `&self`; wrap in an [`Arc`] to share across tasks.
pub struct Gateway {
    version: VersionToken,
    state: RwLock<LifecycleState>,
    routes: RouteTable,
    executor: StrategyExecutor,
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn NetworkFetcher>,
    precache_manifest: Vec<ResourceRequest>,
    precache_cache: String,
    offline_fallback: Option<ResourceRequest>,
    skip_waiting: bool,
    network_timeout: std::time::Duration,
    notices: broadcast::Sender<Notice>,
    sync: DeferredActionQueue,
}

impl Gateway {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        version: VersionToken,
        routes: RouteTable,
        executor: StrategyExecutor,
        store: Arc<dyn CacheStore>,
        fetcher: Arc<dyn NetworkFetcher>,
        precache_manifest: Vec<ResourceRequest>,
        precache_cache: String,
        offline_fallback: Option<ResourceRequest>,
        skip_waiting: bool,
        network_timeout: std::time::Duration,
        sync: DeferredActionQueue,
    ) -> Self {
        let (notices, _) = broadcast::channel(16);
        Self {
            version,
            state: RwLock::new(LifecycleState::Installing),
            routes,
            executor,
            store,
            fetcher,
            precache_manifest,
            precache_cache,
            offline_fallback,
            skip_waiting,
            network_timeout,
            notices,
            sync,
        }
    }

    pub fn version(&self) -> &VersionToken {
        &self.version
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    /// Subscribe to gateway notifications (update broadcasts).
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// The deferred action queue.
    pub fn sync(&self) -> &DeferredActionQueue {
        &self.sync
    }

    /// Pre-populate the versioned precache from the manifest.
    ///
    /// All-or-nothing: every manifest entry is fetched concurrently, and
    /// any failure deletes the partially filled cache and fails the whole
    /// step, so no partial generation is ever served. Safe to call again
    /// after a failure.
    pub async fn install(&self) -> Result<()> {
        *self.state.write().await = LifecycleState::Installing;
        debug!(version = %self.version, entries = self.precache_manifest.len(), "install started");

        let fetches = self.precache_manifest.iter().map(|request| async move {
            let fetched = self.fetcher.fetch(request, self.network_timeout).await?;
            if !fetched.is_success() {
                return Err(FafnirError::InvalidResponse {
                    url: request.url.to_string(),
                    reason: format!("status {}", fetched.status),
                });
            }
            Ok((request.cache_key(), fetched.into_stored()))
        });

        let mut entries = Vec::with_capacity(self.precache_manifest.len());
        for result in join_all(fetches).await {
            match result {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    self.store.delete_cache(&self.precache_cache).await?;
                    return Err(FafnirError::InstallFailed(e.to_string()));
                }
            }
        }
        for (key, response) in entries {
            if let Err(e) = self.store.put(&self.precache_cache, &key, response).await {
                self.store.delete_cache(&self.precache_cache).await?;
                return Err(e);
            }
        }

        *self.state.write().await = LifecycleState::Waiting;
        info!(version = %self.version, "install complete");
        if self.skip_waiting {
            self.activate().await?;
        }
        Ok(())
    }

    /// Activate this generation: delete every cache belonging to a prior
    /// version token, take over, and broadcast the update notice.
    pub async fn activate(&self) -> Result<()> {
        *self.state.write().await = LifecycleState::Activating;

        for name in self.store.cache_names().await? {
            if !self.version.owns(&name) {
                self.store.delete_cache(&name).await?;
                debug!(cache = %name, "deleted stale-generation cache");
            }
        }

        *self.state.write().await = LifecycleState::Active;
        info!(version = %self.version, "activated");
        // No receivers is fine; sessions may subscribe later.
        let _ = self.notices.send(Notice::SwUpdated {
            version: self.version.to_string(),
        });
        Ok(())
    }

    /// Resolve an intercepted request.
    ///
    /// Read-only requests run their routed strategy; any strategy failure
    /// is converted into a served fallback, never surfaced. Non-read-only
    /// requests bypass the gateway entirely — straight to the network,
    /// no caching, and errors propagate untouched.
    pub async fn handle_request(&self, request: &ResourceRequest) -> Result<StoredResponse> {
        let Some(route) = self.routes.resolve(request) else {
            let fetched = self.fetcher.fetch(request, self.network_timeout).await?;
            return Ok(fetched.into_stored());
        };

        match self.executor.execute(&route, request).await {
            // Revalidation handle (if any) is dropped: fire-and-forget.
            Ok(result) => Ok(result.response),
            Err(e) => Ok(self.serve_fallback(request, e).await),
        }
    }

    /// The fallback chain: last cached copy anywhere → offline document
    /// (documents only) → generic placeholder.
    async fn serve_fallback(&self, request: &ResourceRequest, error: FafnirError) -> StoredResponse {
        warn!(key = %request.cache_key(), error = %error, "strategy failed, serving fallback");

        let key = request.cache_key();
        if let Ok(names) = self.store.cache_names().await {
            for name in names {
                if let Ok(Some(response)) = self.store.get(&name, &key).await {
                    metrics::counter!(telemetry::FALLBACKS_TOTAL, "kind" => "last_cached")
                        .increment(1);
                    return response;
                }
            }
        }

        if request.destination == Destination::Document {
            if let Some(fallback) = &self.offline_fallback {
                if let Ok(Some(response)) = self
                    .store
                    .get(&self.precache_cache, &fallback.cache_key())
                    .await
                {
                    metrics::counter!(telemetry::FALLBACKS_TOTAL, "kind" => "offline_document")
                        .increment(1);
                    return response;
                }
            }
        }

        metrics::counter!(telemetry::FALLBACKS_TOTAL, "kind" => "placeholder").increment(1);
        StoredResponse::service_unavailable()
    }

    /// Handle a control message. Messages are independent of each other
    /// and of in-flight requests.
    pub async fn handle_message(&self, message: ControlMessage) -> ControlReply {
        match message {
            ControlMessage::GetVersion => ControlReply::Version {
                version: format!("{} ({})", self.version, version::build_version()),
            },
            ControlMessage::SkipWaiting => match self.activate().await {
                Ok(()) => ControlReply::Done,
                Err(e) => ControlReply::Failed {
                    reason: e.to_string(),
                },
            },
            ControlMessage::BackgroundSync { tag, payload } => {
                match self.sync.enqueue(tag, payload).await {
                    Ok(()) => ControlReply::Done,
                    Err(e) => ControlReply::Failed {
                        reason: e.to_string(),
                    },
                }
            }
            ControlMessage::ClearCache => match self.store.delete_cache(&self.precache_cache).await
            {
                Ok(_) => ControlReply::Done,
                Err(e) => ControlReply::Failed {
                    reason: e.to_string(),
                },
            },
        }
    }
}
