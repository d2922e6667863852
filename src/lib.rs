//! Fafnir - offline-first resource caching gateway
//!
//! This crate provides a process-wide gateway that intercepts an
//! application's outbound read requests, resolves each one through a
//! per-route caching strategy against a persistent named-cache store, and
//! serves designated fallbacks when every source fails. Write-like
//! actions that cannot complete offline are persisted in a deferred
//! action queue and replayed when connectivity returns.
//!
//! # Example
//!
//! ```rust,no_run
//! use fafnir::{
//!     Destination, ExpirationPolicy, Fafnir, ResourceRequest, Route, RoutePattern,
//!     StrategyKind,
//! };
//!
//! #[tokio::main]
//! async fn main() -> fafnir::Result<()> {
//!     let gateway = Fafnir::builder()
//!         .version("v2")
//!         .precache(["https://app.example/", "https://app.example/app.css"])
//!         .offline_fallback("https://app.example/offline.html")
//!         .route(
//!             Route::new(
//!                 RoutePattern::Destination(Destination::Image),
//!                 StrategyKind::CacheFirst,
//!                 "images",
//!             )
//!             .expiration(ExpirationPolicy::new().max_entries(60)),
//!         )
//!         .build()?;
//!
//!     gateway.install().await?;
//!     gateway.activate().await?;
//!
//!     let response = gateway
//!         .handle_request(&ResourceRequest::get("https://app.example/logo.png".parse()?))
//!         .await?;
//!     println!("{}", response.status);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod gateway;
pub mod net;
pub mod routing;
pub mod store;
pub mod strategy;
pub mod sync;
pub mod telemetry;
pub mod types;
pub mod version;

// Re-export main types at crate root
pub use error::{FafnirError, Result};
pub use gateway::{Fafnir, FafnirBuilder, Gateway, LifecycleState};
pub use net::{FetchedResponse, HttpFetcher, NetworkFetcher};
pub use routing::{ResolvedRoute, Route, RoutePattern, RouteTable};
pub use store::{ActionStore, CacheStore, ExpirationPolicy, MemoryStore, SqliteStore};
pub use strategy::{StrategyExecutor, StrategyKind, StrategyResult};
pub use sync::{DeferredActionQueue, HttpSyncDispatcher, SyncDispatcher};

// Re-export all types
pub use types::{
    ControlMessage, ControlReply, DeferredAction, Destination, Method, Notice, ResourceRequest,
    StoredResponse, VersionToken,
};
