//! Telemetry metric name constants.
//!
//! Centralised metric names for fafnir operations. Consumers install their
//! own `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `fafnir_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `strategy` — caching strategy executed (e.g. "cache-first")
//! - `cache` — named cache the operation targeted
//! - `status` — outcome: "ok" or "error"
//! - `kind` — fallback kind: "last_cached", "offline_document", "placeholder"
//! - `reason` — eviction reason: "count" or "age"
//! - `tag` — deferred action tag

/// Total requests resolved through the gateway.
///
/// Labels: `strategy`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "fafnir_requests_total";

/// Total cache hits.
///
/// Labels: `cache`.
pub const CACHE_HITS_TOTAL: &str = "fafnir_cache_hits_total";

/// Total cache misses.
///
/// Labels: `cache`.
pub const CACHE_MISSES_TOTAL: &str = "fafnir_cache_misses_total";

/// Total entries evicted by expiration enforcement.
///
/// Labels: `cache`, `reason` ("count" | "age").
pub const EVICTIONS_TOTAL: &str = "fafnir_evictions_total";

/// Total fallback responses served after strategy failure.
///
/// Labels: `kind` ("last_cached" | "offline_document" | "placeholder").
pub const FALLBACKS_TOTAL: &str = "fafnir_fallbacks_total";

/// Total deferred action replay attempts.
///
/// Labels: `tag`, `status` ("ok" | "error").
pub const SYNC_REPLAYS_TOTAL: &str = "fafnir_sync_replays_total";
