//! Integration tests for [`StrategyExecutor`] — the five caching
//! strategies against a mock network.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fafnir::store::{CacheStore, MemoryStore};
use fafnir::{
    FafnirError, HttpFetcher, ResolvedRoute, ResourceRequest, StoredResponse, StrategyExecutor,
    StrategyKind,
};

fn executor(store: &Arc<MemoryStore>) -> StrategyExecutor {
    StrategyExecutor::new(
        Arc::clone(store) as Arc<dyn CacheStore>,
        Arc::new(HttpFetcher::new()),
    )
}

fn route(strategy: StrategyKind, cache: &str) -> ResolvedRoute {
    ResolvedRoute {
        strategy,
        cache: cache.to_owned(),
        expiration: None,
        timeout: None,
    }
}

fn request(server: &MockServer, p: &str) -> ResourceRequest {
    ResourceRequest::get(format!("{}{p}", server.uri()).parse().unwrap())
}

async fn mount_ok(server: &MockServer, p: &str, body: &str, expect: u64) {
    Mock::given(method("GET"))
        .and(path(p))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(expect)
        .mount(server)
        .await;
}

// =========================================================================
// cache-first
// =========================================================================

#[tokio::test]
async fn cache_first_hit_never_touches_network() {
    let server = MockServer::start().await;
    mount_ok(&server, "/logo.png", "bytes", 1).await;

    let store = Arc::new(MemoryStore::new());
    let exec = executor(&store);
    let route = route(StrategyKind::CacheFirst, "images");
    let req = request(&server, "/logo.png");

    // First call misses and populates; second must be served from cache.
    // The mock's expect(1) verifies zero further network contact on drop.
    let first = exec.execute(&route, &req).await.unwrap();
    let second = exec.execute(&route, &req).await.unwrap();
    assert_eq!(first.response.text(), "bytes");
    assert_eq!(second.response.text(), "bytes");
}

#[tokio::test]
async fn cache_first_miss_propagates_network_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let exec = executor(&store);
    let req = request(&server, "/missing.png");

    let err = exec
        .execute(&route(StrategyKind::CacheFirst, "images"), &req)
        .await
        .unwrap_err();
    assert!(err.is_network_failure());
    // Invalid responses are never cached.
    assert!(store.get("images", &req.cache_key()).await.unwrap().is_none());
}

// =========================================================================
// network-first
// =========================================================================

#[tokio::test]
async fn network_first_stores_exactly_the_fetched_response() {
    let server = MockServer::start().await;
    mount_ok(&server, "/page", "fresh", 2).await;

    let store = Arc::new(MemoryStore::new());
    let exec = executor(&store);
    let route = route(StrategyKind::NetworkFirst, "pages");
    let req = request(&server, "/page");

    exec.execute(&route, &req).await.unwrap();
    let cached = store.get("pages", &req.cache_key()).await.unwrap().unwrap();
    assert_eq!(cached.text(), "fresh");

    // Replaying the same successful fetch does not change the stored bytes.
    exec.execute(&route, &req).await.unwrap();
    let again = store.get("pages", &req.cache_key()).await.unwrap().unwrap();
    assert_eq!(again.body, cached.body);
}

#[tokio::test]
async fn network_first_falls_back_to_cache_on_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let req = request(&server, "/page");
    store
        .put("pages", &req.cache_key(), StoredResponse::new(200, vec![], b"stale".to_vec()))
        .await
        .unwrap();

    let exec = executor(&store);
    let result = exec
        .execute(&route(StrategyKind::NetworkFirst, "pages"), &req)
        .await
        .unwrap();
    assert_eq!(result.response.text(), "stale");
}

#[tokio::test]
async fn network_first_falls_back_to_cache_on_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let req = request(&server, "/slow");
    store
        .put("pages", &req.cache_key(), StoredResponse::new(200, vec![], b"stale".to_vec()))
        .await
        .unwrap();

    let exec = executor(&store);
    let mut route = route(StrategyKind::NetworkFirst, "pages");
    route.timeout = Some(Duration::from_millis(50));

    let result = exec.execute(&route, &req).await.unwrap();
    assert_eq!(result.response.text(), "stale");
}

#[tokio::test]
async fn network_first_double_miss_is_no_source() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let exec = executor(&Arc::new(MemoryStore::new()));
    let err = exec
        .execute(&route(StrategyKind::NetworkFirst, "pages"), &request(&server, "/page"))
        .await
        .unwrap_err();
    assert!(matches!(err, FafnirError::NoSource(_)));
}

// =========================================================================
// stale-while-revalidate
// =========================================================================

#[tokio::test]
async fn swr_returns_stale_then_background_refresh_updates_cache() {
    let server = MockServer::start().await;
    mount_ok(&server, "/data", "new", 1).await;

    let store = Arc::new(MemoryStore::new());
    let req = request(&server, "/data");
    store
        .put("runtime", &req.cache_key(), StoredResponse::new(200, vec![], b"old".to_vec()))
        .await
        .unwrap();

    let exec = executor(&store);
    let result = exec
        .execute(&route(StrategyKind::StaleWhileRevalidate, "runtime"), &req)
        .await
        .unwrap();

    // The pre-fetch cached value comes back immediately.
    assert_eq!(result.response.text(), "old");

    // After the background refresh resolves, the cache holds the update.
    result.revalidation.unwrap().await.unwrap();
    let cached = store.get("runtime", &req.cache_key()).await.unwrap().unwrap();
    assert_eq!(cached.text(), "new");
}

#[tokio::test]
async fn swr_miss_awaits_the_network() {
    let server = MockServer::start().await;
    mount_ok(&server, "/data", "fresh", 1).await;

    let store = Arc::new(MemoryStore::new());
    let exec = executor(&store);
    let req = request(&server, "/data");

    let result = exec
        .execute(&route(StrategyKind::StaleWhileRevalidate, "runtime"), &req)
        .await
        .unwrap();
    assert_eq!(result.response.text(), "fresh");
    assert!(result.revalidation.is_none());
    assert!(store.get("runtime", &req.cache_key()).await.unwrap().is_some());
}

#[tokio::test]
async fn swr_failed_refresh_keeps_stale_entry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let req = request(&server, "/data");
    store
        .put("runtime", &req.cache_key(), StoredResponse::new(200, vec![], b"old".to_vec()))
        .await
        .unwrap();

    let exec = executor(&store);
    let result = exec
        .execute(&route(StrategyKind::StaleWhileRevalidate, "runtime"), &req)
        .await
        .unwrap();
    assert_eq!(result.response.text(), "old");

    result.revalidation.unwrap().await.unwrap();
    let cached = store.get("runtime", &req.cache_key()).await.unwrap().unwrap();
    assert_eq!(cached.text(), "old");
}

// =========================================================================
// degenerate strategies
// =========================================================================

#[tokio::test]
async fn cache_only_fails_on_miss() {
    let server = MockServer::start().await;
    let exec = executor(&Arc::new(MemoryStore::new()));
    let err = exec
        .execute(&route(StrategyKind::CacheOnly, "images"), &request(&server, "/a"))
        .await
        .unwrap_err();
    assert!(matches!(err, FafnirError::NoSource(_)));
}

#[tokio::test]
async fn cache_only_serves_hit() {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    let req = request(&server, "/a");
    store
        .put("images", &req.cache_key(), StoredResponse::new(200, vec![], b"hit".to_vec()))
        .await
        .unwrap();

    let result = executor(&store)
        .execute(&route(StrategyKind::CacheOnly, "images"), &req)
        .await
        .unwrap();
    assert_eq!(result.response.text(), "hit");
}

#[tokio::test]
async fn network_only_passes_through_without_caching() {
    let server = MockServer::start().await;
    // network-only is a pass-through: even a 404 is returned as-is.
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let req = request(&server, "/gone");
    let result = executor(&store)
        .execute(&route(StrategyKind::NetworkOnly, "unused"), &req)
        .await
        .unwrap();

    assert_eq!(result.response.status, 404);
    assert!(store.cache_names().await.unwrap().is_empty());
}
