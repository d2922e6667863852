//! Integration tests for [`Gateway`] request handling — the fallback
//! chain, the non-GET bypass, and the control channel.

use std::sync::Arc;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fafnir::store::{CacheStore, MemoryStore};
use fafnir::{
    ControlMessage, ControlReply, Destination, Fafnir, Gateway, LifecycleState, Method,
    ResourceRequest, Route, RoutePattern, StoredResponse, StrategyKind,
};

async fn mount_ok(server: &MockServer, p: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(p))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_failing(server: &MockServer, p: &str) {
    Mock::given(method("GET"))
        .and(path(p))
        .respond_with(ResponseTemplate::new(500))
        .mount(server)
        .await;
}

fn offline_gateway(server: &MockServer, store: &Arc<MemoryStore>) -> Gateway {
    Fafnir::builder()
        .version("v2")
        .offline_fallback(format!("{}/offline.html", server.uri()))
        .cache_store(Arc::clone(store) as Arc<dyn CacheStore>)
        .build()
        .unwrap()
}

fn document(server: &MockServer, p: &str) -> ResourceRequest {
    ResourceRequest::document(format!("{}{p}", server.uri()).parse().unwrap())
}

// =========================================================================
// Happy path
// =========================================================================

#[tokio::test]
async fn routed_request_resolves_through_its_strategy() {
    let server = MockServer::start().await;
    mount_ok(&server, "/logo.png", "bytes").await;

    let store = Arc::new(MemoryStore::new());
    let gw = Fafnir::builder()
        .version("v2")
        .route(Route::new(
            RoutePattern::UrlSuffix(".png".into()),
            StrategyKind::CacheFirst,
            "images",
        ))
        .cache_store(Arc::clone(&store) as Arc<dyn CacheStore>)
        .build()
        .unwrap();

    let req = ResourceRequest::get(format!("{}/logo.png", server.uri()).parse().unwrap());
    let response = gw.handle_request(&req).await.unwrap();
    assert_eq!(response.text(), "bytes");
    // Populated the version-qualified route cache.
    assert!(store.get("images-v2", &req.cache_key()).await.unwrap().is_some());
}

// =========================================================================
// Fallback chain
// =========================================================================

#[tokio::test]
async fn document_failure_serves_the_offline_fallback() {
    let server = MockServer::start().await;
    mount_ok(&server, "/offline.html", "you are offline").await;
    mount_failing(&server, "/page").await;

    let store = Arc::new(MemoryStore::new());
    let gw = offline_gateway(&server, &store);
    gw.install().await.unwrap();
    gw.activate().await.unwrap();

    // Document request with a dead network and an empty pages cache.
    let response = gw.handle_request(&document(&server, "/page")).await.unwrap();
    assert_eq!(response.text(), "you are offline");
}

#[tokio::test]
async fn last_cached_copy_wins_over_offline_document() {
    let server = MockServer::start().await;
    mount_ok(&server, "/offline.html", "you are offline").await;
    mount_failing(&server, "/page").await;

    let store = Arc::new(MemoryStore::new());
    let gw = offline_gateway(&server, &store);
    gw.install().await.unwrap();

    // The exact resource was cached at some point under a different
    // policy's cache.
    let req = document(&server, "/page");
    store
        .put(
            "legacy-v2",
            &req.cache_key(),
            StoredResponse::new(200, vec![], b"old copy".to_vec()),
        )
        .await
        .unwrap();

    let response = gw.handle_request(&req).await.unwrap();
    assert_eq!(response.text(), "old copy");
}

#[tokio::test]
async fn non_document_failure_serves_the_placeholder() {
    let server = MockServer::start().await;
    mount_failing(&server, "/x.png").await;

    let store = Arc::new(MemoryStore::new());
    let gw = offline_gateway(&server, &store);

    let req = ResourceRequest::get(format!("{}/x.png", server.uri()).parse().unwrap())
        .destination(Destination::Image);
    let response = gw.handle_request(&req).await.unwrap();
    assert_eq!(response.status, 503);
}

// =========================================================================
// Bypass
// =========================================================================

#[tokio::test]
async fn non_get_requests_bypass_the_cache() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/share"))
        .respond_with(ResponseTemplate::new(201).set_body_string("shared"))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let gw = offline_gateway(&server, &store);

    let req = ResourceRequest::new(
        Method::Post,
        format!("{}/api/share", server.uri()).parse().unwrap(),
        Destination::Api,
    );
    let response = gw.handle_request(&req).await.unwrap();
    assert_eq!(response.status, 201);
    assert!(store.cache_names().await.unwrap().is_empty());
}

#[tokio::test]
async fn bypass_errors_are_not_converted_to_fallbacks() {
    // A dead endpoint: connection refused.
    let store = Arc::new(MemoryStore::new());
    let gw = Fafnir::builder()
        .version("v2")
        .cache_store(Arc::clone(&store) as Arc<dyn CacheStore>)
        .build()
        .unwrap();

    let req = ResourceRequest::new(
        Method::Post,
        "http://127.0.0.1:9/api/share".parse().unwrap(),
        Destination::Api,
    );
    assert!(gw.handle_request(&req).await.is_err());
}

// =========================================================================
// Control channel
// =========================================================================

#[tokio::test]
async fn get_version_reports_the_generation_token() {
    let server = MockServer::start().await;
    let gw = offline_gateway(&server, &Arc::new(MemoryStore::new()));

    match gw.handle_message(ControlMessage::GetVersion).await {
        ControlReply::Version { version } => assert!(version.starts_with("v2")),
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test]
async fn skip_waiting_message_forces_activation() {
    let server = MockServer::start().await;
    let gw = offline_gateway(&server, &Arc::new(MemoryStore::new()));

    let reply = gw.handle_message(ControlMessage::SkipWaiting).await;
    assert_eq!(reply, ControlReply::Done);
    assert_eq!(gw.state().await, LifecycleState::Active);
}

#[tokio::test]
async fn clear_cache_message_purges_the_precache() {
    let server = MockServer::start().await;
    mount_ok(&server, "/offline.html", "offline").await;

    let store = Arc::new(MemoryStore::new());
    let gw = offline_gateway(&server, &store);
    gw.install().await.unwrap();
    assert!(!store.keys("precache-v2").await.unwrap().is_empty());

    let reply = gw.handle_message(ControlMessage::ClearCache).await;
    assert_eq!(reply, ControlReply::Done);
    assert!(store.keys("precache-v2").await.unwrap().is_empty());
}

#[tokio::test]
async fn background_sync_message_enqueues_an_action() {
    let server = MockServer::start().await;
    let gw = offline_gateway(&server, &Arc::new(MemoryStore::new()));

    let reply = gw
        .handle_message(ControlMessage::BackgroundSync {
            tag: "feedback".into(),
            payload: serde_json::json!({"msg": "x"}),
        })
        .await;
    assert_eq!(reply, ControlReply::Done);

    let pending = gw.sync().pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].tag, "feedback");
}
