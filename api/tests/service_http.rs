//! End-to-end tests for `SourceService` against a mock HTTP backend.
//!
//! Every failure resolves the call to `None` and travels on the error
//! bus; these tests pin the taxonomy: rejected statuses publish the
//! backend's detail, transport failures publish a synthetic 500, and
//! elapsed deadlines publish nothing at all.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};
use wallflower_api::service::{THIRD_PARTY_SERVICE_ERROR, TOKEN_STORAGE_KEY, UNEXPECTED_ERROR};
use wallflower_api::{ApiError, Endpoint, Operation, ServiceConfig, SourceService};
use wallflower_core::event_bus::EventBus;
use wallflower_core::storage::{MemoryStorage, Storage};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Test Fixtures
// =============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct User {
    id: u64,
    name: String,
}

/// A service bound to the `users` contract on the mock server.
fn users_service(
    server: &MockServer,
    storage: MemoryStorage,
    events: EventBus<ApiError>,
) -> SourceService<MemoryStorage> {
    let config = ServiceConfig::new(&Endpoint::remote("users", server.uri()))
        .unwrap()
        .with_timeout(Duration::from_secs(2));
    SourceService::new(config, storage, events).unwrap()
}

// =============================================================================
// Tests
// =============================================================================

/// A 2xx response decodes into the caller's type.
#[tokio::test]
async fn test_successful_call_decodes_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "Ada"},
            {"id": 2, "name": "Grace"},
        ])))
        .mount(&server)
        .await;

    let service = users_service(&server, MemoryStorage::new(), EventBus::new());
    let users: Option<Vec<User>> = service.bound(Operation::Query).send().await;

    assert_eq!(
        users,
        Some(vec![
            User {
                id: 1,
                name: "Ada".to_owned()
            },
            User {
                id: 2,
                name: "Grace".to_owned()
            },
        ])
    );
}

/// A rejected status publishes the backend's detail on the error bus.
#[tokio::test]
async fn test_rejected_call_publishes_backend_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/read"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"detail": "No such user"})),
        )
        .mount(&server)
        .await;

    let events = EventBus::new();
    let mut errors = events.subscribe();
    let service = users_service(&server, MemoryStorage::new(), events);

    let user: Option<User> = service.bound(Operation::Read).send().await;
    assert!(user.is_none());

    let error = errors.try_next().unwrap();
    assert_eq!(error.status, 404);
    assert_eq!(error.details, "No such user");
    assert!(error.retry.is_none());
}

/// An error body without a usable detail falls back to the generic message.
#[tokio::test]
async fn test_missing_detail_falls_back_to_generic_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let events = EventBus::new();
    let mut errors = events.subscribe();
    let service = users_service(&server, MemoryStorage::new(), events);

    let user: Option<User> = service.bound(Operation::Read).send().await;
    assert!(user.is_none());

    let error = errors.try_next().unwrap();
    assert_eq!(error.status, 500);
    assert_eq!(error.details, UNEXPECTED_ERROR);
}

/// A transport failure publishes a synthetic 500.
#[tokio::test]
async fn test_transport_failure_publishes_synthetic_500() {
    let events = EventBus::new();
    let mut errors = events.subscribe();

    // Port 9 is the discard service; nothing listens there.
    let config = ServiceConfig::new(&Endpoint::remote("users", "http://127.0.0.1:9")).unwrap();
    let service = SourceService::new(config, MemoryStorage::new(), events).unwrap();

    let user: Option<User> = service.bound(Operation::Query).send().await;
    assert!(user.is_none());

    let error = errors.try_next().unwrap();
    assert_eq!(error.status, 500);
    assert_eq!(error.details, THIRD_PARTY_SERVICE_ERROR);
}

/// An elapsed deadline resolves to `None` without publishing anything.
#[tokio::test]
async fn test_elapsed_deadline_publishes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let events = EventBus::new();
    let mut errors = events.subscribe();
    let config = ServiceConfig::new(&Endpoint::remote("users", server.uri()))
        .unwrap()
        .with_timeout(Duration::from_millis(100));
    let service = SourceService::new(config, MemoryStorage::new(), events).unwrap();

    let users: Option<Vec<User>> = service.bound(Operation::Query).send().await;
    assert!(users.is_none());
    assert!(errors.try_next().is_none());
}

/// A stored session token rides along as a bearer header.
#[tokio::test]
async fn test_stored_token_is_attached_as_bearer_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/list"))
        .and(header(TOKEN_STORAGE_KEY, "Bearer tok123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let storage = MemoryStorage::new();
    storage.save(TOKEN_STORAGE_KEY, "tok123").unwrap();

    let service = users_service(&server, storage, EventBus::new());
    let users: Option<Vec<User>> = service.bound(Operation::Query).send().await;

    // The mock only matches when the header is present.
    assert_eq!(users, Some(Vec::new()));
}

/// No token in storage means no token header on the wire.
#[tokio::test]
async fn test_empty_storage_sends_no_token_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let service = users_service(&server, MemoryStorage::new(), EventBus::new());
    let users: Option<Vec<User>> = service.bound(Operation::Query).send().await;
    assert!(users.is_some());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get(TOKEN_STORAGE_KEY).is_none());
    assert_eq!(
        requests[0].headers.get("content-type").unwrap(),
        "application/json"
    );
}

/// Caller headers override the defaults, including the content type.
#[tokio::test]
async fn test_caller_header_overrides_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("content-type", "text/plain"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let service = users_service(&server, MemoryStorage::new(), EventBus::new());
    let users: Option<Vec<User>> = service
        .bound(Operation::Create)
        .json(&json!({"name": "Ada"}))
        .header("Content-Type", "text/plain")
        .send()
        .await;
    assert!(users.is_some());

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body, json!({"name": "Ada"}));
}

/// A retryable failure carries a replay handle that reissues the call.
#[tokio::test]
async fn test_retryable_failure_carries_working_replay() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "flaky"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let events = EventBus::new();
    let mut errors = events.subscribe();
    let service = users_service(&server, MemoryStorage::new(), events);

    let first: Option<Value> = service.bound(Operation::Query).retryable().send().await;
    assert!(first.is_none());

    let error = errors.try_next().unwrap();
    assert_eq!(error.details, "flaky");
    let retry = error.retry.clone().unwrap();
    assert!(retry().await);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

/// A failed replay publishes again, this time without a retry handle.
#[tokio::test]
async fn test_failed_replay_is_not_retryable_again() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "still down"})))
        .mount(&server)
        .await;

    let events = EventBus::new();
    let mut errors = events.subscribe();
    let service = users_service(&server, MemoryStorage::new(), events);

    let first: Option<Value> = service.bound(Operation::Query).retryable().send().await;
    assert!(first.is_none());

    let error = errors.try_next().unwrap();
    let retry = error.retry.clone().unwrap();
    assert!(!retry().await);

    let replay_error = errors.try_next().unwrap();
    assert_eq!(replay_error.status, 500);
    assert_eq!(replay_error.details, "still down");
    assert!(replay_error.retry.is_none());
}
