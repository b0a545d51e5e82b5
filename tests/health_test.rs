//! Integration tests for health checking and pool discovery
//!
//! These tests validate descriptor state transitions and speculative
//! pool growth against wiremock servers.

mod common;

use common::{seed, test_client};
use gradekit::ServerKind;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A live server flips its descriptor to enabled with no error.
#[tokio::test]
async fn test_check_one_success_postconditions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alive"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = test_client(vec![seed(ServerKind::Api, &[&server], 0)]);

    let result = client.check_one(ServerKind::Api, 0).await;
    assert!(result.is_ok(), "probe should succeed: {:?}", result.err());

    let descriptor = client.pool().descriptor(ServerKind::Api, 0).await.unwrap();
    assert!(descriptor.enabled);
    assert!(descriptor.last_error.is_none());
}

/// A non-200 answer disables the descriptor, records the reason, and
/// propagates the failure.
#[tokio::test]
async fn test_check_one_failure_postconditions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dbalive"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = test_client(vec![seed(ServerKind::Database, &[&server], 0)]);

    let result = client.check_one(ServerKind::Database, 0).await;
    assert!(result.is_err());

    let descriptor = client.pool().descriptor(ServerKind::Database, 0).await.unwrap();
    assert!(!descriptor.enabled);
    let reason = descriptor.last_error.expect("failure reason recorded");
    assert!(reason.contains("503"), "reason should name the status: {reason}");
}

/// An unreachable host records a transport reason.
#[tokio::test]
async fn test_check_one_transport_failure() {
    let client = test_client(vec![gradekit::pool::PoolSeed {
        kind: ServerKind::Storage,
        instances: vec![gradekit::pool::SeedInstance {
            index: 0,
            // Reserved port with nothing listening.
            host: Some("127.0.0.1:1".to_string()),
        }],
        next_index: Some(0),
    }]);

    let result = client.check_one(ServerKind::Storage, 0).await;
    assert!(result.is_err());

    let descriptor = client.pool().descriptor(ServerKind::Storage, 0).await.unwrap();
    assert!(!descriptor.enabled);
    assert!(descriptor.last_error.is_some());
}

/// A sweep settles even when every probe fails.
#[tokio::test]
async fn test_check_all_settles_when_everything_fails() {
    let s0 = MockServer::start().await;
    let s1 = MockServer::start().await;
    for server in [&s0, &s1] {
        Mock::given(method("GET"))
            .and(path("/alive"))
            .respond_with(ResponseTemplate::new(500))
            .mount(server)
            .await;
    }

    let client = test_client(vec![seed(ServerKind::Exercise, &[&s0, &s1], 1)]);

    let snapshot = client.check_all(ServerKind::Exercise).await;
    assert_eq!(snapshot.descriptors.len(), 2);
    assert!(snapshot.enabled_indices().is_empty());
    for descriptor in snapshot.descriptors.values() {
        assert!(descriptor.last_error.is_some());
    }
}

/// The growth probe advances `next_index` exactly when it succeeds.
#[tokio::test]
async fn test_check_all_grows_on_successful_probe() {
    let s0 = MockServer::start().await;
    let s1 = MockServer::start().await;
    for server in [&s0, &s1] {
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(server)
            .await;
    }

    // Index 1 is seeded but still the speculative candidate.
    let client = test_client(vec![seed(ServerKind::Storage, &[&s0, &s1], 1)]);

    let snapshot = client.check_all(ServerKind::Storage).await;
    assert_eq!(snapshot.next_index, 2, "successful probe should grow the pool");
    assert_eq!(snapshot.enabled_indices(), vec![0, 1]);
}

/// A failing growth probe leaves `next_index` unchanged for the next
/// sweep.
#[tokio::test]
async fn test_check_all_keeps_next_index_on_failed_probe() {
    let s0 = MockServer::start().await;
    let s1 = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&s0)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&s1)
        .await;

    let client = test_client(vec![seed(ServerKind::Storage, &[&s0, &s1], 1)]);

    let snapshot = client.check_all(ServerKind::Storage).await;
    assert_eq!(snapshot.next_index, 1);
    assert_eq!(snapshot.enabled_indices(), vec![0]);

    // The failed candidate stays registered for the next sweep.
    let probed = snapshot.descriptors.get(&1).unwrap();
    assert!(probed.last_error.is_some());
}

/// Warm-up sweeps every kind in one call.
#[tokio::test]
async fn test_check_everything_covers_all_kinds() {
    let server = MockServer::start().await;
    for health_path in ["/alive", "/dbalive", "/"] {
        Mock::given(method("GET"))
            .and(path(health_path))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
    }

    let client = test_client(
        ServerKind::all()
            .into_iter()
            .map(|kind| seed(kind, &[&server], 0))
            .collect(),
    );

    client.check_everything().await;

    for kind in ServerKind::all() {
        let descriptor = client.pool().descriptor(kind, 0).await.unwrap();
        assert!(descriptor.enabled, "kind {kind} should be enabled");
    }
}
