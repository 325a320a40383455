//! Request executor tests against a wiremock backend
//!
//! Exercises the full call path: breaker gate, token fetch, timeout budget,
//! header assembly, failure classification, and the uniform `{data, error}`
//! result shape.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dayflow_client::{
    ApiClient, CircuitBreaker, CircuitBreakerConfig, CircuitState, ClientConfig, StaticToken,
    TimeoutUpdate,
};

#[derive(Debug, Deserialize, PartialEq)]
struct Task {
    id: String,
    title: String,
}

// =============================================================================
// HELPERS
// =============================================================================

/// Route client log output through the test harness; `RUST_LOG` filters it.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Client pointed at the mock server, no auth.
fn test_client(server: &MockServer) -> ApiClient {
    init_tracing();
    let config = ClientConfig::default().with_base_url(server.uri());
    ApiClient::new(&config)
        .expect("client should build")
        .with_token_provider(Arc::new(dayflow_client::NoAuth))
}

/// Client with an injected breaker so tests control threshold and cool-down.
fn test_client_with_breaker(server: &MockServer, breaker: Arc<CircuitBreaker>) -> ApiClient {
    test_client(server).with_breaker(breaker)
}

// =============================================================================
// SUCCESS PATHS
// =============================================================================

#[tokio::test]
async fn test_get_returns_typed_data() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tasks/t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "t1", "title": "x"})))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let result = client.get::<Task>("/api/tasks/t1").await;

    assert_eq!(result.error, None);
    assert_eq!(
        result.data,
        Some(Task {
            id: "t1".into(),
            title: "x".into()
        })
    );
}

#[tokio::test]
async fn test_post_round_trip() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/tasks"))
        .and(body_json(json!({"title": "x"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "t1", "title": "x"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let result = client
        .post::<Task>("/api/tasks", Some(json!({"title": "x"})))
        .await;

    assert_eq!(result.error, None);
    assert_eq!(
        result.data,
        Some(Task {
            id: "t1".into(),
            title: "x".into()
        })
    );
}

#[tokio::test]
async fn test_patch_with_body() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/api/tasks/t1"))
        .and(body_json(json!({"title": "renamed"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "t1", "title": "renamed"})),
        )
        .mount(&server)
        .await;

    let client = test_client(&server);
    let result = client
        .patch::<Task>("/api/tasks/t1", Some(json!({"title": "renamed"})))
        .await;

    assert_eq!(result.error, None);
    assert_eq!(result.data.unwrap().title, "renamed");
}

#[tokio::test]
async fn test_delete_empty_body_is_clean_success() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/tasks/t1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let result = client.delete::<serde_json::Value>("/api/tasks/t1").await;

    // Legitimately empty success: both slots are None.
    assert_eq!(result.error, None);
    assert_eq!(result.data, None);
}

// =============================================================================
// HEADERS
// =============================================================================

#[tokio::test]
async fn test_bearer_token_and_content_type_sent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .and(header("Authorization", "Bearer session-123"))
        .and(header("Content-Type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server).with_token_provider(Arc::new(StaticToken::new("session-123")));
    let result = client.get::<serde_json::Value>("/api/tasks").await;

    assert_eq!(result.error, None);
}

#[tokio::test]
async fn test_caller_header_overrides_base() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/export"))
        .and(header("Content-Type", "text/csv"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let options = dayflow_client::RequestOptions::default().with_header("Content-Type", "text/csv");
    let result = client
        .request::<serde_json::Value>(reqwest::Method::GET, "/api/export", options)
        .await;

    assert_eq!(result.error, None);
}

// =============================================================================
// FAILURE CLASSIFICATION
// =============================================================================

#[tokio::test]
async fn test_401_yields_auth_expired_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "bad token"})))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let result = client.get::<serde_json::Value>("/api/tasks").await;

    assert_eq!(result.data, None);
    assert_eq!(
        result.error.as_deref(),
        Some("Authentication expired. Please log in again.")
    );
}

#[tokio::test]
async fn test_403_yields_access_denied_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/admin"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let result = client.get::<serde_json::Value>("/api/admin").await;

    assert_eq!(result.data, None);
    assert_eq!(
        result.error.as_deref(),
        Some("Access denied. Please check your authentication.")
    );
}

#[tokio::test]
async fn test_500_uses_body_error_field() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"error": "database unavailable"})),
        )
        .mount(&server)
        .await;

    let client = test_client(&server);
    let result = client.get::<serde_json::Value>("/api/tasks").await;

    assert_eq!(result.error.as_deref(), Some("database unavailable"));
}

#[tokio::test]
async fn test_500_without_error_field_uses_generic_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let result = client.get::<serde_json::Value>("/api/tasks").await;

    assert_eq!(result.error.as_deref(), Some("HTTP error! status: 500"));
}

#[tokio::test]
async fn test_connection_refused_yields_network_message() {
    // Unroutable local port, no server listening.
    let config = ClientConfig::default().with_base_url("http://127.0.0.1:9");
    let client = ApiClient::new(&config)
        .unwrap()
        .with_token_provider(Arc::new(dayflow_client::NoAuth));

    let result = client.get::<serde_json::Value>("/api/tasks").await;

    assert_eq!(result.data, None);
    assert_eq!(
        result.error.as_deref(),
        Some("Unable to connect to server. Please check your connection.")
    );
}

// =============================================================================
// TIMEOUTS
// =============================================================================

#[tokio::test]
async fn test_slow_endpoint_times_out_with_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = test_client(&server);
    client.set_timeouts(TimeoutUpdate::default().default_tier(Duration::from_millis(100)));

    let result = client.get::<serde_json::Value>("/api/tasks").await;

    assert_eq!(result.data, None);
    assert_eq!(
        result.error.as_deref(),
        Some("Request timed out. The server may be unresponsive.")
    );
}

#[tokio::test]
async fn test_timeout_counts_as_breaker_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let breaker = Arc::new(CircuitBreaker::new(
        CircuitBreakerConfig::default().with_failure_threshold(1),
    ));
    let client = test_client_with_breaker(&server, breaker.clone());
    client.set_timeouts(TimeoutUpdate::default().default_tier(Duration::from_millis(50)));

    let _ = client.get::<serde_json::Value>("/api/tasks").await;

    assert_eq!(breaker.state(), CircuitState::Open);
}

#[tokio::test]
async fn test_agent_path_gets_long_budget() {
    let server = MockServer::start().await;

    // Slower than the (shrunk) default tier but within the long tier.
    Mock::given(method("POST"))
        .and(path("/api/agent/plan"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"plan": "rest"}))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let client = test_client(&server);
    client.set_timeouts(
        TimeoutUpdate::default()
            .default_tier(Duration::from_millis(100))
            .long(Duration::from_secs(5)),
    );

    let result = client
        .post::<serde_json::Value>("/api/agent/plan", Some(json!({"goal": "plan my day"})))
        .await;

    assert_eq!(result.error, None);
}

// =============================================================================
// CIRCUIT BREAKER SCENARIOS
// =============================================================================

#[tokio::test]
async fn test_three_failures_open_breaker_and_fourth_skips_network() {
    let server = MockServer::start().await;

    // expect(3) verifies the fourth call never reaches the network.
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "down"})))
        .expect(3)
        .mount(&server)
        .await;

    let client = test_client(&server);

    for _ in 0..3 {
        let result = client.get::<serde_json::Value>("/api/tasks").await;
        assert_eq!(result.error.as_deref(), Some("down"));
    }
    assert_eq!(client.circuit_state(), CircuitState::Open);

    let fourth = client.get::<serde_json::Value>("/api/tasks").await;
    assert_eq!(fourth.data, None);
    assert!(fourth
        .error
        .unwrap()
        .starts_with("Service temporarily unavailable"));
}

#[tokio::test]
async fn test_breaker_recovers_after_cool_down() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let breaker = Arc::new(CircuitBreaker::new(
        CircuitBreakerConfig::default()
            .with_failure_threshold(1)
            .with_reset_period(Duration::from_millis(50)),
    ));
    let client = test_client_with_breaker(&server, breaker.clone());

    // Trip the breaker.
    let _ = client.get::<serde_json::Value>("/api/tasks").await;
    assert_eq!(breaker.state(), CircuitState::Open);

    // Still inside the cool-down: rejected without I/O.
    let rejected = client.get::<serde_json::Value>("/api/tasks").await;
    assert!(rejected
        .error
        .unwrap()
        .starts_with("Service temporarily unavailable"));

    tokio::time::sleep(Duration::from_millis(60)).await;

    // The trial call goes through and closes the circuit.
    let recovered = client.get::<serde_json::Value>("/api/tasks").await;
    assert_eq!(recovered.error, None);
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.failure_count(), 0);
}

#[tokio::test]
async fn test_dropped_trial_call_does_not_wedge_breaker() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    // The trial response is slow enough that the caller gives up first.
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_millis(400)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let breaker = Arc::new(CircuitBreaker::new(
        CircuitBreakerConfig::default()
            .with_failure_threshold(1)
            .with_reset_period(Duration::from_millis(50)),
    ));
    let client = test_client_with_breaker(&server, breaker.clone());

    // Trip the breaker, then wait out the cool-down.
    let _ = client.get::<serde_json::Value>("/api/tasks").await;
    assert_eq!(breaker.state(), CircuitState::Open);
    tokio::time::sleep(Duration::from_millis(60)).await;

    // The caller abandons the admitted trial mid-flight: the attempt future
    // is dropped and no success/failure is ever recorded for it.
    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        client.get::<serde_json::Value>("/api/tasks"),
    )
    .await;
    assert!(abandoned.is_err());
    assert_eq!(breaker.state(), CircuitState::HalfOpen);

    // After another reset period the stale trial slot expires, a fresh
    // trial is admitted, and the circuit recovers.
    tokio::time::sleep(Duration::from_millis(60)).await;
    let recovered = client.get::<serde_json::Value>("/api/tasks").await;
    assert_eq!(recovered.error, None);
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test]
async fn test_breaker_rejection_does_not_count_as_failure() {
    let server = MockServer::start().await;

    let breaker = Arc::new(CircuitBreaker::with_defaults());
    breaker.force_open();
    let client = test_client_with_breaker(&server, breaker.clone());

    for _ in 0..5 {
        let result = client.get::<serde_json::Value>("/api/tasks").await;
        assert!(result.error.is_some());
    }

    assert_eq!(breaker.failure_count(), 0);
    assert_eq!(breaker.state(), CircuitState::Open);
}

// =============================================================================
// CONNECTIVITY PROBE
// =============================================================================

#[tokio::test]
async fn test_connection_probe_true_on_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let client = test_client(&server);
    assert!(client.test_connection().await);
}

#[tokio::test]
async fn test_connection_probe_false_on_error_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = test_client(&server);
    assert!(!client.test_connection().await);
}

#[tokio::test]
async fn test_connection_probe_bypasses_open_breaker() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let breaker = Arc::new(CircuitBreaker::with_defaults());
    breaker.force_open();
    let client = test_client_with_breaker(&server, breaker.clone());

    // Probe succeeds despite the open circuit and leaves it untouched.
    assert!(client.test_connection().await);
    assert_eq!(breaker.state(), CircuitState::Open);
    assert_eq!(breaker.failure_count(), 0);
}
