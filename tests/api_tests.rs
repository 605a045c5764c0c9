//! HTTP contract tests for the Quorum API.

mod common;

use axum::body::Bytes;
use axum_test::TestServer;
use common::mocks::{CallLog, MockFactory, provider, registry};
use quorum::llm::Capability;
use quorum::types::ResultStatus;
use quorum::utils::toml_config::OrchestrationConfig;
use quorum::{AppState, OrchestrationService};
use serde_json::{Value, json};
use std::sync::Arc;

/// Server over `factory`, with a reasoning pair and a single sentiment provider.
fn create_test_server(factory: MockFactory) -> (TestServer, Arc<CallLog>) {
    let registry = registry(vec![
        provider("mock1", &[Capability::Reasoning], 1).with_reliability(0.8),
        provider("mock2", &[Capability::Reasoning], 2),
        provider("mood", &[Capability::Sentiment], 1),
    ]);
    let log = factory.log();
    let service =
        OrchestrationService::new(registry, Arc::new(factory), OrchestrationConfig::default());
    let state = AppState {
        service: Arc::new(service),
    };

    let server = TestServer::new(quorum::api::app(state)).expect("Failed to create test server");
    (server, log)
}

fn healthy() -> MockFactory {
    MockFactory::new()
        .reply("mock1", "Demand for Rust engineers keeps growing steadily")
        .reply("mock2", "Rust engineers remain in growing demand")
        .reply("mood", "Optimistic")
}

// ============= Orchestrate =============

#[tokio::test]
async fn test_orchestrate_single_capability() {
    let (server, log) = create_test_server(healthy());

    let response = server
        .post("/api/orchestrate")
        .json(&json!({ "query": "Is demand growing?", "capabilities": ["reasoning"] }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["content"], "Demand for Rust engineers keeps growing steadily");
    assert_eq!(body["fallbackUsed"], false);
    assert_eq!(body["contributingProviders"], json!(["mock1"]));
    assert!((body["confidence"].as_f64().unwrap() - 0.9).abs() < 1e-9);
    assert_eq!(body["perTask"][0]["status"], "SUCCESS");
    assert_eq!(body["perTask"][0]["provider"], "mock1");
    assert_eq!(log.calls(), vec!["mock1"]);
}

#[tokio::test]
async fn test_orchestrate_fallback_is_reported() {
    let factory = MockFactory::new()
        .fail("mock1", ResultStatus::RateLimited)
        .reply("mock2", "Second opinion");
    let (server, _) = create_test_server(factory);

    let response = server
        .post("/api/orchestrate")
        .json(&json!({ "query": "Why?", "capabilities": ["Reasoning"] }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["content"], "Second opinion");
    assert_eq!(body["fallbackUsed"], true);
    assert_eq!(body["perTask"][0]["status"], "RATE_LIMITED");
    assert_eq!(body["perTask"][1]["status"], "SUCCESS");
    // (0.5 + 0.5 * 0.5) / 2
    assert!((body["confidence"].as_f64().unwrap() - 0.375).abs() < 1e-9);
}

#[tokio::test]
async fn test_orchestrate_fanout_reports_agreement() {
    let (server, log) = create_test_server(healthy());

    let response = server
        .post("/api/orchestrate")
        .json(&json!({
            "query": "Is demand growing?",
            "capabilities": ["reasoning"],
            "mode": "fanout"
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let content = body["content"].as_str().unwrap();
    assert!(content.starts_with("Demand for Rust engineers keeps growing steadily"));
    assert!(content.contains("Agreement: 2 of 2 providers concur (mock1, mock2)."));
    assert_eq!(body["contributingProviders"], json!(["mock1", "mock2"]));
    assert_eq!(log.count(), 2);
}

#[tokio::test]
async fn test_orchestrate_defaults_to_every_capability() {
    let (server, _) = create_test_server(healthy());

    let response = server
        .post("/api/orchestrate")
        .json(&json!({ "query": "Outlook?" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let content = body["content"].as_str().unwrap();
    assert!(content.contains("## Reasoning"));
    assert!(content.contains("## Sentiment\nOptimistic"));
}

#[tokio::test]
async fn test_orchestrate_degrades_when_every_provider_fails() {
    let factory = MockFactory::new()
        .fail("mock1", ResultStatus::Timeout)
        .fail("mock2", ResultStatus::AuthError);
    let (server, _) = create_test_server(factory);

    let response = server
        .post("/api/orchestrate")
        .json(&json!({ "query": "Anything?", "capabilities": ["reasoning"] }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["confidence"], 0.0);
    assert_eq!(body["fallbackUsed"], true);
    assert_eq!(body["contributingProviders"], json!([]));
    let content = body["content"].as_str().unwrap();
    assert!(content.contains("No provider produced an answer"));
    assert!(content.contains("TIMEOUT"));
    assert!(content.contains("AUTH_ERROR"));
}

// ============= Validation =============

#[tokio::test]
async fn test_empty_query_is_rejected_before_dispatch() {
    let (server, log) = create_test_server(healthy());

    let response = server
        .post("/api/orchestrate")
        .json(&json!({ "query": "   " }))
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("query"));
    assert_eq!(log.count(), 0);
}

#[tokio::test]
async fn test_unknown_capability_is_rejected() {
    let (server, log) = create_test_server(healthy());

    let response = server
        .post("/api/orchestrate")
        .json(&json!({ "query": "q", "capabilities": ["telepathy"] }))
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("telepathy"));
    assert_eq!(log.count(), 0);
}

#[tokio::test]
async fn test_deadline_out_of_range_is_rejected() {
    let (server, _) = create_test_server(healthy());

    for deadline in [0, 120_001] {
        let response = server
            .post("/api/orchestrate")
            .json(&json!({ "query": "q", "deadlineMs": deadline }))
            .await;
        response.assert_status_bad_request();
    }
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let (server, log) = create_test_server(healthy());

    let response = server
        .post("/api/orchestrate")
        .bytes(Bytes::from_static(b"{\"query\": "))
        .content_type("application/json")
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert!(body["error"].is_string());
    assert_eq!(log.count(), 0);
}

// ============= Catalog and health =============

#[tokio::test]
async fn test_list_providers() {
    let factory = MockFactory::new().reply("mock1", "x");
    let (server, _) = create_test_server(factory);

    let response = server.get("/api/providers").await;

    response.assert_status_ok();
    let body: Value = response.json();
    let providers = body.as_array().unwrap();
    assert_eq!(providers.len(), 3);

    let mock1 = providers.iter().find(|p| p["id"] == "mock1").unwrap();
    assert_eq!(mock1["available"], true);
    assert_eq!(mock1["capabilities"], json!(["reasoning"]));

    let mood = providers.iter().find(|p| p["id"] == "mood").unwrap();
    assert_eq!(mood["available"], false);
}

#[tokio::test]
async fn test_check_providers_calls_each_adapter() {
    let factory = MockFactory::new()
        .reply("mock1", "ready")
        .fail("mock2", ResultStatus::RateLimited);
    let (server, log) = create_test_server(factory);

    let response = server.get("/api/providers/check").await;

    response.assert_status_ok();
    let body: Value = response.json();
    let checks = body.as_array().unwrap();
    let ids: Vec<&str> = checks.iter().map(|c| c["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["mock1", "mood", "mock2"]);

    assert_eq!(checks[0]["status"], "SUCCESS");
    assert!(checks[0].get("detail").is_none());
    assert_eq!(checks[1]["status"], "UNAVAILABLE");
    assert_eq!(checks[1]["latencyMs"], 0);
    assert_eq!(checks[2]["status"], "RATE_LIMITED");

    assert_eq!(log.count_for("mock1"), 1);
    assert_eq!(log.count_for("mock2"), 1);
    assert_eq!(log.count_for("mood"), 0);
}

#[tokio::test]
async fn test_health() {
    let (server, _) = create_test_server(healthy());

    let response = server.get("/api/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["providers"], 3);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_openapi_document() {
    let (server, _) = create_test_server(healthy());

    let response = server.get("/api-docs/openapi.json").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["paths"]["/api/orchestrate"]["post"].is_object());
    assert!(body["paths"]["/api/providers"]["get"].is_object());
    assert!(body["paths"]["/api/providers/check"]["get"].is_object());
    assert!(body["paths"]["/api/health"]["get"].is_object());
}
