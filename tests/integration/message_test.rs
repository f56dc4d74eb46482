//! Integration tests for the message submission endpoint.

use std::sync::Arc;

use axum::body::Body;
use axum::http::StatusCode;
use serde_json::json;

use relayq_store::StoreManager;

use crate::helpers::{EnqueueDownStore, STORE_DOWN_MESSAGE, TestApp, test_config};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_submit_message_success() {
    let app = TestApp::new();

    let response = app
        .request("POST", "/message", Some(json!({"message": "hello"})))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "success");
    assert_eq!(response.body["message"], "Message added to queue");
    assert!(response.body["jobId"].is_string());
    app.shutdown().await;
}

#[tokio::test]
async fn test_missing_message_rejected() {
    let mut config = test_config();
    config.worker.enabled = false;
    let app = TestApp::with_config(config);

    for body in [json!({}), json!({"message": ""}), json!({"message": "   "})] {
        let response = app.request("POST", "/message", Some(body)).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body["status"], "error");
        assert_eq!(response.body["message"], "No message provided");
    }

    let counts = app.request("GET", "/queues/messageQueue/counts", None).await;
    assert_eq!(counts.body["data"]["waiting"], 0);
    app.shutdown().await;
}

#[tokio::test]
async fn test_store_failure_is_server_error() {
    let store = StoreManager::from_store(Arc::new(EnqueueDownStore::default()));
    let app = TestApp::with_store(test_config(), store);

    let response = app
        .request("POST", "/message", Some(json!({"message": "hello"})))
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["status"], "error");
    assert_eq!(response.body["message"], STORE_DOWN_MESSAGE);
    assert_eq!(response.body["error"], "STORE_UNAVAILABLE");

    let counts = app.request("GET", "/queues/messageQueue/counts", None).await;
    assert_eq!(counts.status, StatusCode::OK);
    assert_eq!(counts.body["data"]["waiting"], 0);
    assert_eq!(counts.body["data"]["active"], 0);
    app.shutdown().await;
}

#[tokio::test]
async fn test_malformed_json_is_client_error() {
    let mut config = test_config();
    config.worker.enabled = false;
    let app = TestApp::with_config(config);

    let response = app.send("POST", "/message", Body::from("{not json")).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["status"], "error");
    app.shutdown().await;
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let app = TestApp::new();

    let missing = app
        .request("GET", "/jobs/0191c7a0-0000-7000-8000-000000000000", None)
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let invalid = app.request("GET", "/jobs/not-a-uuid", None).await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    app.shutdown().await;
}

#[tokio::test]
async fn test_health_reports_store_and_pool() {
    let app = TestApp::new();

    let response = app.request("GET", "/health", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "ok");
    assert_eq!(response.body["data"]["store"], "connected");
    assert_eq!(response.body["data"]["worker"]["in_flight"], 0);
    app.shutdown().await;
}
