//! End-to-end flow: submit over HTTP, process in the pool, inspect the job.

use axum::http::StatusCode;
use serde_json::json;

use relayq_core::events::JobEvent;

use crate::helpers::{TestApp, test_config};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_message_is_processed() {
    let app = TestApp::new();
    let mut events = app.system.notifier().subscribe();

    let response = app
        .request("POST", "/message", Some(json!({"message": "hello"})))
        .await;
    let job_id = response.body["jobId"].as_str().unwrap().to_string();

    let job = app.wait_for_status(&job_id, "completed").await;
    assert_eq!(job["payload"]["text"], "hello");
    assert_eq!(job["return_value"]["processed"], true);
    assert!(job["return_value"]["processingTime"].as_i64().unwrap() >= 50);
    assert_eq!(job["attempts_made"], 1);

    let envelope = events.recv().await.unwrap();
    match envelope.event {
        JobEvent::Completed { job_id: id, .. } => assert_eq!(id.to_string(), job_id),
        other => panic!("unexpected event {other:?}"),
    }
    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_counts_track_lifecycle() {
    let mut config = test_config();
    config.worker.concurrency = 2;
    let app = TestApp::with_config(config);

    let mut ids = Vec::new();
    for text in ["one", "two", "three"] {
        let response = app
            .request("POST", "/message", Some(json!({"message": text})))
            .await;
        assert_eq!(response.status, StatusCode::OK);
        ids.push(response.body["jobId"].as_str().unwrap().to_string());
    }
    for id in &ids {
        app.wait_for_status(id, "completed").await;
    }

    let counts = app.request("GET", "/queues/messageQueue/counts", None).await;
    assert_eq!(counts.status, StatusCode::OK);
    assert_eq!(counts.body["data"]["queue"], "messageQueue");
    assert_eq!(counts.body["data"]["completed"], 3);
    assert_eq!(counts.body["data"]["waiting"], 0);
    assert_eq!(counts.body["data"]["active"], 0);
    app.shutdown().await;
}
