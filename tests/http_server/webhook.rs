use std::time::Duration;

use fault_relay::{
    config::AppConfig,
    notification::DeliveryError,
    test_helpers::{ScriptedTransport, TEST_BOT_TOKEN, TEST_CHAT_ID, create_test_config},
};
use serde_json::{Value, json};

use super::helpers::{TEST_SECRET, TestServer};

fn sample_report() -> Value {
    json!({
        "error_message": "Database connection failed",
        "severity": "critical",
        "error_type": "ConnectionError",
        "file_name": "db.py",
        "line_number": 42,
        "app_name": "billing",
        "environment": "production",
        "tags": { "region": "eu-west-1" }
    })
}

#[tokio::test]
async fn test_missing_secret_is_unauthorized() {
    let server = TestServer::new().await;

    let response =
        server.client.post(server.url("/webhook/error")).json(&sample_report()).send().await.unwrap();

    assert_eq!(response.status(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["outcome"], "rejected-unauthorized");
    assert_eq!(server.transport.calls(), 0);
}

#[tokio::test]
async fn test_wrong_secret_is_forbidden() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/webhook/error"))
        .header("X-Webhook-Secret", "wrong")
        .json(&sample_report())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 403);
    assert_eq!(server.transport.calls(), 0);
}

#[tokio::test]
async fn test_unauthenticated_garbage_is_rejected_before_parsing() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/webhook/error"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_invalid_reports_are_unprocessable() {
    let server = TestServer::new().await;

    for body in [
        json!({ "severity": "error" }),
        json!({ "error_message": "   " }),
        json!({ "error_message": "x", "severity": "catastrophic" }),
        json!({ "error_message": "x", "device": { "cpu_usage": 140.0 } }),
    ] {
        let response = server
            .client
            .post(server.url("/webhook/error"))
            .header("X-Webhook-Secret", TEST_SECRET)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 422, "body: {body}");
    }
    assert_eq!(server.transport.calls(), 0);
}

#[tokio::test]
async fn test_report_is_delivered_then_suppressed() {
    let server = TestServer::new().await;

    let send = || {
        server
            .client
            .post(server.url("/webhook/error"))
            .header("X-Webhook-Secret", TEST_SECRET)
            .json(&sample_report())
            .send()
    };

    let first = send().await.unwrap();
    assert_eq!(first.status(), 200);
    let first: Value = first.json().await.unwrap();
    assert_eq!(first["success"], true);
    assert_eq!(first["outcome"], "delivered");
    assert!(first["error_id"].is_string());
    let fingerprint = first["fingerprint"].as_str().unwrap().to_string();

    let second = send().await.unwrap();
    assert_eq!(second.status(), 200);
    let second: Value = second.json().await.unwrap();
    assert_eq!(second["outcome"], "suppressed-duplicate");
    assert_eq!(second["suppressed_count"], 1);
    assert_eq!(second["fingerprint"], fingerprint.as_str());

    assert_eq!(server.transport.calls(), 1);
    let sent = server.transport.sent();
    assert!(sent[0].contains("Database connection failed"));
    assert!(sent[0].contains("CRITICAL"));
}

#[tokio::test]
async fn test_budget_exhaustion_returns_retry_after() {
    let config = AppConfig::builder()
        .webhook_secret(TEST_SECRET)
        .telegram(TEST_BOT_TOKEN, TEST_CHAT_ID)
        .rate_limit(1, Duration::from_secs(60))
        .build();
    let server = TestServer::with(config, ScriptedTransport::accepting()).await;

    let post = |message: &'static str| {
        server
            .client
            .post(server.url("/webhook/error"))
            .header("X-Webhook-Secret", TEST_SECRET)
            .json(&json!({ "error_message": message }))
            .send()
    };

    assert_eq!(post("first").await.unwrap().status(), 200);

    let throttled = post("second").await.unwrap();
    assert_eq!(throttled.status(), 429);
    let retry_after: u64 = throttled
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap();
    assert!((1..=60).contains(&retry_after));
    let body: Value = throttled.json().await.unwrap();
    assert_eq!(body["outcome"], "throttled");
    assert_eq!(body["retry_after_seconds"], retry_after);

    assert_eq!(server.transport.calls(), 1);
}

#[tokio::test]
async fn test_delivery_failure_is_bad_gateway() {
    let transport =
        ScriptedTransport::with_script([Err(DeliveryError::Permanent("chat not found".into()))]);
    let server = TestServer::with(create_test_config(TEST_SECRET), transport).await;

    let response = server
        .client
        .post(server.url("/webhook/error"))
        .header("X-Webhook-Secret", TEST_SECRET)
        .json(&sample_report())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 502);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["outcome"], "delivery-failed");
    assert!(body["error_id"].is_string());
}

#[tokio::test]
async fn test_test_endpoint_sends_sample_notification() {
    let server = TestServer::new().await;

    for _ in 0..2 {
        let response = server
            .client
            .post(server.url("/webhook/test"))
            .header("X-Webhook-Secret", TEST_SECRET)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["outcome"], "delivered");
    }

    assert_eq!(server.transport.calls(), 2);
    assert!(server.transport.sent()[0].contains("test notification"));
}

#[tokio::test]
async fn test_test_endpoint_requires_secret() {
    let server = TestServer::new().await;

    let response = server.client.post(server.url("/webhook/test")).send().await.unwrap();

    assert_eq!(response.status(), 401);
    assert_eq!(server.transport.calls(), 0);
}
