use serde_json::Value;

use super::helpers::TestServer;

#[tokio::test]
async fn test_health_reports_bot_connectivity() {
    let server = TestServer::new().await;

    let response = server.client.get(server.url("/health")).send().await.unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "fault-relay");
    assert_eq!(body["telegram"]["connected"], true);
    assert_eq!(body["telegram"]["bot_username"], "test_relay_bot");
}

#[tokio::test]
async fn test_health_needs_no_secret_and_sends_nothing() {
    let server = TestServer::new().await;

    let response = server.client.get(server.url("/health")).send().await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(server.transport.calls(), 0);
}

#[tokio::test]
async fn test_root_lists_endpoints() {
    let server = TestServer::new().await;

    let response = server.client.get(server.url("/")).send().await.unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["service"], "fault-relay");
    let endpoints = body["endpoints"].as_array().unwrap();
    assert!(endpoints.iter().any(|e| e == "/webhook/error"));
}
