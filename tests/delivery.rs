//! Integration tests for delivery against a mocked Bot API.

use std::sync::Arc;

use fault_relay::{
    config::{BaseHttpClientConfig, TelegramConfig},
    http_client::create_http_client,
    notification::{DeliveryClient, DeliveryOutcome, FailureKind, TelegramTransport},
    test_helpers::{RecordingSleeper, TEST_BOT_TOKEN, TEST_CHAT_ID, create_test_config},
};
use mockito::Matcher;
use serde_json::json;
use tokio_util::sync::CancellationToken;

const SEND_PATH: &str = "/bot123456:test-token/sendMessage";

fn delivery_client(base_url: &str, sleeper: Arc<RecordingSleeper>) -> DeliveryClient {
    let telegram = TelegramConfig {
        bot_token: TEST_BOT_TOKEN.to_string(),
        chat_id: TEST_CHAT_ID.to_string(),
        api_base_url: base_url.to_string(),
        ..Default::default()
    };
    let client = create_http_client(&BaseHttpClientConfig::default()).unwrap();
    let transport = TelegramTransport::new(&telegram, client).unwrap();
    DeliveryClient::new(
        Arc::new(transport),
        create_test_config("secret").http_retry_config,
        sleeper,
        CancellationToken::new(),
    )
}

#[tokio::test]
async fn test_success_posts_html_message_to_chat() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", SEND_PATH)
        .match_body(Matcher::PartialJson(json!({
            "chat_id": TEST_CHAT_ID,
            "text": "<b>hello</b>",
            "parse_mode": "HTML",
        })))
        .with_status(200)
        .with_body(r#"{"ok":true,"result":{"message_id":1}}"#)
        .expect(1)
        .create_async()
        .await;

    let client = delivery_client(&server.url(), Arc::new(RecordingSleeper::default()));
    let outcome = client.deliver("<b>hello</b>").await;

    assert_eq!(outcome, DeliveryOutcome::Delivered { attempts: 1 });
    mock.assert_async().await;
}

#[tokio::test]
async fn test_server_errors_exhaust_retries() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", SEND_PATH)
        .with_status(503)
        .with_body(r#"{"ok":false,"error_code":503,"description":"Service Unavailable"}"#)
        .expect(4)
        .create_async()
        .await;

    let sleeper = Arc::new(RecordingSleeper::default());
    let client = delivery_client(&server.url(), sleeper.clone());
    let outcome = client.deliver("hello").await;

    match outcome {
        DeliveryOutcome::Failed(failure) => {
            assert_eq!(failure.kind, FailureKind::Transient);
            assert_eq!(failure.attempts, 4);
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(sleeper.delays().len(), 3);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_bad_request_is_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", SEND_PATH)
        .with_status(400)
        .with_body(r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#)
        .expect(1)
        .create_async()
        .await;

    let sleeper = Arc::new(RecordingSleeper::default());
    let client = delivery_client(&server.url(), sleeper.clone());
    let outcome = client.deliver("hello").await;

    match outcome {
        DeliveryOutcome::Failed(failure) => {
            assert_eq!(failure.kind, FailureKind::Permanent);
            assert_eq!(failure.attempts, 1);
            assert!(!failure.reason.contains(TEST_BOT_TOKEN));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(sleeper.delays().is_empty());
    mock.assert_async().await;
}
