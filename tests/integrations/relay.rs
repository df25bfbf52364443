//! End-to-end tests: a running relay in front of a mock ntfy server.

#[path = "../helpers/mod.rs"]
mod helpers;

use anyhow::Result;
use helpers::app::{TestAppBuilder, TEST_TOKEN, TEST_TOPIC};
use helpers::{mock_ntfy, received_bodies, unused_local_url};
use reqwest::StatusCode;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_alert_is_forwarded_and_status_mirrored() -> Result<()> {
    let ntfy = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("authorization", format!("Bearer {}", TEST_TOKEN).as_str()))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "topic": TEST_TOPIC,
            "title": "[FIRING] Disk usage",
            "message": "- host: db-1\n- value: 93%",
            "tags": ["information_source"],
            "priority": 3,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":"x1"}"#))
        .expect(1)
        .mount(&ntfy)
        .await;

    let app = TestAppBuilder::new(&ntfy.uri()).start().await?;

    let response = app
        .post_text("[FIRING] Disk usage\n*host: db-1\n*value: 93%\n")
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "");

    app.shutdown(Duration::from_secs(5)).await?;
    Ok(())
}

#[tokio::test]
async fn test_error_keyword_publishes_high_priority_warning() -> Result<()> {
    let ntfy = mock_ntfy(200).await;
    let app = TestAppBuilder::new(&ntfy.uri()).start().await?;

    let response = app.post_text("Backup job\nExited with ERROR code 2").await;
    assert_eq!(response.status(), StatusCode::OK);

    let bodies = received_bodies(&ntfy).await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["priority"], json!(5));
    assert_eq!(bodies[0]["tags"], json!(["warning"]));
    assert_eq!(bodies[0]["title"], json!("Backup job"));

    app.shutdown(Duration::from_secs(5)).await?;
    Ok(())
}

#[tokio::test]
async fn test_single_line_alert_has_empty_message() -> Result<()> {
    let ntfy = mock_ntfy(200).await;
    let app = TestAppBuilder::new(&ntfy.uri()).start().await?;

    app.post_text("  Deploy finished  ").await;

    let bodies = received_bodies(&ntfy).await;
    assert_eq!(bodies[0]["title"], json!("Deploy finished"));
    assert_eq!(bodies[0]["message"], json!(""));
    assert_eq!(bodies[0]["priority"], json!(3));

    app.shutdown(Duration::from_secs(5)).await?;
    Ok(())
}

#[tokio::test]
async fn test_message_path_is_equivalent_to_root() -> Result<()> {
    let ntfy = mock_ntfy(200).await;
    let app = TestAppBuilder::new(&ntfy.uri()).start().await?;

    let body = json!({ "text": "Title\nbody" }).to_string();
    let root = app.post("/", body.clone()).await;
    let message = app.post("/message", body).await;

    assert_eq!(root.status(), StatusCode::OK);
    assert_eq!(message.status(), StatusCode::OK);
    let bodies = received_bodies(&ntfy).await;
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0], bodies[1]);

    app.shutdown(Duration::from_secs(5)).await?;
    Ok(())
}

#[tokio::test]
async fn test_ntfy_error_status_is_passed_through() -> Result<()> {
    let ntfy = mock_ntfy(507).await;
    let app = TestAppBuilder::new(&ntfy.uri()).start().await?;

    let response = app.post_text("quota\nexceeded").await;

    assert_eq!(response.status(), StatusCode::INSUFFICIENT_STORAGE);

    app.shutdown(Duration::from_secs(5)).await?;
    Ok(())
}

#[tokio::test]
async fn test_missing_text_returns_400_without_calling_ntfy() -> Result<()> {
    let ntfy = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&ntfy)
        .await;
    let app = TestAppBuilder::new(&ntfy.uri()).start().await?;

    let response = app.post("/", r#"{"message": "no text here"}"#).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.text().await?.contains("Missing 'text' field"));

    let response = app.post("/", r#"{"text": ""}"#).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    app.shutdown(Duration::from_secs(5)).await?;
    Ok(())
}

#[tokio::test]
async fn test_malformed_json_returns_500_without_calling_ntfy() -> Result<()> {
    let ntfy = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&ntfy)
        .await;
    let app = TestAppBuilder::new(&ntfy.uri()).start().await?;

    let response = app.post("/", "{\"text\": ").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!response.text().await?.is_empty());

    app.shutdown(Duration::from_secs(5)).await?;
    Ok(())
}

#[tokio::test]
async fn test_unreachable_ntfy_returns_500_with_description() -> Result<()> {
    let app = TestAppBuilder::new(&unused_local_url()).start().await?;

    let response = app.post_text("anything").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.text().await?;
    assert!(body.contains("error sending request"), "unexpected body: {body}");

    app.shutdown(Duration::from_secs(5)).await?;
    Ok(())
}

#[tokio::test]
async fn test_repeated_alerts_are_forwarded_independently() -> Result<()> {
    let ntfy = mock_ntfy(200).await;
    let app = TestAppBuilder::new(&ntfy.uri()).start().await?;

    for _ in 0..2 {
        let response = app.post_text("Same alert\nsame body").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let bodies = received_bodies(&ntfy).await;
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0], bodies[1]);

    app.shutdown(Duration::from_secs(5)).await?;
    Ok(())
}

#[tokio::test]
async fn test_concurrent_alerts_are_all_forwarded() -> Result<()> {
    let ntfy = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(100)))
        .expect(8)
        .mount(&ntfy)
        .await;
    let app = TestAppBuilder::new(&ntfy.uri()).start().await?;

    let requests = (0..8).map(|i| app.post_text(format!("alert {i}")));
    let responses = futures::future::join_all(requests).await;

    assert!(responses.iter().all(|r| r.status() == StatusCode::OK));

    app.shutdown(Duration::from_secs(5)).await?;
    Ok(())
}

#[tokio::test]
async fn test_shutdown_stops_the_listener() -> Result<()> {
    let ntfy = mock_ntfy(200).await;
    let app = TestAppBuilder::new(&ntfy.uri()).start().await?;
    let addr = app.addr;

    app.shutdown(Duration::from_secs(5)).await?;

    let result = reqwest::Client::new()
        .post(format!("http://{}/", addr))
        .body(r#"{"text": "late"}"#)
        .send()
        .await;
    assert!(result.is_err(), "listener should be closed after shutdown");
    Ok(())
}
