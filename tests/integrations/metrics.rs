//! The Prometheus endpoint reflects relayed traffic.
//!
//! The recorder is process-global, so this binary holds a single test.

#[path = "../helpers/mod.rs"]
mod helpers;

use anyhow::Result;
use helpers::app::TestAppBuilder;
use helpers::mock_ntfy;
use reqwest::StatusCode;
use std::time::Duration;

#[tokio::test]
async fn test_metrics_endpoint_counts_requests_by_outcome() -> Result<()> {
    let ntfy = mock_ntfy(200).await;
    let app = TestAppBuilder::new(&ntfy.uri()).with_metrics().start().await?;
    let metrics_addr = app
        .metrics_addr
        .expect("metrics should be enabled for this test");

    assert_eq!(app.post_text("first\nok").await.status(), StatusCode::OK);
    assert_eq!(app.post_text("second\nok").await.status(), StatusCode::OK);
    assert_eq!(
        app.post("/", r#"{"nope": 1}"#).await.status(),
        StatusCode::BAD_REQUEST
    );

    let body = reqwest::get(format!("http://{}/metrics", metrics_addr))
        .await?
        .text()
        .await?;

    assert!(
        body.contains(r#"relay_requests_total{outcome="forwarded"} 2"#),
        "unexpected metrics output:\n{body}"
    );
    assert!(
        body.contains(r#"relay_requests_total{outcome="rejected"} 1"#),
        "unexpected metrics output:\n{body}"
    );
    assert!(
        body.contains(r#"ntfy_responses_total{status="200"} 2"#),
        "unexpected metrics output:\n{body}"
    );
    assert!(body.contains("ntfy_request_duration_seconds_bucket"));

    app.shutdown(Duration::from_secs(5)).await?;
    Ok(())
}
