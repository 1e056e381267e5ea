//! Health endpoint integration tests.

mod common;

use common::TestHarness;

#[tokio::test]
async fn health_check_returns_ok() {
    let harness = TestHarness::new();

    let response = harness.server.get("/health").await;

    response.assert_status_ok();
}

#[tokio::test]
async fn health_check_returns_json() {
    let harness = TestHarness::new();

    let response = harness.server.get("/health").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "ri-billing");
    assert_eq!(body["analytics_configured"], false);
}

#[tokio::test]
async fn health_reports_analytics_configured() {
    let harness = TestHarness::with_analytics(Some("http://localhost:9".into()));

    let body: serde_json::Value = harness.server.get("/health").await.json();
    assert_eq!(body["analytics_configured"], true);
}
