//! API integration tests
//!
//! Public endpoints and response-wide behavior.

use crate::common::TestApp;

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let app = TestApp::new().await;
    let response = app.get("/api/v1/health").await;

    response.assert_ok();

    let json: serde_json::Value = response.json();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_readiness_probe_checks_database() {
    let app = TestApp::new().await;
    let response = app.get("/api/v1/health/ready").await;

    response.assert_ok();

    let json: serde_json::Value = response.json();
    assert_eq!(json["status"], "ready");
    assert_eq!(json["components"]["database"]["status"], "healthy");
    assert_eq!(json["components"]["secret_store"]["status"], "healthy");
}

#[tokio::test]
async fn test_readiness_hides_database_error_details() {
    let app = TestApp::new().await;
    app.state.db.close().await;

    let response = app.get("/api/v1/health/ready").await;
    response.assert_status(axum::http::StatusCode::SERVICE_UNAVAILABLE);

    let json: serde_json::Value = response.json();
    assert_eq!(json["status"], "unavailable");
    assert_eq!(json["components"]["database"]["status"], "unhealthy");
    assert_eq!(json["components"]["database"]["message"], "database unavailable");
    assert!(!response.text().contains("closed"));
}

#[tokio::test]
async fn test_readiness_reports_ephemeral_key_as_degraded() {
    let mut config = crate::common::test_config();
    config.secrets.master_key = None;
    config.secrets.allow_ephemeral = true;
    let app = TestApp::with_config(config).await;

    let response = app.get("/api/v1/health/ready").await;
    response.assert_ok();

    let json: serde_json::Value = response.json();
    assert_eq!(json["components"]["secret_store"]["status"], "degraded");
}

#[tokio::test]
async fn test_responses_are_not_cacheable() {
    let app = TestApp::new().await;
    let response = app.get("/api/v1/health").await;

    assert_eq!(response.headers["cache-control"], "no-store");
    assert_eq!(response.headers["x-content-type-options"], "nosniff");
}

#[tokio::test]
async fn test_unknown_route_returns_not_found() {
    let app = TestApp::new().await;
    app.get("/api/v1/does-not-exist").await.assert_not_found();
}
