//! Signed-request authentication tests
//!
//! Exercises the full path: registration, HMAC signing by the client and
//! verification by the gateway middleware over the raw request body.

use std::sync::Arc;

use rstest::rstest;
use serde_json::Value;

use wecom_relay::services::{
    sign_body, AuthError, Authenticator, MasterKey, SecretStore, SignedRequest,
};

use crate::common::{
    bodies, unique_name, EnterpriseBuilder, MockTenantStore, TestApp, OTHER_MASTER_KEY,
    TEST_CORP_ID,
};

const VERIFY: &str = "/api/v1/gateway/verify";

#[tokio::test]
async fn test_acme_signed_request_is_accepted() {
    let app = TestApp::new().await;
    let acme = app.register(&unique_name("Acme")).await;

    let response = app
        .signed_post(VERIFY, &acme.api_key, &acme.secret_key, bodies::ACME_SIGNED)
        .await;
    response.assert_ok();

    let json: Value = response.json();
    assert_eq!(json["enterprise_id"], acme.enterprise_id.to_string());
    assert_eq!(json["name"], acme.name.as_str());
    assert_eq!(json["wecom_corp_id"], TEST_CORP_ID);
}

#[tokio::test]
async fn test_tampered_body_is_rejected() {
    let app = TestApp::new().await;
    let acme = app.register(&unique_name("Acme")).await;

    let signature = sign_body(&acme.secret_key, bodies::ACME_SIGNED).unwrap();
    let response = app
        .post_with_headers(
            VERIFY,
            &[("X-API-Key", acme.api_key.as_str()), ("X-Signature", signature.as_str())],
            bodies::ACME_TAMPERED.to_vec(),
        )
        .await;

    response.assert_forbidden();
    assert_eq!(response.error_kind(), "unauthorized");
}

#[tokio::test]
async fn test_signature_over_reserialized_body_is_rejected() {
    let app = TestApp::new().await;
    let acme = app.register(&unique_name("Acme")).await;

    // Same JSON value, different bytes
    let signature = sign_body(&acme.secret_key, br#"{"x":1}"#).unwrap();
    let response = app
        .post_with_headers(
            VERIFY,
            &[("X-API-Key", acme.api_key.as_str()), ("X-Signature", signature.as_str())],
            br#"{ "x": 1 }"#.to_vec(),
        )
        .await;

    response.assert_forbidden();
}

#[rstest]
#[case::no_signature(true, false)]
#[case::no_api_key(false, true)]
#[case::neither(false, false)]
#[tokio::test]
async fn test_missing_headers_are_rejected(#[case] with_key: bool, #[case] with_signature: bool) {
    let app = TestApp::new().await;
    let acme = app.register(&unique_name("Acme")).await;
    let signature = sign_body(&acme.secret_key, bodies::ACME_SIGNED).unwrap();

    let mut headers: Vec<(&str, &str)> = Vec::new();
    if with_key {
        headers.push(("X-API-Key", acme.api_key.as_str()));
    }
    if with_signature {
        headers.push(("X-Signature", signature.as_str()));
    }

    let response = app
        .post_with_headers(VERIFY, &headers, bodies::ACME_SIGNED.to_vec())
        .await;
    response.assert_unauthorized();
    assert_eq!(response.error_kind(), "missing_credentials");
}

#[rstest]
#[case::no_signature(Some("some-api-key"), None)]
#[case::empty_signature(Some("some-api-key"), Some(""))]
#[case::no_api_key(None, Some("deadbeef"))]
#[tokio::test]
async fn test_missing_credentials_never_reach_store(
    #[case] api_key: Option<&str>,
    #[case] signature: Option<&str>,
) {
    let store = Arc::new(MockTenantStore::new());
    let authenticator = Authenticator::new(store.clone(), Arc::new(SecretStore::ephemeral()));

    let request = SignedRequest {
        api_key,
        signature: signature.filter(|s| !s.is_empty()),
        body: bodies::ACME_SIGNED,
    };

    let err = authenticator.authenticate(&request).await.unwrap_err();
    assert!(matches!(err, AuthError::MissingCredentials));
    assert_eq!(store.lookups(), 0);
}

#[tokio::test]
async fn test_unknown_inactive_and_bad_signature_look_identical() {
    let app = TestApp::new().await;
    let active = app.register(&unique_name("Active")).await;
    let inactive = app.register(&unique_name("Inactive")).await;

    app.admin(
        "PUT",
        &format!("/api/v1/enterprises/{}/status", inactive.enterprise_id),
        Some(serde_json::json!({"is_active": false})),
    )
    .await
    .assert_ok();

    let body = bodies::ACME_SIGNED;
    let responses = [
        app.signed_post(VERIFY, "unknown-api-key", &active.secret_key, body)
            .await,
        app.signed_post(VERIFY, &inactive.api_key, &inactive.secret_key, body)
            .await,
        app.signed_post(VERIFY, &active.api_key, &inactive.secret_key, body)
            .await,
    ];

    for response in &responses {
        response.assert_forbidden();
    }
    assert_eq!(responses[0].body, responses[1].body);
    assert_eq!(responses[1].body, responses[2].body);
}

#[tokio::test]
async fn test_deactivation_applies_to_next_request() {
    let app = TestApp::new().await;
    let acme = app.register(&unique_name("Acme")).await;
    let status_uri = format!("/api/v1/enterprises/{}/status", acme.enterprise_id);

    app.signed_post(VERIFY, &acme.api_key, &acme.secret_key, b"{}")
        .await
        .assert_ok();

    app.admin("PUT", &status_uri, Some(serde_json::json!({"is_active": false})))
        .await
        .assert_ok();
    app.signed_post(VERIFY, &acme.api_key, &acme.secret_key, b"{}")
        .await
        .assert_forbidden();

    app.admin("PUT", &status_uri, Some(serde_json::json!({"is_active": true})))
        .await
        .assert_ok();
    app.signed_post(VERIFY, &acme.api_key, &acme.secret_key, b"{}")
        .await
        .assert_ok();
}

#[tokio::test]
async fn test_deleted_enterprise_is_rejected() {
    let app = TestApp::new().await;
    let acme = app.register(&unique_name("Acme")).await;

    app.admin(
        "DELETE",
        &format!("/api/v1/enterprises/{}", acme.enterprise_id),
        None,
    )
    .await
    .assert_no_content();

    app.signed_post(VERIFY, &acme.api_key, &acme.secret_key, b"{}")
        .await
        .assert_forbidden();
}

#[tokio::test]
async fn test_tenant_signature_does_not_transfer() {
    let app = TestApp::new().await;
    let a = app.register(&unique_name("Tenant A")).await;
    let b = app.register(&unique_name("Tenant B")).await;

    app.signed_post(VERIFY, &b.api_key, &a.secret_key, bodies::ACME_SIGNED)
        .await
        .assert_forbidden();
}

#[tokio::test]
async fn test_master_key_mismatch_is_internal_error() {
    let app = TestApp::new().await;
    let acme = app.register(&unique_name("Acme")).await;

    let restarted = app.with_master_key(OTHER_MASTER_KEY);
    let response = restarted
        .signed_post(VERIFY, &acme.api_key, &acme.secret_key, bodies::ACME_SIGNED)
        .await;

    response.assert_internal_error();
    assert_eq!(response.error_kind(), "internal_error");
    assert!(!response.text().contains("master key"));
}

#[tokio::test]
async fn test_store_outage_fails_closed() {
    let builder = EnterpriseBuilder::new();
    let secrets = Arc::new(SecretStore::new(MasterKey::generate()));
    let store = Arc::new(MockTenantStore::with([builder.build(&secrets)]));
    let authenticator = Authenticator::new(store.clone(), secrets.clone());

    let enterprise = builder.build(&secrets);
    let signature = sign_body(builder.secret_key(), b"{}").unwrap();
    let request = SignedRequest {
        api_key: Some(enterprise.api_key.as_str()),
        signature: Some(signature.as_str()),
        body: b"{}",
    };

    assert!(authenticator.authenticate(&request).await.is_ok());

    store.set_failing(true);
    let err = authenticator.authenticate(&request).await.unwrap_err();
    assert!(matches!(err, AuthError::Store(_)));
    assert_eq!(store.lookups(), 2);
}

#[tokio::test]
async fn test_whoami_signs_empty_body() {
    let app = TestApp::new().await;
    let acme = app.register(&unique_name("Acme")).await;
    let signature = sign_body(&acme.secret_key, b"").unwrap();

    let response = app
        .request(
            axum::http::Request::builder()
                .uri("/api/v1/gateway/whoami")
                .header("X-API-Key", &acme.api_key)
                .header("X-Signature", &signature)
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await;

    response.assert_ok();
    let json: Value = response.json();
    assert_eq!(json["enterprise_id"], acme.enterprise_id.to_string());
}

#[tokio::test]
async fn test_oversized_body_is_rejected_before_authentication() {
    let app = TestApp::new().await;
    let acme = app.register(&unique_name("Acme")).await;

    let body = vec![b'a'; app.state.config.server.max_body_bytes + 1];
    let response = app
        .signed_post(VERIFY, &acme.api_key, &acme.secret_key, &body)
        .await;

    response.assert_payload_too_large();
    assert_eq!(response.error_kind(), "payload_too_large");
}

#[tokio::test]
async fn test_oversized_declared_length_is_rejected_without_reading_body() {
    let app = TestApp::new().await;
    let acme = app.register(&unique_name("Acme")).await;

    let body = bodies::ACME_SIGNED;
    let signature = sign_body(&acme.secret_key, body).unwrap();
    let declared = (app.state.config.server.max_body_bytes + 1).to_string();
    let response = app
        .post_with_headers(
            VERIFY,
            &[
                ("X-API-Key", acme.api_key.as_str()),
                ("X-Signature", signature.as_str()),
                ("Content-Length", declared.as_str()),
            ],
            body.to_vec(),
        )
        .await;

    response.assert_payload_too_large();
    assert_eq!(response.error_kind(), "payload_too_large");
}

#[tokio::test]
async fn test_concurrent_tenants_authenticate_independently() {
    let app = Arc::new(TestApp::new().await);
    let mut tenants = Vec::new();
    for i in 0..4 {
        tenants.push(app.register(&unique_name(&format!("Tenant {}", i))).await);
    }

    let mut handles = Vec::new();
    for tenant in tenants {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            let body = format!(r#"{{"tenant":"{}"}}"#, tenant.name);
            let response = app
                .signed_post(VERIFY, &tenant.api_key, &tenant.secret_key, body.as_bytes())
                .await;
            response.assert_ok();
            let json: Value = response.json();
            assert_eq!(json["enterprise_id"], tenant.enterprise_id.to_string());
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }
}
