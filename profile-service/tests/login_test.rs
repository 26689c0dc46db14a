mod common;

use common::{body_json, json_post, TestApp};
use profile_service::models::Profile;
use profile_service::services::{
    IdentityCall, MockIdentityProvider, MockProfileStore, TokenGrant,
};
use service_core::axum::http::StatusCode;
use tower::ServiceExt;

fn stored(username: &str) -> MockProfileStore {
    let mut profile = Profile::new();
    profile.username = username.to_string();
    profile.email = format!("{}@x.com", username);
    MockProfileStore::with_profiles(vec![profile])
}

fn credentials(username: &str) -> serde_json::Value {
    serde_json::json!({ "username": username, "password": "Passw0rd1" })
}

#[tokio::test]
async fn login_returns_provider_tokens() {
    let app = TestApp::with(MockIdentityProvider::new(), stored("a"), common::test_config());

    let response = app
        .router
        .clone()
        .oneshot(json_post("/auth/login", credentials("a")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["access_token"], "access-token");
    assert_eq!(body["refresh_token"], "refresh-token");
}

#[tokio::test]
async fn unknown_username_never_reaches_token_endpoint() {
    let app = TestApp::with(MockIdentityProvider::new(), stored("a"), common::test_config());

    let response = app
        .router
        .clone()
        .oneshot(json_post("/auth/login", credentials("ghost")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "User not found");
    assert!(!app.identity.calls().iter().any(|c| c.is_token_call()));
}

#[tokio::test]
async fn missing_refresh_token_is_credential_failure() {
    let identity = MockIdentityProvider::new().with_token_grant(TokenGrant {
        access_token: Some("access".to_string()),
        refresh_token: None,
        expires_in: None,
    });
    let app = TestApp::with(identity, stored("a"), common::test_config());

    let response = app
        .router
        .clone()
        .oneshot(json_post("/auth/login", credentials("a")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Failed to obtain tokens");
}

#[tokio::test]
async fn refresh_and_exchange_use_their_grants() {
    let app = TestApp::spawn();

    let refreshed = app
        .router
        .clone()
        .oneshot(json_post(
            "/auth/refresh",
            serde_json::json!({ "refreshToken": "old-refresh" }),
        ))
        .await
        .unwrap();
    assert_eq!(refreshed.status(), StatusCode::OK);

    let exchanged = app
        .router
        .clone()
        .oneshot(json_post(
            "/auth/exchange",
            serde_json::json!({ "subjectToken": "google-token", "subjectIssuer": "google" }),
        ))
        .await
        .unwrap();
    assert_eq!(exchanged.status(), StatusCode::OK);

    assert_eq!(
        app.identity.calls(),
        vec![
            IdentityCall::RefreshGrant,
            IdentityCall::ExchangeToken("google".to_string()),
        ]
    );
}

#[tokio::test]
async fn malformed_token_bodies_share_the_error_shape() {
    let app = TestApp::spawn();

    let refreshed = app
        .router
        .clone()
        .oneshot(json_post("/auth/refresh", serde_json::json!({ "refreshToken": 42 })))
        .await
        .unwrap();
    assert_eq!(refreshed.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(refreshed).await["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid request body"));

    let exchanged = app
        .router
        .clone()
        .oneshot(json_post(
            "/auth/exchange",
            serde_json::json!({ "subjectToken": "", "subjectIssuer": "google" }),
        ))
        .await
        .unwrap();
    assert_eq!(exchanged.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(exchanged).await["error"]
        .as_str()
        .unwrap()
        .contains("subjectToken should not be empty"));

    assert!(app.identity.calls().is_empty());
}
