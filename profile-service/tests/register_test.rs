mod common;

use common::{body_json, json_post, TestApp, DEFAULT_GROUP};
use profile_service::services::{IdentityCall, MockIdentityProvider, MockProfileStore, ProfileStore};
use service_core::axum::http::StatusCode;
use tower::ServiceExt;

fn registration() -> serde_json::Value {
    serde_json::json!({
        "email": "a@x.com",
        "username": "a",
        "password": "Passw0rd1",
        "confirmPassword": "Passw0rd1",
        "firstName": "A",
        "lastName": "B"
    })
}

#[tokio::test]
async fn register_returns_tokens_and_stores_profile() {
    let app = TestApp::spawn();

    let response = app
        .router
        .clone()
        .oneshot(json_post("/auth/register", registration()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["access_token"], "access-token");
    assert_eq!(body["refresh_token"], "refresh-token");

    let profile = app.store.find_by_email("a@x.com").await.unwrap().unwrap();
    assert_eq!(profile.kid, "kc-user-1");
    assert_eq!(profile.clients, vec!["app1"]);
    assert_eq!(profile.groups, vec![DEFAULT_GROUP]);
    assert_eq!(profile.roles.len(), 1);
    assert_eq!(profile.roles[0].title, "viewer");
    assert_eq!(profile.roles[0].client_id, "app1");

    let account = &app.identity.created_accounts()[0];
    assert_eq!(account.profile_id, profile.id);
}

#[tokio::test]
async fn password_mismatch_is_bad_request_without_provider_calls() {
    let app = TestApp::spawn();
    let mut body = registration();
    body["confirmPassword"] = serde_json::json!("nope");

    let response = app
        .router
        .clone()
        .oneshot(json_post("/auth/register", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Password and confirm password do not match");
    assert!(app.identity.calls().is_empty());
}

#[tokio::test]
async fn duplicate_email_is_bad_request() {
    let app = TestApp::spawn();

    let first = app
        .router
        .clone()
        .oneshot(json_post("/auth/register", registration()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);
    let calls_after_first = app.identity.calls().len();

    let second = app
        .router
        .clone()
        .oneshot(json_post("/auth/register", registration()))
        .await
        .unwrap();

    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(second).await["error"], "User already exists");
    assert_eq!(app.identity.calls().len(), calls_after_first);
}

#[tokio::test]
async fn invalid_email_is_bad_request() {
    let app = TestApp::spawn();
    let mut body = registration();
    body["email"] = serde_json::json!("not-an-email");

    let response = app
        .router
        .clone()
        .oneshot(json_post("/auth/register", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("email must be an email"));
}

#[tokio::test]
async fn missing_field_is_json_bad_request_without_provider_calls() {
    let app = TestApp::spawn();
    let mut body = registration();
    body.as_object_mut().unwrap().remove("confirmPassword");

    let response = app
        .router
        .clone()
        .oneshot(json_post("/auth/register", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json"
    );
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("confirmPassword"));
    assert!(app.identity.calls().is_empty());
    assert!(app.store.snapshot().is_empty());
}

#[tokio::test]
async fn upstream_failure_surfaces_message_with_same_shape() {
    let identity = MockIdentityProvider::new()
        .with_group(DEFAULT_GROUP, &["app1"])
        .failing_on("list_user_groups");
    let app = TestApp::with(identity, MockProfileStore::new(), common::test_config());

    let response = app
        .router
        .clone()
        .oneshot(json_post("/auth/register", registration()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "list_user_groups failed: 500 Internal Server Error");

    // Account and enrollment already happened, nothing was stored
    assert!(app
        .identity
        .calls()
        .iter()
        .any(|c| matches!(c, IdentityCall::AddUserToGroup { .. })));
    assert!(app.store.snapshot().is_empty());
}

#[tokio::test]
async fn register_is_rate_limited_per_ip() {
    let mut config = common::test_config();
    config.rate_limit.register_attempts = 1;
    let identity = MockIdentityProvider::new().with_group(DEFAULT_GROUP, &["app1"]);
    let app = TestApp::with(identity, MockProfileStore::new(), config);

    let mut body = registration();
    body["confirmPassword"] = serde_json::json!("mismatch");

    let first = app
        .router
        .clone()
        .oneshot(json_post("/auth/register", body.clone()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::BAD_REQUEST);

    let second = app
        .router
        .clone()
        .oneshot(json_post("/auth/register", body))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(second.headers().contains_key("retry-after"));
}
