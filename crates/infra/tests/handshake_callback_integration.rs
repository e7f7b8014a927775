//! End-to-end OAuth handshake: SQLite stores, the real Graph client against
//! a wiremock server, and the axum callback route.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use serde_json::json;
use socialhub_core::AccountStore;
use socialhub_domain::{Account, AccountState, MetaAppConfig, TargetKind};
use socialhub_infra::{callback_router, CallbackState};
use tower::util::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::{build_stack, TestDatabase, APP_BASE_URL};

async fn seed_credentials(stack: &support::TestStack) {
    let mut config = MetaAppConfig::empty();
    config.app_id = "app-id".into();
    config.app_secret = "app-secret".into();
    stack.configs.upsert("tenant-1", &config).await.expect("config seeded");
}

fn location_of(response: &axum::http::Response<Body>) -> String {
    response
        .headers()
        .get("location")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn full_handshake_connects_a_page_account() {
    let server = MockServer::start().await;
    let db = TestDatabase::new();
    let stack = build_stack(&db, &server.uri());
    seed_credentials(&stack).await;

    // Code exchange, then the forced long-lived upgrade
    Mock::given(method("GET"))
        .and(path("/oauth/access_token"))
        .and(query_param("code", "abc"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "U1", "expires_in": 5_184_000})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/oauth/access_token"))
        .and(query_param("grant_type", "fb_exchange_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "L1", "expires_in": 5_184_000})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "U", "name": "User"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me/accounts"))
        .and(query_param("access_token", "L1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"data": [{"id": "P1", "name": "Brand Page", "access_token": "PT1"}]}),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let account = Account::new("tenant-1", "Brand", "@brand", TargetKind::Page);
    stack.accounts.save(&account).await.expect("account saved");

    let authorize_url = stack
        .handshakes
        .begin_handshake("tenant-1", &account.id)
        .await
        .expect("handshake starts");
    assert!(authorize_url.contains("client_id=app-id"));

    let state = stack
        .accounts
        .get("tenant-1", &account.id)
        .await
        .expect("account stored")
        .oauth_state
        .expect("state issued");

    let router = callback_router(CallbackState::new(stack.handshakes.clone(), APP_BASE_URL));
    let response = router
        .oneshot(
            Request::get(format!("/oauth/callback?state={state}&code=abc"))
                .body(Body::empty())
                .expect("request built"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location_of(&response),
        format!("{APP_BASE_URL}/accounts/{}?connected=1", account.id)
    );

    let connected = stack.accounts.get("tenant-1", &account.id).await.expect("account stored");
    assert_eq!(connected.state, AccountState::Connected);
    assert_eq!(connected.external_uid.as_deref(), Some("P1"));
    assert_eq!(connected.access_token.as_deref(), Some("PT1"));
    assert_eq!(connected.user_access_token.as_deref(), Some("L1"));
    assert_eq!(connected.name, "Brand Page");
    assert!(connected.oauth_state.is_none());

    let messages =
        stack.activity.messages_for(&account.id).await.expect("activity readable");
    assert!(messages.iter().any(|m| m.contains("connected successfully")));
}

#[tokio::test]
async fn expired_state_disconnects_through_the_route() {
    let server = MockServer::start().await;
    let db = TestDatabase::new();
    let stack = build_stack(&db, &server.uri());
    seed_credentials(&stack).await;

    let mut account = Account::new("tenant-1", "Brand", "@brand", TargetKind::Page);
    account.oauth_state = Some("S-old".into());
    account.oauth_state_expires_at = Some(Utc::now() - Duration::minutes(1));
    stack.accounts.save(&account).await.expect("account saved");

    let router = callback_router(CallbackState::new(stack.handshakes.clone(), APP_BASE_URL));
    let response = router
        .oneshot(
            Request::get("/oauth/callback?state=S-old&code=abc")
                .body(Body::empty())
                .expect("request built"),
        )
        .await
        .expect("router responds");

    assert_eq!(
        location_of(&response),
        format!("{APP_BASE_URL}/accounts/{}?connected=0", account.id)
    );

    let stored = stack.accounts.get("tenant-1", &account.id).await.expect("account stored");
    assert_eq!(stored.state, AccountState::Disconnected);
    assert!(stored.oauth_state.is_none());

    let messages =
        stack.activity.messages_for(&account.id).await.expect("activity readable");
    assert!(messages.iter().any(|m| m.contains("state expired")));
    // No provider traffic for a stale callback
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn provider_rejection_is_preserved_on_the_trail() {
    let server = MockServer::start().await;
    let db = TestDatabase::new();
    let stack = build_stack(&db, &server.uri());
    seed_credentials(&stack).await;

    Mock::given(method("GET"))
        .and(path("/oauth/access_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(
            json!({"error": {"message": "Invalid verification code format.", "code": 100}}),
        ))
        .mount(&server)
        .await;

    let mut account = Account::new("tenant-1", "Brand", "@brand", TargetKind::Page);
    account.oauth_state = Some("S1".into());
    account.oauth_state_expires_at = Some(Utc::now() + Duration::minutes(15));
    stack.accounts.save(&account).await.expect("account saved");

    let router = callback_router(CallbackState::new(stack.handshakes.clone(), APP_BASE_URL));
    let response = router
        .oneshot(
            Request::get("/oauth/callback?state=S1&code=bad")
                .body(Body::empty())
                .expect("request built"),
        )
        .await
        .expect("router responds");

    assert_eq!(
        location_of(&response),
        format!("{APP_BASE_URL}/accounts/{}?connected=0", account.id)
    );

    let stored = stack.accounts.get("tenant-1", &account.id).await.expect("account stored");
    assert_eq!(stored.state, AccountState::Disconnected);

    let messages =
        stack.activity.messages_for(&account.id).await.expect("activity readable");
    assert!(messages.iter().any(|m| m.contains("Invalid verification code format.")));
}
