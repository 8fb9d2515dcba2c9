mod common;

use chrono::Duration;
use serde_json::Value;
use uuid::Uuid;

use blog_server::auth::Claims;
use common::{refresh_cookie_value, refresh_set_cookie, spawn_app, PASSWORD};

// --- Login Tests ---

#[tokio::test]
async fn login_returns_access_token_and_refresh_cookie() {
    let app = spawn_app();
    let user_id = app.seed_user("alice");

    let response = app.login("alice", PASSWORD).await;
    assert_eq!(200, response.status().as_u16());

    let set_cookie = refresh_set_cookie(&response).expect("No refresh cookie set");
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Secure"));
    assert!(set_cookie.contains("SameSite=Strict"));
    assert!(set_cookie.contains("Path=/auth/refresh"));
    assert!(set_cookie.contains("Max-Age=604800"));
    let cookie = refresh_cookie_value(&response).unwrap();
    assert_eq!(cookie.len(), 43);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 900);
    assert!(body.get("refresh_token").is_none());

    let claims = app
        .keys
        .validate_access_token(body["access_token"].as_str().unwrap())
        .expect("Issued token does not validate");
    assert_eq!(claims.user_id().unwrap(), user_id);

    let records = app.refresh_tokens.snapshot();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].user_id, user_id);
    assert!(!records[0].revoked);
    assert_ne!(records[0].token_hash, cookie);
    assert_eq!(records[0].ip_address.as_deref(), Some("127.0.0.1"));
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = spawn_app();
    app.seed_user("alice");

    let wrong_password = app.login("alice", "not-the-password").await;
    let unknown_user = app.login("mallory", PASSWORD).await;
    let malformed_user = app.login("a", PASSWORD).await;

    for response in [wrong_password, unknown_user, malformed_user] {
        assert_eq!(401, response.status().as_u16());
        assert!(refresh_set_cookie(&response).is_none());
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["code"], "INVALID_CREDENTIALS");
        assert_eq!(body["message"], "Invalid username or password");
    }

    assert!(app.refresh_tokens.snapshot().is_empty());
}

#[tokio::test]
async fn second_login_revokes_the_first_refresh_token() {
    let app = spawn_app();
    app.seed_user("alice");

    let (_, first) = app.login_as("alice").await;
    let (_, second) = app.login_as("alice").await;

    let records = app.refresh_tokens.snapshot();
    assert_eq!(records.len(), 2);
    assert!(records[0].revoked);
    assert!(!records[1].revoked);

    assert_eq!(401, app.refresh(Some(&first)).await.status().as_u16());
    assert_eq!(200, app.refresh(Some(&second)).await.status().as_u16());
}

// --- Refresh Tests ---

#[tokio::test]
async fn refresh_token_works_exactly_once() {
    let app = spawn_app();
    let user_id = app.seed_user("alice");
    let (_, cookie) = app.login_as("alice").await;

    let response = app.refresh(Some(&cookie)).await;
    assert_eq!(200, response.status().as_u16());
    assert!(refresh_set_cookie(&response).is_none());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["token_type"], "Bearer");
    let claims = app
        .keys
        .validate_access_token(body["access_token"].as_str().unwrap())
        .unwrap();
    assert_eq!(claims.user_id().unwrap(), user_id);
    assert!(app.refresh_tokens.snapshot()[0].revoked);

    let replay = app.refresh(Some(&cookie)).await;
    assert_eq!(401, replay.status().as_u16());
    let body: Value = replay.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_REFRESH_TOKEN");
}

#[tokio::test]
async fn refresh_without_or_with_unknown_cookie_is_rejected() {
    let app = spawn_app();

    for cookie in [None, Some("made-up-token")] {
        let response = app.refresh(cookie).await;
        assert_eq!(401, response.status().as_u16());
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["code"], "INVALID_REFRESH_TOKEN");
    }
}

// --- Logout Tests ---

#[tokio::test]
async fn logout_revokes_and_clears_the_cookie() {
    let app = spawn_app();
    app.seed_user("alice");
    let (_, cookie) = app.login_as("alice").await;

    let response = app
        .client
        .delete(app.url("/auth/refresh"))
        .header("Cookie", format!("refresh_token={}", cookie))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(204, response.status().as_u16());
    let cleared = refresh_set_cookie(&response).expect("Cookie not cleared");
    assert!(cleared.contains("Max-Age=0"));
    assert!(app.refresh_tokens.snapshot()[0].revoked);

    assert_eq!(401, app.refresh(Some(&cookie)).await.status().as_u16());

    // Logging out again, or without a cookie, still succeeds
    let again = app
        .client
        .delete(app.url("/auth/refresh"))
        .send()
        .await
        .unwrap();
    assert_eq!(204, again.status().as_u16());
}

// --- Protected Route Tests ---

async fn get_user(app: &common::TestApp, authorization: Option<String>) -> reqwest::Response {
    let mut request = app.client.get(app.url("/api/admin/user"));
    if let Some(value) = authorization {
        request = request.header("Authorization", value);
    }
    request.send().await.expect("Failed to execute request")
}

#[tokio::test]
async fn protected_route_returns_current_user() {
    let app = spawn_app();
    let user_id = app.seed_user("alice");
    let (access_token, _) = app.login_as("alice").await;

    let response = get_user(&app, Some(format!("Bearer {}", access_token))).await;
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user_id"], user_id.to_string());
    assert_eq!(body["username"], "alice");
}

#[tokio::test]
async fn protected_route_rejects_missing_token() {
    let app = spawn_app();

    for header in [None, Some("Basic abc".to_string()), Some("Bearer ".to_string())] {
        let response = get_user(&app, header).await;
        assert_eq!(401, response.status().as_u16());
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["code"], "UNAUTHORIZED");
    }
}

#[tokio::test]
async fn protected_route_distinguishes_expired_from_invalid() {
    let app = spawn_app();

    let invalid = get_user(&app, Some("Bearer not.a.jwt".to_string())).await;
    assert_eq!(401, invalid.status().as_u16());
    let body: Value = invalid.json().await.unwrap();
    assert_eq!(body["code"], "TOKEN_INVALID");

    let claims = Claims::new(Uuid::new_v4(), Duration::minutes(-5), "blog_server".to_string());
    let expired_token = app.keys.sign(&claims).unwrap();
    let expired = get_user(&app, Some(format!("Bearer {}", expired_token))).await;
    assert_eq!(401, expired.status().as_u16());
    let body: Value = expired.json().await.unwrap();
    assert_eq!(body["code"], "TOKEN_EXPIRED");
}

#[tokio::test]
async fn refreshed_access_token_opens_protected_routes() {
    let app = spawn_app();
    app.seed_user("alice");
    let (_, cookie) = app.login_as("alice").await;

    let body: Value = app.refresh(Some(&cookie)).await.json().await.unwrap();
    let access_token = body["access_token"].as_str().unwrap();

    let response = get_user(&app, Some(format!("Bearer {}", access_token))).await;
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn sessions_lists_only_the_live_refresh_token() {
    let app = spawn_app();
    app.seed_user("alice");
    app.login_as("alice").await;
    let (access_token, _) = app.login_as("alice").await;

    let response = app
        .client
        .get(app.url("/api/admin/sessions"))
        .header("Authorization", format!("Bearer {}", access_token))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());

    let sessions: Vec<Value> = response.json().await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert!(sessions[0].get("token_hash").is_none());
    assert_eq!(sessions[0]["revoked"], false);
}
