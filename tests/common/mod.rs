//! Shared harness: the real actix server on a random port, backed by the
//! in-memory stores.

#![allow(dead_code)]

use reqwest::header::SET_COOKIE;
use std::net::TcpListener;
use std::sync::Arc;

use blog_server::auth::JwtKeys;
use blog_server::configuration::JwtSettings;
use blog_server::startup::run;
use blog_server::state::AppState;
use blog_server::store::{
    InMemoryCategoryStore, InMemoryPostStore, InMemoryRefreshTokenStore, InMemoryUserStore,
};

pub const TEST_COST: u32 = 4;
pub const PASSWORD: &str = "correct-horse-battery";

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub keys: Arc<JwtKeys>,
    pub users: Arc<InMemoryUserStore>,
    pub refresh_tokens: Arc<InMemoryRefreshTokenStore>,
    pub categories: Arc<InMemoryCategoryStore>,
}

pub fn jwt_settings() -> JwtSettings {
    JwtSettings {
        secret: Some("integration-test-secret".to_string()),
        issuer: "blog_server".to_string(),
        access_token_expiry: 900,
        refresh_token_expiry: 604_800,
        refresh_token_bytes: 32,
        hash_cost: TEST_COST,
        refresh_cookie_path: "/auth/refresh".to_string(),
    }
}

pub fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let settings = jwt_settings();
    let keys = Arc::new(JwtKeys::from_settings(&settings).expect("Failed to build keys"));
    let users = Arc::new(InMemoryUserStore::default());
    let refresh_tokens = Arc::new(InMemoryRefreshTokenStore::default());
    let categories = Arc::new(InMemoryCategoryStore::default());
    let state = AppState::new(
        users.clone(),
        refresh_tokens.clone(),
        Arc::new(InMemoryPostStore::default()),
        categories.clone(),
        keys.clone(),
        &settings,
    );

    let server = run(listener, state).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
        keys,
        users,
        refresh_tokens,
        categories,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn login(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/login"))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub fn seed_user(&self, username: &str) -> uuid::Uuid {
        self.users
            .add_user(username, PASSWORD, TEST_COST)
            .expect("Failed to seed user")
            .id
    }

    /// Log an already seeded user in, returning (access token, refresh cookie value).
    pub async fn login_as(&self, username: &str) -> (String, String) {
        let response = self.login(username, PASSWORD).await;
        assert_eq!(response.status().as_u16(), 200);
        let cookie = refresh_cookie_value(&response).expect("No refresh cookie");
        let body: serde_json::Value = response.json().await.unwrap();
        (body["access_token"].as_str().unwrap().to_string(), cookie)
    }

    pub async fn refresh(&self, cookie: Option<&str>) -> reqwest::Response {
        let mut request = self.client.post(self.url("/auth/refresh"));
        if let Some(value) = cookie {
            request = request.header("Cookie", format!("refresh_token={}", value));
        }
        request.send().await.expect("Failed to execute request")
    }
}

/// The raw `Set-Cookie` header for the refresh token, if any.
pub fn refresh_set_cookie(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("refresh_token="))
        .map(str::to_string)
}

pub fn refresh_cookie_value(response: &reqwest::Response) -> Option<String> {
    let header = refresh_set_cookie(response)?;
    let pair = header.split(';').next()?;
    pair.strip_prefix("refresh_token=").map(str::to_string)
}
