/// Shared application state
///
/// Everything a handler needs, built once at startup and cloned into each
/// actix worker. Stores are trait objects so the same server runs against
/// Postgres or the in-memory stores.

use sqlx::PgPool;
use std::sync::Arc;

use crate::auth::{AuthService, JwtKeys, TokenPolicy};
use crate::configuration::JwtSettings;
use crate::store::{
    CategoryStore, PgCategoryStore, PgPostStore, PgRefreshTokenStore, PgUserStore, PostStore,
    RefreshTokenStore, UserStore,
};

/// Attributes of the refresh token cookie
#[derive(Debug, Clone)]
pub struct RefreshCookieSettings {
    /// Scope of the cookie; must cover the refresh endpoint
    pub path: String,
    pub max_age_seconds: i64,
}

impl RefreshCookieSettings {
    pub fn from_settings(config: &JwtSettings) -> Self {
        Self {
            path: config.refresh_cookie_path.clone(),
            max_age_seconds: config.refresh_token_expiry,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub keys: Arc<JwtKeys>,
    pub users: Arc<dyn UserStore>,
    pub posts: Arc<dyn PostStore>,
    pub categories: Arc<dyn CategoryStore>,
    pub refresh_cookie: RefreshCookieSettings,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        posts: Arc<dyn PostStore>,
        categories: Arc<dyn CategoryStore>,
        keys: Arc<JwtKeys>,
        config: &JwtSettings,
    ) -> Self {
        let auth = Arc::new(AuthService::new(
            users.clone(),
            refresh_tokens,
            keys.clone(),
            TokenPolicy::from_settings(config),
        ));
        Self {
            auth,
            keys,
            users,
            posts,
            categories,
            refresh_cookie: RefreshCookieSettings::from_settings(config),
        }
    }

    /// State backed by the Postgres stores sharing one pool.
    pub fn postgres(pool: PgPool, keys: Arc<JwtKeys>, config: &JwtSettings) -> Self {
        Self::new(
            Arc::new(PgUserStore::new(pool.clone())),
            Arc::new(PgRefreshTokenStore::new(pool.clone())),
            Arc::new(PgPostStore::new(pool.clone())),
            Arc::new(PgCategoryStore::new(pool)),
            keys,
            config,
        )
    }
}
