/// Token lifecycle coordination
///
/// `AuthService` ties the credential check, the access token issuer and the
/// refresh token store together:
/// - login verifies credentials, issues an access token and a fresh refresh
///   token, and revokes every refresh token the user held before
/// - refresh exchanges a live refresh token for a new access token; the
///   refresh token is single use and revoked once the access token exists
/// - logout revokes the presented refresh token

use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::jwt::JwtKeys;
use crate::auth::password::verify_credentials;
use crate::auth::refresh_token::{
    generate_refresh_token, hash_refresh_token, lookup_hash, verify_refresh_token,
};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};
use crate::models::{ClientInfo, RefreshTokenRecord, RefreshTokenState};
use crate::store::{RefreshTokenStore, UserStore};

/// Refresh token parameters
#[derive(Debug, Clone, Copy)]
pub struct TokenPolicy {
    pub refresh_token_lifetime: Duration,
    pub refresh_token_bytes: usize,
    pub hash_cost: u32,
}

impl TokenPolicy {
    pub fn from_settings(config: &JwtSettings) -> Self {
        Self {
            refresh_token_lifetime: config.refresh_token_lifetime(),
            refresh_token_bytes: config.refresh_token_bytes,
            hash_cost: config.hash_cost,
        }
    }
}

/// Result of a successful login. The refresh token is the only copy of the
/// plaintext secret and goes straight into the response cookie.
#[derive(Debug)]
pub struct IssuedTokens {
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    keys: Arc<JwtKeys>,
    policy: TokenPolicy,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        keys: Arc<JwtKeys>,
        policy: TokenPolicy,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            keys,
            policy,
        }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    /// Authenticate and start a new session.
    ///
    /// Nothing is written when the credentials are wrong. Revoking the
    /// user's previous refresh tokens is best effort; persisting the new
    /// one is not.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        client: ClientInfo,
    ) -> Result<IssuedTokens, AppError> {
        let user = verify_credentials(self.users.as_ref(), username, password).await?;
        let access_token = self.keys.issue_access_token(user.id)?;

        let refresh_token = generate_refresh_token(self.policy.refresh_token_bytes)?;
        let secret = refresh_token.clone();
        let cost = self.policy.hash_cost;
        let hashed =
            tokio::task::spawn_blocking(move || hash_refresh_token(&secret, cost)).await??;

        match self.refresh_tokens.revoke_all_for_user(user.id).await {
            Ok(0) => {}
            Ok(revoked) => {
                tracing::debug!(user_id = %user.id, revoked, "Revoked previous refresh tokens")
            }
            Err(e) => tracing::warn!(
                user_id = %user.id,
                error = %e,
                "Failed to revoke previous refresh tokens; continuing login"
            ),
        }

        let record = RefreshTokenRecord::new(
            user.id,
            hashed.lookup_hash,
            hashed.token_hash,
            client,
            self.policy.refresh_token_lifetime,
        );
        self.refresh_tokens.create(&record).await?;

        tracing::info!(user_id = %user.id, token_id = %record.id, "User logged in");

        Ok(IssuedTokens {
            user_id: user.id,
            access_token,
            refresh_token,
        })
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// Unknown, mismatching, revoked and expired tokens all fail with
    /// `AuthError::InvalidRefreshToken`. The token is revoked only after the
    /// access token has been signed, and only the caller whose revoke flips
    /// the record gets that access token. A failed revoke is logged and the
    /// token still returned.
    pub async fn refresh(&self, presented: &str) -> Result<String, AppError> {
        let record = self.find_verified(presented).await?.ok_or_else(|| {
            tracing::warn!("Refresh token not recognised");
            AuthError::InvalidRefreshToken
        })?;

        match record.state_at(Utc::now()) {
            RefreshTokenState::Active => {}
            state => {
                tracing::warn!(token_id = %record.id, ?state, "Refresh token no longer usable");
                return Err(AuthError::InvalidRefreshToken.into());
            }
        }

        let access_token = self.keys.issue_access_token(record.user_id)?;

        match self.refresh_tokens.revoke(record.id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(token_id = %record.id, "Refresh token already used concurrently");
                return Err(AuthError::InvalidRefreshToken.into());
            }
            Err(e) => tracing::warn!(
                token_id = %record.id,
                error = %e,
                "Failed to revoke used refresh token"
            ),
        }

        tracing::info!(user_id = %record.user_id, token_id = %record.id, "Access token refreshed");
        Ok(access_token)
    }

    /// Revoke the presented refresh token. Unknown tokens are ignored so
    /// logging out twice is harmless.
    pub async fn logout(&self, presented: &str) -> Result<(), AppError> {
        if let Some(record) = self.find_verified(presented).await? {
            self.refresh_tokens.revoke(record.id).await?;
            tracing::info!(user_id = %record.user_id, token_id = %record.id, "User logged out");
        }
        Ok(())
    }

    /// Active refresh tokens belonging to `user_id`, newest first.
    pub async fn active_sessions(&self, user_id: Uuid) -> Result<Vec<RefreshTokenRecord>, AppError> {
        let sessions = self
            .refresh_tokens
            .find_all_valid(Utc::now())
            .await?
            .into_iter()
            .filter(|record| record.user_id == user_id)
            .collect();
        Ok(sessions)
    }

    /// Delete expired and revoked refresh tokens; returns how many went.
    pub async fn sweep(&self) -> Result<u64, AppError> {
        self.refresh_tokens
            .delete_expired_or_revoked(Utc::now())
            .await
    }

    async fn find_verified(&self, presented: &str) -> Result<Option<RefreshTokenRecord>, AppError> {
        let record = match self.refresh_tokens.find_by_hash(&lookup_hash(presented)).await? {
            Some(record) => record,
            None => return Ok(None),
        };

        let secret = presented.to_owned();
        let token_hash = record.token_hash.clone();
        let matches =
            tokio::task::spawn_blocking(move || verify_refresh_token(&secret, &token_hash))
                .await?;

        Ok(matches.then_some(record))
    }
}
