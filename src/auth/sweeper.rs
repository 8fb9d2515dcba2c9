use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::auth::service::AuthService;

/// Periodically delete expired and revoked refresh tokens.
///
/// Returns `None` without spawning anything when `interval` is `None`.
/// The first sweep runs one full interval after startup.
pub fn spawn_refresh_token_sweeper(
    auth: Arc<AuthService>,
    interval: Option<Duration>,
) -> Option<JoinHandle<()>> {
    let period = interval?;
    tracing::info!(interval_secs = period.as_secs(), "Starting refresh token sweeper");

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        loop {
            ticker.tick().await;
            match auth.sweep().await {
                Ok(deleted) => tracing::info!(deleted, "Swept refresh tokens"),
                Err(e) => tracing::error!(error = %e, "Refresh token sweep failed"),
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{JwtKeys, TokenPolicy};
    use crate::models::ClientInfo;
    use crate::store::{InMemoryRefreshTokenStore, InMemoryUserStore};

    #[tokio::test]
    async fn test_disabled_sweeper_spawns_nothing() {
        let users = Arc::new(InMemoryUserStore::default());
        let tokens = Arc::new(InMemoryRefreshTokenStore::default());
        let keys = Arc::new(JwtKeys::new(b"secret", "test", chrono::Duration::minutes(15)).unwrap());
        let policy = TokenPolicy {
            refresh_token_lifetime: chrono::Duration::days(1),
            refresh_token_bytes: 32,
            hash_cost: 4,
        };
        let auth = Arc::new(AuthService::new(users, tokens, keys, policy));

        assert!(spawn_refresh_token_sweeper(auth, None).is_none());
    }

    #[tokio::test]
    async fn test_sweeper_removes_revoked_tokens() {
        let users = Arc::new(InMemoryUserStore::default());
        users.add_user("alice", "pw", 4).unwrap();
        let tokens = Arc::new(InMemoryRefreshTokenStore::default());
        let keys = Arc::new(JwtKeys::new(b"secret", "test", chrono::Duration::minutes(15)).unwrap());
        let policy = TokenPolicy {
            refresh_token_lifetime: chrono::Duration::days(1),
            refresh_token_bytes: 32,
            hash_cost: 4,
        };
        let auth = Arc::new(AuthService::new(users, tokens.clone(), keys, policy));
        let issued = auth.login("alice", "pw", ClientInfo::default()).await.unwrap();
        auth.logout(&issued.refresh_token).await.unwrap();

        let handle =
            spawn_refresh_token_sweeper(auth, Some(Duration::from_millis(20))).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.abort();

        assert!(tokens.snapshot().is_empty());
    }
}
