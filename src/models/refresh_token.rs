use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Persisted half of a refresh token. The plaintext secret is never stored:
/// `lookup_hash` is a deterministic digest used to find the row, and
/// `token_hash` is the slow hash the presented secret is verified against.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(skip)]
    pub lookup_hash: String,
    #[serde(skip)]
    pub token_hash: String,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTokenState {
    Active,
    /// Terminal: used once, superseded by a newer login, or logged out
    Revoked,
    /// Terminal: `expires_at` has passed
    Expired,
}

/// Where a login came from, recorded on the new refresh token
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl RefreshTokenRecord {
    pub fn new(
        user_id: Uuid,
        lookup_hash: String,
        token_hash: String,
        client: ClientInfo,
        lifetime: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            lookup_hash,
            token_hash,
            user_agent: client.user_agent,
            ip_address: client.ip_address,
            expires_at: now + lifetime,
            revoked: false,
            created_at: now,
        }
    }

    /// Revocation wins over expiry.
    pub fn state_at(&self, now: DateTime<Utc>) -> RefreshTokenState {
        if self.revoked {
            RefreshTokenState::Revoked
        } else if self.expires_at <= now {
            RefreshTokenState::Expired
        } else {
            RefreshTokenState::Active
        }
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.state_at(now) == RefreshTokenState::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(lifetime: Duration) -> RefreshTokenRecord {
        RefreshTokenRecord::new(
            Uuid::new_v4(),
            "lookup".to_string(),
            "hash".to_string(),
            ClientInfo::default(),
            lifetime,
        )
    }

    #[test]
    fn test_new_record_is_active() {
        let record = record(Duration::days(7));
        assert_eq!(record.state_at(Utc::now()), RefreshTokenState::Active);
        assert!(!record.revoked);
    }

    #[test]
    fn test_record_past_expiry_is_expired() {
        let record = record(Duration::seconds(-1));
        assert_eq!(record.state_at(Utc::now()), RefreshTokenState::Expired);
    }

    #[test]
    fn test_revoked_takes_precedence_over_expiry() {
        let mut record = record(Duration::seconds(-1));
        record.revoked = true;
        assert_eq!(record.state_at(Utc::now()), RefreshTokenState::Revoked);
        assert!(!record.is_active_at(Utc::now()));
    }

    #[test]
    fn test_hashes_are_not_serialized() {
        let json = serde_json::to_value(record(Duration::days(1))).unwrap();
        assert!(json.get("lookup_hash").is_none());
        assert!(json.get("token_hash").is_none());
        assert!(json.get("user_agent").is_some());
    }
}
