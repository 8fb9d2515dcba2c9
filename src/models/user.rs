use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A stored account. The `id` is the identity carried by access tokens
/// and refresh token records.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub nickname: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}
