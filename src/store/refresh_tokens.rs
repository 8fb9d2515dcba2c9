use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use super::lock;
use crate::error::AppError;
use crate::models::RefreshTokenRecord;

/// Refresh token records. Every call is a single persistence operation;
/// nothing is cached in process. Revocation only ever flips `revoked`
/// from false to true, so concurrent writers cannot un-revoke a record.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn create(&self, record: &RefreshTokenRecord) -> Result<(), AppError>;

    /// Look a record up by its deterministic lookup hash.
    async fn find_by_hash(&self, lookup_hash: &str)
        -> Result<Option<RefreshTokenRecord>, AppError>;

    /// Returns true only for the call that flipped the record from live to
    /// revoked; a revoked or missing record yields false.
    async fn revoke(&self, id: Uuid) -> Result<bool, AppError>;

    /// Returns the number of records newly revoked.
    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, AppError>;

    /// Non-revoked records whose expiry is after `now`.
    async fn find_all_valid(&self, now: DateTime<Utc>)
        -> Result<Vec<RefreshTokenRecord>, AppError>;

    /// Returns the number of records deleted.
    async fn delete_expired_or_revoked(&self, now: DateTime<Utc>) -> Result<u64, AppError>;
}

pub struct PgRefreshTokenStore {
    pool: PgPool,
}

impl PgRefreshTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn create(&self, record: &RefreshTokenRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens
                (id, user_id, lookup_hash, token_hash, user_agent, ip_address,
                 expires_at, revoked, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(&record.lookup_hash)
        .bind(&record.token_hash)
        .bind(&record.user_agent)
        .bind(&record.ip_address)
        .bind(record.expires_at)
        .bind(record.revoked)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_hash(
        &self,
        lookup_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT id, user_id, lookup_hash, token_hash, user_agent, ip_address,
                   expires_at, revoked, created_at
            FROM refresh_tokens
            WHERE lookup_hash = $1
            "#,
        )
        .bind(lookup_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn revoke(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = true WHERE id = $1 AND revoked = false",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = true WHERE user_id = $1 AND revoked = false",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn find_all_valid(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<RefreshTokenRecord>, AppError> {
        let records = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT id, user_id, lookup_hash, token_hash, user_agent, ip_address,
                   expires_at, revoked, created_at
            FROM refresh_tokens
            WHERE revoked = false AND expires_at > $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn delete_expired_or_revoked(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= $1 OR revoked = true")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[derive(Default)]
pub struct InMemoryRefreshTokenStore {
    records: Mutex<HashMap<Uuid, RefreshTokenRecord>>,
}

impl InMemoryRefreshTokenStore {
    /// Copy of every stored record, oldest first.
    pub fn snapshot(&self) -> Vec<RefreshTokenRecord> {
        let mut records: Vec<_> = lock(&self.records).values().cloned().collect();
        records.sort_by_key(|record| record.created_at);
        records
    }

    pub fn get(&self, id: Uuid) -> Option<RefreshTokenRecord> {
        lock(&self.records).get(&id).cloned()
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn create(&self, record: &RefreshTokenRecord) -> Result<(), AppError> {
        lock(&self.records).insert(record.id, record.clone());
        Ok(())
    }

    async fn find_by_hash(
        &self,
        lookup_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        Ok(lock(&self.records)
            .values()
            .find(|record| record.lookup_hash == lookup_hash)
            .cloned())
    }

    async fn revoke(&self, id: Uuid) -> Result<bool, AppError> {
        match lock(&self.records).get_mut(&id) {
            Some(record) if !record.revoked => {
                record.revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        let mut revoked = 0;
        for record in lock(&self.records).values_mut() {
            if record.user_id == user_id && !record.revoked {
                record.revoked = true;
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn find_all_valid(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<RefreshTokenRecord>, AppError> {
        let mut records: Vec<_> = lock(&self.records)
            .values()
            .filter(|record| record.is_active_at(now))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn delete_expired_or_revoked(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let mut records = lock(&self.records);
        let before = records.len();
        records.retain(|_, record| record.is_active_at(now));
        Ok((before - records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClientInfo;
    use chrono::Duration;

    fn record(user_id: Uuid, lookup: &str, lifetime: Duration) -> RefreshTokenRecord {
        RefreshTokenRecord::new(
            user_id,
            lookup.to_string(),
            "hash".to_string(),
            ClientInfo::default(),
            lifetime,
        )
    }

    #[tokio::test]
    async fn test_find_by_hash() {
        let store = InMemoryRefreshTokenStore::default();
        let stored = record(Uuid::new_v4(), "abc", Duration::days(1));
        store.create(&stored).await.unwrap();

        let found = store.find_by_hash("abc").await.unwrap().expect("record missing");
        assert_eq!(found.id, stored.id);
        assert!(store.find_by_hash("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revoke_reports_only_the_first_flip() {
        let store = InMemoryRefreshTokenStore::default();
        let stored = record(Uuid::new_v4(), "abc", Duration::days(1));
        store.create(&stored).await.unwrap();

        assert!(store.revoke(stored.id).await.unwrap());
        assert!(!store.revoke(stored.id).await.unwrap());
        assert!(!store.revoke(Uuid::new_v4()).await.unwrap());

        assert!(store.get(stored.id).unwrap().revoked);
    }

    #[tokio::test]
    async fn test_revoke_all_only_touches_that_user() {
        let store = InMemoryRefreshTokenStore::default();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        store.create(&record(alice, "a1", Duration::days(1))).await.unwrap();
        store.create(&record(alice, "a2", Duration::days(1))).await.unwrap();
        let bobs = record(bob, "b1", Duration::days(1));
        store.create(&bobs).await.unwrap();

        assert_eq!(store.revoke_all_for_user(alice).await.unwrap(), 2);
        assert_eq!(store.revoke_all_for_user(alice).await.unwrap(), 0);
        assert!(!store.get(bobs.id).unwrap().revoked);
    }

    #[tokio::test]
    async fn test_valid_and_sweep_partition_records() {
        let store = InMemoryRefreshTokenStore::default();
        let user = Uuid::new_v4();
        let live = record(user, "live", Duration::days(1));
        let expired = record(user, "expired", Duration::seconds(-10));
        let revoked = record(user, "revoked", Duration::days(1));
        for r in [&live, &expired, &revoked] {
            store.create(r).await.unwrap();
        }
        store.revoke(revoked.id).await.unwrap();

        let valid = store.find_all_valid(Utc::now()).await.unwrap();
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].id, live.id);

        assert_eq!(store.delete_expired_or_revoked(Utc::now()).await.unwrap(), 2);
        assert_eq!(store.snapshot().len(), 1);
    }
}
