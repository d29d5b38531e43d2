/// Revoked token store
///
/// Logging out revokes the token's `jti` until the token would have expired
/// anyway. Every authenticated request and every refresh consults the store.
///
/// Three implementations share the [`RevocationStore`] trait:
///
/// - [`PgRevocationStore`]: the `revoked_tokens` table (default)
/// - [`RedisRevocationStore`]: `revoked:{jti}` keys with a TTL, used when `REDIS_URL` is set
/// - [`MemoryRevocationStore`]: process-local map for tests
///
/// # Example
///
/// ```
/// use clubhouse_shared::auth::revocation::{MemoryRevocationStore, RevocationStore};
/// use chrono::{Duration, Utc};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryRevocationStore::new();
/// let jti = Uuid::new_v4();
///
/// store.revoke(jti, Utc::now() + Duration::hours(1)).await?;
/// assert!(store.is_revoked(jti).await?);
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::redis::RedisClient;

/// Error type for revocation store operations
#[derive(Debug, thiserror::Error)]
pub enum RevocationError {
    #[error("Revocation store database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Revocation store redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Marks a token id revoked until `expires_at`
    async fn revoke(&self, jti: Uuid, expires_at: DateTime<Utc>) -> Result<(), RevocationError>;

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, RevocationError>;

    /// Drops entries whose token has expired, returning how many were removed
    ///
    /// The Postgres and in-memory stores also purge on every `revoke`.
    async fn purge_expired(&self) -> Result<u64, RevocationError>;
}

/// Postgres-backed store over `revoked_tokens`
#[derive(Debug, Clone)]
pub struct PgRevocationStore {
    pool: PgPool,
}

impl PgRevocationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevocationStore for PgRevocationStore {
    async fn revoke(&self, jti: Uuid, expires_at: DateTime<Utc>) -> Result<(), RevocationError> {
        let purged = self.purge_expired().await?;
        if purged > 0 {
            tracing::debug!(purged, "Purged expired token revocations");
        }

        sqlx::query(
            "INSERT INTO revoked_tokens (jti, expires_at) VALUES ($1, $2) ON CONFLICT (jti) DO NOTHING",
        )
        .bind(jti)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        tracing::debug!(%jti, %expires_at, "Token revoked");
        Ok(())
    }

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, RevocationError> {
        let revoked: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM revoked_tokens WHERE jti = $1 AND expires_at > NOW())",
        )
        .bind(jti)
        .fetch_one(&self.pool)
        .await?;

        Ok(revoked)
    }

    async fn purge_expired(&self) -> Result<u64, RevocationError> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/// Redis-backed store; entries expire on their own
#[derive(Debug, Clone)]
pub struct RedisRevocationStore {
    client: RedisClient,
}

impl RedisRevocationStore {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    fn key(jti: Uuid) -> String {
        format!("revoked:{}", jti)
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn revoke(&self, jti: Uuid, expires_at: DateTime<Utc>) -> Result<(), RevocationError> {
        let ttl = (expires_at - Utc::now()).num_seconds();
        if ttl <= 0 {
            return Ok(());
        }

        let mut conn = self.client.get_connection();
        redis::cmd("SET")
            .arg(Self::key(jti))
            .arg(1)
            .arg("EX")
            .arg(ttl)
            .query_async::<_, ()>(&mut conn)
            .await?;

        tracing::debug!(%jti, ttl, "Token revoked");
        Ok(())
    }

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, RevocationError> {
        let mut conn = self.client.get_connection();
        let exists: bool = redis::cmd("EXISTS")
            .arg(Self::key(jti))
            .query_async(&mut conn)
            .await?;

        Ok(exists)
    }

    async fn purge_expired(&self) -> Result<u64, RevocationError> {
        Ok(0)
    }
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryRevocationStore {
    entries: RwLock<HashMap<Uuid, DateTime<Utc>>>,
}

impl MemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn revoke(&self, jti: Uuid, expires_at: DateTime<Utc>) -> Result<(), RevocationError> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, until| *until > now);
        entries.insert(jti, expires_at);
        Ok(())
    }

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, RevocationError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&jti)
            .is_some_and(|expires_at| *expires_at > Utc::now()))
    }

    async fn purge_expired(&self) -> Result<u64, RevocationError> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at > now);
        Ok((before - entries.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_memory_store_revokes() {
        let store = MemoryRevocationStore::new();
        let jti = Uuid::new_v4();

        assert!(!store.is_revoked(jti).await.unwrap());
        store.revoke(jti, Utc::now() + Duration::hours(1)).await.unwrap();
        assert!(store.is_revoked(jti).await.unwrap());
        assert!(!store.is_revoked(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_store_revoke_is_idempotent() {
        let store = MemoryRevocationStore::new();
        let jti = Uuid::new_v4();
        let expires_at = Utc::now() + Duration::minutes(5);

        store.revoke(jti, expires_at).await.unwrap();
        store.revoke(jti, expires_at).await.unwrap();
        assert!(store.is_revoked(jti).await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_store_purges_expired() {
        let store = MemoryRevocationStore::new();
        let expired = Uuid::new_v4();
        let live = Uuid::new_v4();

        store.revoke(live, Utc::now() + Duration::hours(1)).await.unwrap();
        store.revoke(expired, Utc::now() - Duration::seconds(1)).await.unwrap();

        // an expired entry no longer counts as revoked even before purging
        assert!(!store.is_revoked(expired).await.unwrap());

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert!(store.is_revoked(live).await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_store_revoke_drops_expired_entries() {
        let store = MemoryRevocationStore::new();
        let live = Uuid::new_v4();

        for _ in 0..3 {
            store
                .revoke(Uuid::new_v4(), Utc::now() - Duration::seconds(1))
                .await
                .unwrap();
        }
        store.revoke(live, Utc::now() + Duration::hours(1)).await.unwrap();

        let entries = store.entries.read().await;
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key(&live));
    }

    #[test]
    fn test_redis_key_format() {
        let jti = Uuid::nil();
        assert_eq!(
            RedisRevocationStore::key(jti),
            "revoked:00000000-0000-0000-0000-000000000000"
        );
    }

    #[tokio::test]
    async fn test_trait_object() {
        let store: Box<dyn RevocationStore> = Box::new(MemoryRevocationStore::new());
        let jti = Uuid::new_v4();
        store.revoke(jti, Utc::now() + Duration::hours(1)).await.unwrap();
        assert!(store.is_revoked(jti).await.unwrap());
    }
}
