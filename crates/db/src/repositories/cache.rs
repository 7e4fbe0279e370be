use chrono::{DateTime, Utc};
use tracing::info;

use dukaan_core::cache::{CacheEntry, CacheStore, CacheStoreError};

use super::{column, parse_timestamp, timestamp, RepositoryError};
use crate::DbPool;

/// Cache entries in the shared `response_cache` table, so several engine
/// instances pointed at one database reuse each other's results. Freshness
/// is decided by the caller; rows past `expires_at` are only garbage.
pub struct SqlCacheStore {
    pool: DbPool,
}

impl SqlCacheStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Deletes rows that expired at or before `now`, returning how many.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM response_cache WHERE expires_at <= ?")
            .bind(timestamp(now))
            .execute(&self.pool)
            .await?;
        let purged = result.rows_affected();
        info!(event_name = "cache.sql.purged", purged, "expired cache rows removed");
        Ok(purged)
    }

    async fn fetch(&self, key: &str) -> Result<Option<CacheEntry>, RepositoryError> {
        let row = sqlx::query(
            "SELECT cache_key, payload_json, created_at, ttl_secs
             FROM response_cache WHERE cache_key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let payload_json: String = column(&row, "payload_json")?;
        let created_at: String = column(&row, "created_at")?;
        let ttl_secs: i64 = column(&row, "ttl_secs")?;

        Ok(Some(CacheEntry {
            key: column(&row, "cache_key")?,
            payload: serde_json::from_str(&payload_json)
                .map_err(|e| RepositoryError::Decode(format!("payload_json: {e}")))?,
            created_at: parse_timestamp(&created_at, "created_at")?,
            ttl_secs: u64::try_from(ttl_secs)
                .map_err(|_| RepositoryError::Decode(format!("ttl_secs `{ttl_secs}`")))?,
        }))
    }

    async fn upsert(&self, entry: &CacheEntry) -> Result<(), RepositoryError> {
        let payload_json = serde_json::to_string(&entry.payload)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let ttl_secs = i64::try_from(entry.ttl_secs).unwrap_or(i64::MAX);

        sqlx::query(
            "INSERT INTO response_cache (cache_key, payload_json, created_at, ttl_secs, expires_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(cache_key) DO UPDATE SET
                 payload_json = excluded.payload_json,
                 created_at = excluded.created_at,
                 ttl_secs = excluded.ttl_secs,
                 expires_at = excluded.expires_at",
        )
        .bind(&entry.key)
        .bind(payload_json)
        .bind(timestamp(entry.created_at))
        .bind(ttl_secs)
        .bind(timestamp(entry.expires_at()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl CacheStore for SqlCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheStoreError> {
        Ok(self.fetch(key).await?)
    }

    async fn put(&self, entry: CacheEntry) -> Result<(), CacheStoreError> {
        Ok(self.upsert(&entry).await?)
    }

    async fn remove(&self, key: &str) -> Result<(), CacheStoreError> {
        sqlx::query("DELETE FROM response_cache WHERE cache_key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from)?;
        Ok(())
    }
}
