use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;

use super::{CacheEntry, CacheStore, CacheStoreError};

/// In-process store backed by `moka`.
///
/// Capacity is bounded and each entry is evicted once its own TTL elapses.
/// Freshness is still decided by [`CacheEntry::is_fresh`] on lookup; the
/// moka expiry only bounds memory.
#[derive(Clone)]
pub struct MokaCacheStore {
    cache: Cache<String, CacheEntry>,
}

struct EntryTtl;

impl Expiry<String, CacheEntry> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(Duration::from_secs(value.ttl_secs))
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(Duration::from_secs(value.ttl_secs))
    }
}

impl MokaCacheStore {
    pub fn new(max_capacity: u64) -> Self {
        let cache = Cache::builder().max_capacity(max_capacity).expire_after(EntryTtl).build();
        Self { cache }
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[async_trait]
impl CacheStore for MokaCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheStoreError> {
        Ok(self.cache.get(key).await)
    }

    async fn put(&self, entry: CacheEntry) -> Result<(), CacheStoreError> {
        self.cache.insert(entry.key.clone(), entry).await;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheStoreError> {
        self.cache.invalidate(key).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use serde_json::json;

    use super::MokaCacheStore;
    use crate::cache::{CacheEntry, CacheStore};

    #[tokio::test]
    async fn stores_and_removes_entries() {
        let store = MokaCacheStore::new(16);
        let entry =
            CacheEntry::new("search:1:rice:", json!([1, 2]), Utc::now(), Duration::from_secs(300));

        store.put(entry.clone()).await.expect("put");
        assert_eq!(store.get("search:1:rice:").await.expect("get"), Some(entry));

        store.remove("search:1:rice:").await.expect("remove");
        assert_eq!(store.get("search:1:rice:").await.expect("get"), None);
    }
}
