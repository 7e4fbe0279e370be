//! Cache Layer
//!
//! Memoizes aggregator output per `(operation, user, parameters)` key with a
//! per-operation TTL. Lookups share one in-flight computation per key (see
//! [`ResponseCache`]); entries live in a pluggable [`CacheStore`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::product::ProductId;
use crate::domain::profile::UserId;

mod moka_store;
mod single_flight;

pub use moka_store::MokaCacheStore;
pub use single_flight::{CacheStats, ResponseCache};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CacheStoreError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
    #[error("cache entry could not be decoded: {0}")]
    Decode(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
    pub ttl_secs: u64,
}

impl CacheEntry {
    pub fn new(
        key: impl Into<String>,
        payload: Value,
        created_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self { key: key.into(), payload, created_at, ttl_secs: ttl.as_secs() }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        let ttl = i64::try_from(self.ttl_secs).unwrap_or(i64::MAX);
        self.created_at
            .checked_add_signed(chrono::Duration::seconds(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Served only while `now < created_at + ttl`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at()
    }
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheStoreError>;
    async fn put(&self, entry: CacheEntry) -> Result<(), CacheStoreError>;
    async fn remove(&self, key: &str) -> Result<(), CacheStoreError>;
}

/// Key builders for every cached operation.
pub struct CacheKey;

impl CacheKey {
    pub fn homepage(user_id: UserId) -> String {
        format!("homepage:{user_id}")
    }

    pub fn suggestions(user_id: UserId, product_id: ProductId) -> String {
        format!("suggestions:{user_id}:{product_id}")
    }

    /// `filters` is the canonical fragment from `SearchFilters::cache_fragment`.
    pub fn search(user_id: UserId, query: &str, filters: &str) -> String {
        format!("search:{user_id}:{}:{filters}", query.trim().to_lowercase())
    }
}
