//! Recommendation service
//!
//! Homepage feed, product page suggestions and personalized search. Each
//! operation pulls candidates through the [`SignalStore`], scores them with
//! the [`ScoringEngine`], ranks them, and is memoized by the [`ResponseCache`]
//! under its own TTL.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::cache::{CacheKey, ResponseCache};
use crate::domain::product::{Product, ProductId};
use crate::domain::profile::UserId;
use crate::domain::purchase::PurchaseRecord;
use crate::errors::EngineError;
use crate::scoring::{CategoryHistory, ScoredCandidate, ScoringContext, ScoringEngine};
use crate::signals::{ProductFilter, PurchaseQuery, SignalStore};

pub mod homepage;
pub mod search;
mod suggestions;
pub mod trending;

pub use homepage::{DealItem, Homepage};
pub use search::SearchFilters;
pub use trending::{LowStockAlert, TrendingItem, Velocity};

pub const RECOMMENDATION_LIMIT: usize = 8;
pub const DEALS_LIMIT: usize = 6;
pub const TRENDING_LIMIT: usize = 6;
pub const LOW_STOCK_LIMIT: usize = 4;
pub const SUGGESTION_LIMIT: usize = 8;
pub const DEFAULT_SEARCH_LIMIT: usize = 20;
pub const MAX_SEARCH_LIMIT: usize = 100;

pub const TRENDING_WINDOW_DAYS: i64 = 7;
pub const POPULARITY_WINDOW_DAYS: i64 = 90;
pub const LOW_STOCK_LOOKBACK_DAYS: i64 = 90;
pub const LOW_STOCK_QUIET_DAYS: i64 = 15;

/// Per-operation cache lifetimes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheTtls {
    pub homepage: Duration,
    pub product: Duration,
    pub search: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            homepage: Duration::from_secs(15 * 60),
            product: Duration::from_secs(30 * 60),
            search: Duration::from_secs(5 * 60),
        }
    }
}

/// What the engine knows about a buyer at `now`.
#[derive(Clone, Debug)]
pub struct BuyerContext {
    pub scoring: ScoringContext,
    /// The buyer's own purchase lines, empty for unknown users.
    pub purchases: Vec<PurchaseRecord>,
    /// Catalog entries for everything in `purchases`.
    pub purchased: Vec<Product>,
}

impl BuyerContext {
    pub fn is_anonymous(&self) -> bool {
        self.scoring.profile.is_none()
    }
}

/// Uncached computations shared by the service and the assistant.
#[derive(Clone)]
pub struct Recommender {
    signals: Arc<dyn SignalStore>,
    engine: Arc<ScoringEngine>,
}

impl Recommender {
    pub fn new(signals: Arc<dyn SignalStore>, engine: Arc<ScoringEngine>) -> Self {
        Self { signals, engine }
    }

    pub fn signals(&self) -> &dyn SignalStore {
        self.signals.as_ref()
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    pub async fn buyer_context(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<BuyerContext, EngineError> {
        let profile = self.signals.business_profile(user_id).await?;
        let deals = self.signals.active_deals(now).await?;

        let Some(profile) = profile else {
            return Ok(BuyerContext {
                scoring: ScoringContext::anonymous(deals, now),
                purchases: Vec::new(),
                purchased: Vec::new(),
            });
        };

        let purchases = self.signals.purchases(&PurchaseQuery::for_user(user_id)).await?;
        let purchased = self.products_by_id(purchases.iter().map(|p| p.product_id)).await?;
        let history = CategoryHistory::build(&purchases, &purchased);

        Ok(BuyerContext {
            scoring: ScoringContext::new(Some(profile), history, deals, now),
            purchases,
            purchased,
        })
    }

    /// Catalog entries for `ids`, skipping the store call when there are none.
    pub async fn products_by_id(
        &self,
        ids: impl IntoIterator<Item = ProductId>,
    ) -> Result<Vec<Product>, EngineError> {
        let ids: BTreeSet<ProductId> = ids.into_iter().collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.signals.products(&ProductFilter::all().with_ids(ids)).await?)
    }

    pub fn score(&self, products: &[Product], context: &ScoringContext) -> Vec<ScoredCandidate> {
        self.engine.score_candidates(products, context)
    }
}

pub struct RecommendationService {
    recommender: Recommender,
    cache: ResponseCache,
    ttls: CacheTtls,
}

impl RecommendationService {
    pub fn new(
        signals: Arc<dyn SignalStore>,
        engine: ScoringEngine,
        cache: ResponseCache,
        ttls: CacheTtls,
    ) -> Self {
        Self { recommender: Recommender::new(signals, Arc::new(engine)), cache, ttls }
    }

    pub fn recommender(&self) -> &Recommender {
        &self.recommender
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub async fn get_homepage(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Homepage, EngineError> {
        let recommender = self.recommender.clone();
        self.cache
            .get_or_compute(&CacheKey::homepage(user_id), self.ttls.homepage, now, move || {
                async move { recommender.homepage(user_id, now).await }
            })
            .await
    }

    pub async fn get_product_suggestions(
        &self,
        user_id: UserId,
        product_id: ProductId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScoredCandidate>, EngineError> {
        let recommender = self.recommender.clone();
        let key = CacheKey::suggestions(user_id, product_id);
        self.cache
            .get_or_compute(&key, self.ttls.product, now, move || async move {
                recommender.product_suggestions(user_id, product_id, now).await
            })
            .await
    }

    /// Filters are validated before the cache or the signal store is touched.
    pub async fn search(
        &self,
        query_text: &str,
        filters: &SearchFilters,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScoredCandidate>, EngineError> {
        filters.validate()?;

        let recommender = self.recommender.clone();
        let key = CacheKey::search(user_id, query_text, &filters.cache_fragment());
        let query_text = query_text.to_string();
        let filters = filters.clone();
        self.cache
            .get_or_compute(&key, self.ttls.search, now, move || async move {
                recommender.search(&query_text, &filters, user_id, now).await
            })
            .await
    }

    pub async fn invalidate_homepage(&self, user_id: UserId) -> Result<(), EngineError> {
        self.cache.invalidate(&CacheKey::homepage(user_id)).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::{CacheTtls, RecommendationService};
    use crate::cache::{MokaCacheStore, ResponseCache};
    use crate::scoring::ScoringEngine;
    use crate::signals::sample::{self, KAJU_KATLI, SHARMA_KIRANA};
    use crate::signals::InMemorySignalStore;

    fn service() -> (Arc<InMemorySignalStore>, RecommendationService) {
        let store = Arc::new(InMemorySignalStore::from_snapshot(sample::snapshot()));
        let cache = ResponseCache::new(Arc::new(MokaCacheStore::new(64)));
        let service = RecommendationService::new(
            store.clone(),
            ScoringEngine::default(),
            cache,
            CacheTtls::default(),
        );
        (store, service)
    }

    #[tokio::test]
    async fn homepage_is_cached_for_its_ttl() {
        let (store, service) = service();
        let now = sample::reference_time();

        let first = service.get_homepage(SHARMA_KIRANA, now).await.expect("homepage");
        let reads = store.read_count();

        let cached = service
            .get_homepage(SHARMA_KIRANA, now + Duration::minutes(14))
            .await
            .expect("cached homepage");
        assert_eq!(cached, first);
        assert_eq!(store.read_count(), reads);

        let refreshed = service
            .get_homepage(SHARMA_KIRANA, now + Duration::minutes(15))
            .await
            .expect("refreshed homepage");
        assert!(store.read_count() > reads);
        assert_eq!(refreshed.generated_at, now + Duration::minutes(15));
    }

    #[tokio::test]
    async fn invalidation_drops_the_cached_homepage() {
        let (store, service) = service();
        let now = sample::reference_time();

        service.get_homepage(SHARMA_KIRANA, now).await.expect("homepage");
        let reads = store.read_count();
        service.invalidate_homepage(SHARMA_KIRANA).await.expect("invalidate");
        service.get_homepage(SHARMA_KIRANA, now).await.expect("recomputed");

        assert!(store.read_count() > reads);
    }

    #[tokio::test]
    async fn product_suggestions_use_the_product_ttl() {
        let (store, service) = service();
        let now = sample::reference_time();

        service.get_product_suggestions(SHARMA_KIRANA, KAJU_KATLI, now).await.expect("first");
        let reads = store.read_count();
        service
            .get_product_suggestions(SHARMA_KIRANA, KAJU_KATLI, now + Duration::minutes(29))
            .await
            .expect("cached");

        assert_eq!(store.read_count(), reads);
    }
}
