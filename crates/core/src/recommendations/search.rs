use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::profile::UserId;
use crate::errors::EngineError;
use crate::ranking::{by_product_id, rank};
use crate::scoring::ScoredCandidate;
use crate::signals::ProductFilter;

use super::{Recommender, DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub limit: Option<usize>,
}

impl SearchFilters {
    pub fn validate(&self) -> Result<(), EngineError> {
        for (field, price) in [("min_price", self.min_price), ("max_price", self.max_price)] {
            if price.is_some_and(|price| price.is_sign_negative()) {
                return Err(EngineError::InvalidQuery(format!("{field} must not be negative")));
            }
        }
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(EngineError::InvalidQuery(format!(
                    "min_price {min} is greater than max_price {max}"
                )));
            }
        }
        if let Some(limit) = self.limit {
            if limit == 0 || limit > MAX_SEARCH_LIMIT {
                return Err(EngineError::InvalidQuery(format!(
                    "limit must be between 1 and {MAX_SEARCH_LIMIT}, got {limit}"
                )));
            }
        }
        if self.category.as_deref().is_some_and(|category| category.trim().is_empty()) {
            return Err(EngineError::InvalidQuery("category must not be blank".to_string()));
        }
        Ok(())
    }

    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_SEARCH_LIMIT)
    }

    /// Canonical form used in cache keys; equal filters yield equal fragments.
    pub fn cache_fragment(&self) -> String {
        let price = |value: Option<Decimal>| {
            value.map(|value| value.normalize().to_string()).unwrap_or_default()
        };
        format!(
            "cat={}|min={}|max={}|limit={}",
            self.category.as_deref().map(|c| c.trim().to_lowercase()).unwrap_or_default(),
            price(self.min_price),
            price(self.max_price),
            self.effective_limit()
        )
    }

    fn product_filter(&self, query_text: &str) -> ProductFilter {
        let mut filter = ProductFilter::all()
            .with_text(query_text)
            .with_price_range(self.min_price, self.max_price)
            .in_stock();
        if let Some(category) = &self.category {
            filter = filter.with_categories([category.trim().to_string()]);
        }
        filter
    }
}

impl Recommender {
    /// Personalized search. Rejects invalid filters before reading any data.
    pub async fn search(
        &self,
        query_text: &str,
        filters: &SearchFilters,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScoredCandidate>, EngineError> {
        filters.validate()?;

        let matches = self.signals.products(&filters.product_filter(query_text)).await?;
        let buyer = self.buyer_context(user_id, now).await?;
        let scored = self.score(&matches, &buyer.scoring);
        let results = rank(scored, filters.effective_limit(), by_product_id);

        info!(
            event_name = "recommendation.search.computed",
            user_id = %user_id,
            query = query_text.trim(),
            matches = matches.len(),
            results = results.len(),
            "search computed"
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use rust_decimal::Decimal;

    use super::SearchFilters;
    use crate::cache::{MokaCacheStore, ResponseCache};
    use crate::domain::profile::UserId;
    use crate::errors::EngineError;
    use crate::recommendations::{CacheTtls, RecommendationService};
    use crate::scoring::ScoringEngine;
    use crate::signals::sample::{self, SHARMA_KIRANA, TOOR_DAL};
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

    fn price_range(min: i64, max: i64) -> SearchFilters {
        SearchFilters {
            min_price: Some(Decimal::new(min, 0)),
            max_price: Some(Decimal::new(max, 0)),
            ..SearchFilters::default()
        }
    }

    #[tokio::test]
    async fn price_bounds_are_respected() {
        let (_, service) = service();
        let results = service
            .search("", &price_range(50, 200), SHARMA_KIRANA, sample::reference_time())
            .await
            .expect("search");

        assert_eq!(results.len(), 3);
        for candidate in &results {
            assert!(candidate.product.price >= Decimal::new(50, 0));
            assert!(candidate.product.price <= Decimal::new(200, 0));
            assert!(candidate.product.is_available());
        }
    }

    #[tokio::test]
    async fn inverted_price_range_is_rejected_before_any_read() {
        let (store, service) = service();
        let error = service
            .search("rice", &price_range(200, 50), SHARMA_KIRANA, sample::reference_time())
            .await
            .expect_err("inverted range");

        assert!(matches!(error, EngineError::InvalidQuery(_)));
        assert_eq!(store.read_count(), 0);
    }

    #[tokio::test]
    async fn text_matches_are_scored_for_unknown_users_too() {
        let (_, service) = service();
        let results = service
            .search("dal", &SearchFilters::default(), UserId(999), sample::reference_time())
            .await
            .expect("search");

        assert_eq!(results.first().map(|candidate| candidate.product.id), Some(TOOR_DAL));
    }

    #[tokio::test]
    async fn repeated_search_is_served_from_cache() {
        let (store, service) = service();
        let now = sample::reference_time();
        let filters = SearchFilters { category: Some("Grains".to_string()), ..Default::default() };

        let first = service.search("rice", &filters, SHARMA_KIRANA, now).await.expect("first");
        let reads = store.read_count();
        let second = service
            .search(" RICE ", &filters, SHARMA_KIRANA, now + Duration::seconds(60))
            .await
            .expect("second");

        assert_eq!(first, second);
        assert_eq!(store.read_count(), reads);
    }

    #[test]
    fn limit_outside_bounds_is_invalid() {
        let filters = SearchFilters { limit: Some(101), ..SearchFilters::default() };
        assert!(matches!(filters.validate(), Err(EngineError::InvalidQuery(_))));

        let negative = SearchFilters { min_price: Some(Decimal::new(-1, 0)), ..Default::default() };
        assert!(matches!(negative.validate(), Err(EngineError::InvalidQuery(_))));
    }

    #[test]
    fn cache_fragment_is_canonical() {
        let a = SearchFilters {
            category: Some(" Grains ".to_string()),
            min_price: Some(Decimal::new(5000, 2)),
            ..SearchFilters::default()
        };
        let b = SearchFilters {
            category: Some("grains".to_string()),
            min_price: Some(Decimal::new(50, 0)),
            limit: Some(20),
            ..SearchFilters::default()
        };
        assert_eq!(a.cache_fragment(), b.cache_fragment());
        assert_eq!(a.cache_fragment(), "cat=grains|min=50|max=|limit=20");
    }
}
