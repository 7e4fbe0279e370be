use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::domain::product::{Product, ProductId};
use crate::domain::profile::UserId;
use crate::errors::EngineError;
use crate::ranking::{by_product_id, rank};
use crate::scoring::ScoredCandidate;
use crate::signals::{ProductFilter, PurchaseQuery};

use super::{Recommender, SUGGESTION_LIMIT};

impl Recommender {
    /// Products to show next to `product_id`: the rest of its category and
    /// whatever tends to share an order with it, scored for the viewer.
    pub async fn product_suggestions(
        &self,
        user_id: UserId,
        product_id: ProductId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScoredCandidate>, EngineError> {
        let target = self
            .signals
            .products(&ProductFilter::all().with_ids([product_id]))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::not_found("product", product_id))?;

        let buyer = self.buyer_context(user_id, now).await?;

        let same_category = self
            .signals
            .products(&ProductFilter::all().with_categories([target.category.clone()]).in_stock())
            .await?;
        let together = self.bought_together(product_id).await?;
        let companions = self.products_by_id(together.keys().copied()).await?;

        let candidates: Vec<ScoredCandidate> = same_category
            .iter()
            .chain(companions.iter())
            .filter(|product| product.id != product_id)
            .map(|product| {
                let mut candidate = self.engine.score(product, &buyer.scoring);
                candidate.reasons.splice(0..0, relation_reasons(&target, product, &together));
                candidate
            })
            .collect();

        let suggestions = rank(candidates, SUGGESTION_LIMIT, by_product_id);
        info!(
            event_name = "recommendation.suggestions.computed",
            user_id = %user_id,
            product_id = %product_id,
            suggestions = suggestions.len(),
            "product suggestions computed"
        );
        Ok(suggestions)
    }

    /// Number of distinct orders each other product shared with `product_id`.
    async fn bought_together(
        &self,
        product_id: ProductId,
    ) -> Result<HashMap<ProductId, u32>, EngineError> {
        let orders: BTreeSet<String> = self
            .signals
            .purchases(&PurchaseQuery::marketplace().with_products([product_id]))
            .await?
            .into_iter()
            .map(|purchase| purchase.order_id)
            .collect();
        if orders.is_empty() {
            return Ok(HashMap::new());
        }

        let lines =
            self.signals.purchases(&PurchaseQuery::marketplace().with_orders(orders)).await?;
        let mut seen: BTreeSet<(ProductId, String)> = BTreeSet::new();
        let mut together: HashMap<ProductId, u32> = HashMap::new();
        for line in lines.into_iter().filter(|line| line.product_id != product_id) {
            if seen.insert((line.product_id, line.order_id)) {
                *together.entry(line.product_id).or_default() += 1;
            }
        }
        Ok(together)
    }
}

fn relation_reasons(
    target: &Product,
    candidate: &Product,
    together: &HashMap<ProductId, u32>,
) -> Vec<String> {
    let mut reasons = Vec::new();
    if let Some(orders) = together.get(&candidate.id) {
        let noun = if *orders == 1 { "order" } else { "orders" };
        reasons.push(format!("Bought together in {orders} {noun}"));
    }
    if candidate.category.eq_ignore_ascii_case(&target.category) {
        match (&candidate.subcategory, &target.subcategory) {
            (Some(a), Some(b)) if a.eq_ignore_ascii_case(b) => {
                reasons.push(format!("Same {a} range as {}", target.name));
            }
            _ => reasons.push(format!("More from {}", candidate.category)),
        }
    }
    reasons
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::domain::product::ProductId;
    use crate::errors::EngineError;
    use crate::recommendations::Recommender;
    use crate::scoring::ScoringEngine;
    use crate::signals::sample::{self, BASMATI_RICE, SHARMA_KIRANA, TOOR_DAL, WHEAT_ATTA};
    use crate::signals::InMemorySignalStore;

    fn recommender() -> Recommender {
        let store = Arc::new(InMemorySignalStore::from_snapshot(sample::snapshot()));
        Recommender::new(store, Arc::new(ScoringEngine::default()))
    }

    #[tokio::test]
    async fn suggestions_cover_category_and_co_purchases() {
        let suggestions = recommender()
            .product_suggestions(SHARMA_KIRANA, BASMATI_RICE, sample::reference_time())
            .await
            .expect("suggestions");

        let ids: Vec<ProductId> = suggestions.iter().map(|c| c.product.id).collect();
        assert!(!ids.contains(&BASMATI_RICE), "the viewed product is never suggested");
        assert!(ids.contains(&WHEAT_ATTA));
        assert!(ids.contains(&TOOR_DAL));

        let dal = suggestions.iter().find(|c| c.product.id == TOOR_DAL).expect("dal suggested");
        assert_eq!(dal.reasons[0], "Bought together in 2 orders");

        let atta = suggestions.iter().find(|c| c.product.id == WHEAT_ATTA).expect("atta");
        assert_eq!(atta.reasons[0], "More from grains");
    }

    #[tokio::test]
    async fn unknown_product_is_not_found() {
        let error = recommender()
            .product_suggestions(SHARMA_KIRANA, ProductId(4040), sample::reference_time())
            .await
            .expect_err("missing product");
        assert_eq!(error, EngineError::not_found("product", ProductId(4040)));
    }
}
