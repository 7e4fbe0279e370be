use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::deal::{Deal, DealType};
use crate::domain::product::Product;
use crate::domain::profile::UserId;
use crate::errors::EngineError;
use crate::ranking::{by_product_id, rank};
use crate::scoring::{best_deal, ScoredCandidate};
use crate::signals::{ProductFilter, PurchaseQuery};

use super::trending::{low_stock_alerts, purchase_velocity, trending_items, Velocity};
use super::{
    BuyerContext, LowStockAlert, Recommender, TrendingItem, DEALS_LIMIT, LOW_STOCK_LIMIT,
    LOW_STOCK_LOOKBACK_DAYS, LOW_STOCK_QUIET_DAYS, POPULARITY_WINDOW_DAYS, RECOMMENDATION_LIMIT,
    TRENDING_LIMIT, TRENDING_WINDOW_DAYS,
};

/// A product on offer together with the deal that gives it the best price.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DealItem {
    pub product: Product,
    pub deal_id: String,
    pub deal_title: String,
    pub discount_pct: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Homepage {
    pub user_id: UserId,
    pub recommendations: Vec<ScoredCandidate>,
    pub deals: Vec<DealItem>,
    pub trending: Vec<TrendingItem>,
    /// Empty for unknown users.
    pub low_stock_alerts: Vec<LowStockAlert>,
    pub seasonal_deals: Vec<Deal>,
    pub generated_at: DateTime<Utc>,
}

impl Recommender {
    pub async fn homepage(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Homepage, EngineError> {
        let buyer = self.buyer_context(user_id, now).await?;

        let velocity = self.trending_velocity(&buyer, now).await?;
        let trending_catalog =
            self.products_by_id(velocity.iter().map(|entry| entry.product_id)).await?;
        let deal_catalog = self
            .products_by_id(
                buyer.scoring.deals.iter().flat_map(|deal| deal.product_ids.iter().copied()),
            )
            .await?;

        let mut pool = self.signals.products(&self.candidate_filter(&buyer)).await?;
        pool.extend(deal_catalog.iter().cloned());
        pool.extend(trending_catalog.iter().cloned());
        let recommendations =
            rank(self.score(&pool, &buyer.scoring), RECOMMENDATION_LIMIT, by_product_id);

        let low_stock_alerts = if buyer.is_anonymous() {
            Vec::new()
        } else {
            low_stock_alerts(
                &buyer.purchases,
                &buyer.purchased,
                now - Duration::days(LOW_STOCK_LOOKBACK_DAYS),
                now - Duration::days(LOW_STOCK_QUIET_DAYS),
                LOW_STOCK_LIMIT,
            )
        };

        let homepage = Homepage {
            user_id,
            recommendations,
            deals: deal_items(&deal_catalog, &buyer.scoring.deals, DEALS_LIMIT),
            trending: trending_items(&velocity, &trending_catalog, TRENDING_LIMIT),
            low_stock_alerts,
            seasonal_deals: buyer
                .scoring
                .deals
                .iter()
                .filter(|deal| deal.deal_type == DealType::Seasonal)
                .cloned()
                .collect(),
            generated_at: now,
        };

        info!(
            event_name = "recommendation.homepage.computed",
            user_id = %user_id,
            anonymous = buyer.is_anonymous(),
            recommendations = homepage.recommendations.len(),
            deals = homepage.deals.len(),
            trending = homepage.trending.len(),
            alerts = homepage.low_stock_alerts.len(),
            "homepage computed"
        );

        Ok(homepage)
    }

    /// Local demand over the trending window, or marketplace-wide popularity
    /// when the buyer is unknown or nothing sold nearby.
    async fn trending_velocity(
        &self,
        buyer: &BuyerContext,
        now: DateTime<Utc>,
    ) -> Result<Vec<Velocity>, EngineError> {
        if let Some(profile) = &buyer.scoring.profile {
            let local = self
                .signals
                .purchases(
                    &PurchaseQuery::in_city(profile.location.city.clone())
                        .since(now - Duration::days(TRENDING_WINDOW_DAYS)),
                )
                .await?;
            if !local.is_empty() {
                return Ok(purchase_velocity(&local));
            }
        }

        let marketplace = self
            .signals
            .purchases(
                &PurchaseQuery::marketplace().since(now - Duration::days(POPULARITY_WINDOW_DAYS)),
            )
            .await?;
        Ok(purchase_velocity(&marketplace))
    }

    /// Categories the buyer's business favors, already buys, or buys next to.
    /// Unknown users get the whole in-stock catalog.
    fn candidate_filter(&self, buyer: &BuyerContext) -> ProductFilter {
        let Some(profile) = &buyer.scoring.profile else {
            return ProductFilter::all().in_stock();
        };

        let config = self.engine.config();
        let mut categories: BTreeSet<String> = BTreeSet::new();
        if let Some(favored) = config.affinity.get(&profile.business_type) {
            categories.extend(favored.iter().cloned());
        }
        for category in buyer.scoring.history.top_categories() {
            if let Some(related) = config.related_categories.get(&category) {
                categories.extend(related.iter().cloned());
            }
            categories.insert(category);
        }

        ProductFilter::all().with_categories(categories).in_stock()
    }
}

/// Available products under an active deal, deepest discount first.
fn deal_items(catalog: &[Product], deals: &[Deal], limit: usize) -> Vec<DealItem> {
    let mut items: Vec<DealItem> = catalog
        .iter()
        .filter(|product| product.is_available())
        .filter_map(|product| {
            let deal = best_deal(product, deals)?;
            Some(DealItem {
                product: product.clone(),
                deal_id: deal.id.clone(),
                deal_title: deal.title.clone(),
                discount_pct: deal.discount_pct,
            })
        })
        .collect();

    items.sort_by(|a, b| {
        b.discount_pct.cmp(&a.discount_pct).then_with(|| a.product.id.cmp(&b.product.id))
    });
    items.truncate(limit);
    items
}
