use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, Utc};
use rust_decimal::Decimal;

use dukaan_core::config::{AssistantConfig, SeasonConfig};
use dukaan_core::domain::product::{Product, ProductId};
use dukaan_core::errors::EngineError;
use dukaan_core::ranking::{by_product_id, rank};
use dukaan_core::recommendations::trending::{purchase_velocity, trending_items};
use dukaan_core::recommendations::{BuyerContext, Recommender};
use dukaan_core::scoring::ScoredCandidate;
use dukaan_core::signals::{ProductFilter, PurchaseQuery};

use crate::intent::{AssistantIntent, Classification};

/// One variant per intent, carrying whatever the intent resolved up front.
#[derive(Clone, Debug, PartialEq)]
pub enum Strategy {
    SeasonalStock { season: Option<SeasonConfig> },
    MarginOptimization,
    ShoppingList,
    TrendQuery,
    Fallback,
}

/// Products picked by a strategy plus the facts the response template needs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Resolution {
    pub products: Vec<ScoredCandidate>,
    pub season: Option<String>,
    /// City the trend was measured in, `None` for marketplace-wide trends.
    pub trend_city: Option<String>,
}

impl Strategy {
    pub fn for_classification(
        classification: &Classification,
        config: &AssistantConfig,
        now: DateTime<Utc>,
    ) -> Self {
        match classification.intent {
            AssistantIntent::SeasonalStock => Self::SeasonalStock {
                season: select_season(&config.seasons, &classification.normalized_query, now)
                    .cloned(),
            },
            AssistantIntent::MarginOptimization => Self::MarginOptimization,
            AssistantIntent::ShoppingList => Self::ShoppingList,
            AssistantIntent::TrendQuery => Self::TrendQuery,
            AssistantIntent::Fallback => Self::Fallback,
        }
    }

    pub fn intent(&self) -> AssistantIntent {
        match self {
            Self::SeasonalStock { .. } => AssistantIntent::SeasonalStock,
            Self::MarginOptimization => AssistantIntent::MarginOptimization,
            Self::ShoppingList => AssistantIntent::ShoppingList,
            Self::TrendQuery => AssistantIntent::TrendQuery,
            Self::Fallback => AssistantIntent::Fallback,
        }
    }

    /// The fallback answers from fixed text and never touches the store.
    pub fn reads_signals(&self) -> bool {
        !matches!(self, Self::Fallback)
    }

    pub async fn resolve(
        &self,
        recommender: &Recommender,
        config: &AssistantConfig,
        buyer: &BuyerContext,
        now: DateTime<Utc>,
    ) -> Result<Resolution, EngineError> {
        match self {
            Self::SeasonalStock { season } => {
                let Some(season) = season else {
                    return Ok(Resolution::default());
                };
                let products = seasonal_stock(recommender, config, buyer, season).await?;
                Ok(Resolution { products, season: Some(season.name.clone()), trend_city: None })
            }
            Self::MarginOptimization => Ok(Resolution {
                products: high_margin(recommender, config, buyer).await?,
                ..Resolution::default()
            }),
            Self::ShoppingList => Ok(Resolution {
                products: shopping_list(recommender, config, buyer).await?,
                ..Resolution::default()
            }),
            Self::TrendQuery => trending(recommender, config, buyer, now).await,
            Self::Fallback => Ok(Resolution::default()),
        }
    }
}

/// The season named in the query, else the one in progress, else the first.
pub fn select_season<'a>(
    seasons: &'a [SeasonConfig],
    normalized_query: &str,
    now: DateTime<Utc>,
) -> Option<&'a SeasonConfig> {
    seasons
        .iter()
        .find(|season| season.is_named_in(normalized_query))
        .or_else(|| seasons.iter().find(|season| season.months.contains(&now.month())))
        .or_else(|| seasons.first())
}

async fn seasonal_stock(
    recommender: &Recommender,
    config: &AssistantConfig,
    buyer: &BuyerContext,
    season: &SeasonConfig,
) -> Result<Vec<ScoredCandidate>, EngineError> {
    let filter = ProductFilter::all().with_any_tag(season.tags.iter().cloned()).in_stock();
    let products = recommender.signals().products(&filter).await?;
    let scored = recommender.score(&products, &buyer.scoring);
    Ok(rank(scored, config.seasonal_limit, by_product_id))
}

async fn high_margin(
    recommender: &Recommender,
    config: &AssistantConfig,
    buyer: &BuyerContext,
) -> Result<Vec<ScoredCandidate>, EngineError> {
    let mut products: Vec<Product> = recommender
        .signals()
        .products(&ProductFilter::all().in_stock())
        .await?
        .into_iter()
        .filter(|product| product.margin_fraction() >= config.min_margin)
        .collect();
    products.sort_by(|a, b| b.margin.cmp(&a.margin).then_with(|| a.id.cmp(&b.id)));
    products.truncate(config.margin_limit);

    Ok(products
        .iter()
        .map(|product| {
            let mut candidate = recommender.engine().score(product, &buyer.scoring);
            candidate.reasons.insert(0, format!("{}% margin", margin_percent(product.margin)));
            candidate
        })
        .collect())
}

async fn shopping_list(
    recommender: &Recommender,
    config: &AssistantConfig,
    buyer: &BuyerContext,
) -> Result<Vec<ScoredCandidate>, EngineError> {
    let candidates = if !buyer.purchased.is_empty() {
        buyer.purchased.clone()
    } else {
        let favored = buyer
            .scoring
            .profile
            .as_ref()
            .and_then(|profile| recommender.engine().config().affinity.get(&profile.business_type));
        let filter = match favored {
            Some(categories) => ProductFilter::all().with_categories(categories.iter().cloned()),
            None => ProductFilter::all(),
        };
        recommender.signals().products(&filter.in_stock()).await?
    };

    let reorders = reorder_summary(buyer);
    let scored = recommender
        .score(&candidates, &buyer.scoring)
        .into_iter()
        .map(|mut candidate| {
            if let Some((orders, last)) = reorders.get(&candidate.product.id) {
                let noun = if *orders == 1 { "order" } else { "orders" };
                candidate.reasons.insert(
                    0,
                    format!("Bought in {orders} {noun}, last on {}", last.format("%Y-%m-%d")),
                );
            }
            candidate
        })
        .collect();
    Ok(rank(scored, config.shopping_list_size, by_product_id))
}

/// Distinct order count and last purchase per product the buyer bought.
fn reorder_summary(buyer: &BuyerContext) -> HashMap<ProductId, (u32, DateTime<Utc>)> {
    let mut seen = std::collections::BTreeSet::new();
    let mut summary: HashMap<ProductId, (u32, DateTime<Utc>)> = HashMap::new();
    for purchase in &buyer.purchases {
        let entry = summary.entry(purchase.product_id).or_insert((0, purchase.purchased_at));
        if seen.insert((purchase.product_id, purchase.order_id.as_str())) {
            entry.0 += 1;
        }
        entry.1 = entry.1.max(purchase.purchased_at);
    }
    summary
}

async fn trending(
    recommender: &Recommender,
    config: &AssistantConfig,
    buyer: &BuyerContext,
    now: DateTime<Utc>,
) -> Result<Resolution, EngineError> {
    let since = now - Duration::days(i64::from(config.trend_window_days));
    let city = buyer.scoring.profile.as_ref().map(|profile| profile.location.city.clone());
    let query = match &city {
        Some(city) => PurchaseQuery::in_city(city.clone()),
        None => PurchaseQuery::marketplace(),
    };

    let purchases = recommender.signals().purchases(&query.since(since)).await?;
    let velocity = purchase_velocity(&purchases);
    let catalog = recommender.products_by_id(velocity.iter().map(|entry| entry.product_id)).await?;
    let area = city.as_deref().map_or_else(|| "the marketplace".to_string(), str::to_string);

    let products = trending_items(&velocity, &catalog, config.trend_limit)
        .into_iter()
        .map(|item| {
            let mut candidate = recommender.engine().score(&item.product, &buyer.scoring);
            candidate.reasons.insert(
                0,
                format!(
                    "{} units sold in {area} over the last {} days",
                    item.units, config.trend_window_days
                ),
            );
            candidate
        })
        .collect();

    Ok(Resolution { products, season: None, trend_city: city })
}

pub(crate) fn margin_percent(margin: Decimal) -> Decimal {
    (margin * Decimal::ONE_HUNDRED).round_dp(1).normalize()
}
