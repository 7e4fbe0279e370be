//! Types for the Scoring Engine

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::deal::Deal;
use crate::domain::product::{Product, ProductId};
use crate::domain::profile::{BusinessProfile, BusinessType};
use crate::domain::purchase::PurchaseRecord;

/// Weights for the four scoring components
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Weight for business-type category affinity (default: 0.30)
    pub affinity: f64,
    /// Weight for geographic proximity (default: 0.20)
    pub proximity: f64,
    /// Weight for purchase recency and frequency (default: 0.30)
    pub purchase: f64,
    /// Weight for deal attractiveness (default: 0.20)
    pub deal: f64,
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.affinity + self.proximity + self.purchase + self.deal
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        super::DEFAULT_WEIGHTS
    }
}

/// Every tunable constant the engine uses.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    pub weights: ScoringWeights,
    /// Categories favored by each business type.
    pub affinity: HashMap<BusinessType, Vec<String>>,
    /// Affinity for a category the business type does not favor.
    pub affinity_baseline: f64,
    pub same_city: f64,
    pub same_state: f64,
    pub proximity_floor: f64,
    pub recency_half_life_days: f64,
    /// Purchase count at which the frequency signal saturates.
    pub frequency_saturation: u32,
    pub related_categories: HashMap<String, Vec<String>>,
    /// Discount applied to the signal of a related category.
    pub related_category_factor: f64,
    /// Purchase signal for buyers with no history at all.
    pub cold_start_purchase: f64,
    /// Discount percent that maps to a full deal signal.
    pub deal_full_scale_pct: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let affinity: [(BusinessType, &[&str]); 6] = [
            (BusinessType::Kirana, &["grains", "pulses", "oils", "sweeteners", "beverages"]),
            (BusinessType::Supermarket, &["beverages", "snacks", "personal-care", "household"]),
            (BusinessType::Wholesale, &["grains", "pulses", "oils", "sweeteners"]),
            (BusinessType::Distributor, &["grains", "pulses", "oils", "beverages"]),
            (BusinessType::Retailer, &["snacks", "beverages", "personal-care", "household"]),
            (BusinessType::Restaurant, &["grains", "oils", "spices", "pulses", "dairy"]),
        ];
        let affinity = affinity
            .into_iter()
            .map(|(business_type, categories)| {
                (business_type, categories.iter().map(|category| category.to_string()).collect())
            })
            .collect();

        let related_categories: [(&str, &[&str]); 6] = [
            ("grains", &["pulses", "flour"]),
            ("pulses", &["grains"]),
            ("oils", &["spices", "grains"]),
            ("beverages", &["snacks"]),
            ("snacks", &["beverages", "sweets"]),
            ("sweets", &["snacks", "dairy"]),
        ];
        let related_categories = related_categories
            .into_iter()
            .map(|(category, related)| {
                (category.to_string(), related.iter().map(|item| item.to_string()).collect())
            })
            .collect();

        Self {
            weights: ScoringWeights::default(),
            affinity,
            affinity_baseline: 0.3,
            same_city: 1.0,
            same_state: 0.6,
            proximity_floor: 0.2,
            recency_half_life_days: 30.0,
            frequency_saturation: 5,
            related_categories,
            related_category_factor: 0.5,
            cold_start_purchase: 0.5,
            deal_full_scale_pct: 30.0,
        }
    }
}

/// Individual component scores, each in `[0, 1]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub affinity: f64,
    pub proximity: f64,
    pub purchase: f64,
    pub deal: f64,
}

/// A product with its relevance score and the reasons behind it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub product: Product,
    pub score: f64,
    /// Human-readable reasons, strongest contribution first
    pub reasons: Vec<String>,
    pub components: ComponentScores,
}

/// How often and how recently a buyer purchased from a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryStats {
    pub count: u32,
    pub last_purchase: DateTime<Utc>,
}

/// Per-category purchase history of a single buyer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryHistory {
    categories: HashMap<String, CategoryStats>,
}

impl CategoryHistory {
    /// Folds purchase lines into per-category stats. Lines whose product is
    /// missing from `catalog` are skipped.
    pub fn build(purchases: &[PurchaseRecord], catalog: &[Product]) -> Self {
        let category_of: HashMap<ProductId, &str> =
            catalog.iter().map(|product| (product.id, product.category.as_str())).collect();

        let mut categories: HashMap<String, CategoryStats> = HashMap::new();
        for purchase in purchases {
            let Some(category) = category_of.get(&purchase.product_id) else {
                continue;
            };
            categories
                .entry(category.to_ascii_lowercase())
                .and_modify(|stats| {
                    stats.count += 1;
                    stats.last_purchase = stats.last_purchase.max(purchase.purchased_at);
                })
                .or_insert(CategoryStats { count: 1, last_purchase: purchase.purchased_at });
        }

        Self { categories }
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn get(&self, category: &str) -> Option<&CategoryStats> {
        self.categories.get(&category.to_ascii_lowercase())
    }

    /// Categories ordered by purchase count, most bought first.
    pub fn top_categories(&self) -> Vec<String> {
        let mut ranked: Vec<(&String, &CategoryStats)> = self.categories.iter().collect();
        ranked.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(b.0)));
        ranked.into_iter().map(|(category, _)| category.clone()).collect()
    }
}

/// Everything known about the buyer when scoring a batch of products.
#[derive(Debug, Clone)]
pub struct ScoringContext {
    /// `None` for unknown users, which scores every product anonymously.
    pub profile: Option<BusinessProfile>,
    pub history: CategoryHistory,
    pub deals: Vec<Deal>,
    pub now: DateTime<Utc>,
}

impl ScoringContext {
    pub fn new(
        profile: Option<BusinessProfile>,
        history: CategoryHistory,
        deals: Vec<Deal>,
        now: DateTime<Utc>,
    ) -> Self {
        Self { profile, history, deals, now }
    }

    pub fn anonymous(deals: Vec<Deal>, now: DateTime<Utc>) -> Self {
        Self { profile: None, history: CategoryHistory::default(), deals, now }
    }
}
