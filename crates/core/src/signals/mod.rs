//! Read-only access to the records the engine derives its signals from.
//!
//! The external application owns profiles, catalog, purchase history and
//! deals. The engine only ever asks for owned snapshots through
//! [`SignalStore`], so adapters are free to back it with SQL, an HTTP client
//! or the in-memory fake used by tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::deal::Deal;
use crate::domain::product::{Product, ProductId};
use crate::domain::profile::{BusinessProfile, UserId};
use crate::domain::purchase::PurchaseRecord;

pub mod memory;
pub mod sample;

pub use memory::InMemorySignalStore;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SignalStoreError {
    #[error("signal store unavailable: {0}")]
    Unavailable(String),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait SignalStore: Send + Sync {
    async fn business_profile(
        &self,
        user_id: UserId,
    ) -> Result<Option<BusinessProfile>, SignalStoreError>;

    async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>, SignalStoreError>;

    async fn purchases(
        &self,
        query: &PurchaseQuery,
    ) -> Result<Vec<PurchaseRecord>, SignalStoreError>;

    async fn active_deals(&self, at: DateTime<Utc>) -> Result<Vec<Deal>, SignalStoreError>;
}

/// Conjunction of optional product predicates. `None` means "no constraint".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProductFilter {
    pub ids: Option<Vec<ProductId>>,
    pub categories: Option<Vec<String>>,
    pub tags_any: Option<Vec<String>>,
    /// Case-insensitive substring over name, category, subcategory and tags.
    pub text: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub in_stock_only: bool,
}

impl ProductFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_ids(mut self, ids: impl IntoIterator<Item = ProductId>) -> Self {
        self.ids = Some(ids.into_iter().collect());
        self
    }

    pub fn with_categories<S: Into<String>>(
        mut self,
        categories: impl IntoIterator<Item = S>,
    ) -> Self {
        self.categories = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_any_tag<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags_any = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.text = (!text.trim().is_empty()).then(|| text.trim().to_string());
        self
    }

    pub fn with_price_range(mut self, min: Option<Decimal>, max: Option<Decimal>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    pub fn in_stock(mut self) -> Self {
        self.in_stock_only = true;
        self
    }

    /// Reference semantics for adapters that filter in process.
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(ids) = &self.ids {
            if !ids.contains(&product.id) {
                return false;
            }
        }
        if let Some(categories) = &self.categories {
            if !categories.iter().any(|category| category.eq_ignore_ascii_case(&product.category))
            {
                return false;
            }
        }
        if let Some(tags) = &self.tags_any {
            if !tags.iter().any(|tag| product.has_tag(tag)) {
                return false;
            }
        }
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            let haystacks =
                [Some(&product.name), Some(&product.category), product.subcategory.as_ref()];
            let in_fields =
                haystacks.into_iter().flatten().any(|field| field.to_lowercase().contains(&needle));
            let in_tags = product.tags.iter().any(|tag| tag.to_lowercase().contains(&needle));
            if !in_fields && !in_tags {
                return false;
            }
        }
        if let Some(min) = self.min_price {
            if product.price < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if product.price > max {
                return false;
            }
        }
        if self.in_stock_only && !product.is_available() {
            return false;
        }
        true
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PurchaseQuery {
    pub user_id: Option<UserId>,
    /// Restrict to buyers whose business is located in this city.
    pub city: Option<String>,
    pub product_ids: Option<Vec<ProductId>>,
    pub order_ids: Option<Vec<String>>,
    pub since: Option<DateTime<Utc>>,
}

impl PurchaseQuery {
    pub fn for_user(user_id: UserId) -> Self {
        Self { user_id: Some(user_id), ..Self::default() }
    }

    pub fn in_city(city: impl Into<String>) -> Self {
        Self { city: Some(city.into()), ..Self::default() }
    }

    pub fn marketplace() -> Self {
        Self::default()
    }

    pub fn with_products(mut self, ids: impl IntoIterator<Item = ProductId>) -> Self {
        self.product_ids = Some(ids.into_iter().collect());
        self
    }

    pub fn with_orders(mut self, order_ids: impl IntoIterator<Item = String>) -> Self {
        self.order_ids = Some(order_ids.into_iter().collect());
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }
}
