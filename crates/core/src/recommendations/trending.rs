use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::product::{Product, ProductId};
use crate::domain::profile::UserId;
use crate::domain::purchase::PurchaseRecord;

/// Aggregate demand for one product over a window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Velocity {
    pub product_id: ProductId,
    pub units: u64,
    pub orders: u32,
    pub buyers: u32,
}

/// Demand per product, most units first, product id ascending on ties.
pub fn purchase_velocity(purchases: &[PurchaseRecord]) -> Vec<Velocity> {
    let mut units: HashMap<ProductId, (u64, HashSet<&str>, HashSet<UserId>)> = HashMap::new();
    for purchase in purchases {
        let (total, orders, buyers) = units.entry(purchase.product_id).or_default();
        *total += u64::from(purchase.quantity);
        orders.insert(purchase.order_id.as_str());
        buyers.insert(purchase.user_id);
    }

    let mut velocity: Vec<Velocity> = units
        .into_iter()
        .map(|(product_id, (units, orders, buyers))| Velocity {
            product_id,
            units,
            orders: orders.len() as u32,
            buyers: buyers.len() as u32,
        })
        .collect();
    velocity.sort_by(|a, b| b.units.cmp(&a.units).then_with(|| a.product_id.cmp(&b.product_id)));
    velocity
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendingItem {
    pub product: Product,
    pub units: u64,
    pub orders: u32,
    pub buyers: u32,
}

/// Join velocity with the catalog, keeping only available products.
pub fn trending_items(
    velocity: &[Velocity],
    catalog: &[Product],
    limit: usize,
) -> Vec<TrendingItem> {
    let by_id: HashMap<ProductId, &Product> =
        catalog.iter().map(|product| (product.id, product)).collect();

    velocity
        .iter()
        .filter_map(|entry| {
            let product = by_id.get(&entry.product_id).filter(|product| product.is_available())?;
            Some(TrendingItem {
                product: (*product).clone(),
                units: entry.units,
                orders: entry.orders,
                buyers: entry.buyers,
            })
        })
        .take(limit)
        .collect()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LowStockAlert {
    pub product: Product,
    pub purchase_count: u32,
    pub last_purchased_at: DateTime<Utc>,
}

/// Products bought within `lookback` but not since `quiet_since`: likely
/// running low on the buyer's shelf. Most frequently bought first, then the
/// longest since the last purchase.
pub fn low_stock_alerts(
    purchases: &[PurchaseRecord],
    catalog: &[Product],
    lookback: DateTime<Utc>,
    quiet_since: DateTime<Utc>,
    limit: usize,
) -> Vec<LowStockAlert> {
    let mut per_product: HashMap<ProductId, (u32, DateTime<Utc>)> = HashMap::new();
    for purchase in purchases.iter().filter(|purchase| purchase.purchased_at >= lookback) {
        per_product
            .entry(purchase.product_id)
            .and_modify(|(count, last)| {
                *count += 1;
                *last = (*last).max(purchase.purchased_at);
            })
            .or_insert((1, purchase.purchased_at));
    }

    let by_id: HashMap<ProductId, &Product> =
        catalog.iter().map(|product| (product.id, product)).collect();

    let mut alerts: Vec<LowStockAlert> = per_product
        .into_iter()
        .filter(|(_, (_, last))| *last < quiet_since)
        .filter_map(|(product_id, (purchase_count, last_purchased_at))| {
            let product = by_id.get(&product_id).filter(|product| product.is_available())?;
            Some(LowStockAlert { product: (*product).clone(), purchase_count, last_purchased_at })
        })
        .collect();

    alerts.sort_by(|a, b| {
        b.purchase_count
            .cmp(&a.purchase_count)
            .then_with(|| a.last_purchased_at.cmp(&b.last_purchased_at))
            .then_with(|| a.product.id.cmp(&b.product.id))
    });
    alerts.truncate(limit);
    alerts
}
