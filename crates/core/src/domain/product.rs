use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::profile::Location;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub u64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub price: Decimal,
    pub stock: i64,
    /// Fraction of the price kept as margin, e.g. `0.25`.
    pub margin: Decimal,
    pub tags: Vec<String>,
    pub region: Location,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// A product can be offered only while it is active and has stock on hand.
    pub fn is_available(&self) -> bool {
        self.active && self.stock > 0
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|candidate| candidate.eq_ignore_ascii_case(tag))
    }

    pub fn margin_fraction(&self) -> f64 {
        self.margin.to_f64().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{Product, ProductId};
    use crate::domain::profile::Location;

    fn product(stock: i64, active: bool) -> Product {
        Product {
            id: ProductId(1),
            name: "Basmati Rice Premium".to_string(),
            category: "grains".to_string(),
            subcategory: Some("rice".to_string()),
            price: Decimal::new(150, 0),
            stock,
            margin: Decimal::new(20, 2),
            tags: vec!["Staples".to_string()],
            region: Location::new("Mumbai", "Maharashtra"),
            active,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn availability_requires_stock_and_active_flag() {
        assert!(product(5, true).is_available());
        assert!(!product(0, true).is_available());
        assert!(!product(-3, true).is_available());
        assert!(!product(5, false).is_available());
    }

    #[test]
    fn tag_lookup_ignores_case() {
        assert!(product(1, true).has_tag("staples"));
        assert!(!product(1, true).has_tag("sweets"));
    }
}
