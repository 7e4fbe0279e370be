use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::product::ProductId;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealType {
    Daily,
    Seasonal,
    Bulk,
}

impl DealType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Seasonal => "seasonal",
            Self::Bulk => "bulk",
        }
    }
}

impl std::str::FromStr for DealType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "seasonal" => Ok(Self::Seasonal),
            "bulk" => Ok(Self::Bulk),
            other => {
                Err(DomainError::InvalidValue { field: "deal_type", value: other.to_string() })
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deal {
    pub id: String,
    pub title: String,
    pub product_ids: Vec<ProductId>,
    /// Discount magnitude in percent, `20` means 20% off.
    pub discount_pct: Decimal,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub deal_type: DealType,
}

impl Deal {
    /// Validity window is half open: `starts_at <= at < ends_at`.
    pub fn is_active(&self, at: DateTime<Utc>) -> bool {
        self.starts_at <= at && at < self.ends_at
    }

    pub fn covers(&self, product_id: ProductId) -> bool {
        self.product_ids.contains(&product_id)
    }

    pub fn discount(&self) -> f64 {
        self.discount_pct.to_f64().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{Deal, DealType};
    use crate::domain::product::ProductId;

    #[test]
    fn validity_window_is_half_open() {
        let start = Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap();
        let deal = Deal {
            id: "deal-diwali".to_string(),
            title: "Diwali Special".to_string(),
            product_ids: vec![ProductId(1)],
            discount_pct: Decimal::new(20, 0),
            starts_at: start,
            ends_at: start + Duration::days(30),
            deal_type: DealType::Seasonal,
        };

        assert!(deal.is_active(start));
        assert!(deal.is_active(start + Duration::days(29)));
        assert!(!deal.is_active(start + Duration::days(30)));
        assert!(!deal.is_active(start - Duration::seconds(1)));
        assert!(deal.covers(ProductId(1)));
        assert!(!deal.covers(ProductId(2)));
    }
}
