use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::product::ProductId;
use super::profile::UserId;

/// One order line in the append-only purchase log. Lines that share an
/// `order_id` were bought together.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub order_id: String,
    pub quantity: u32,
    pub purchased_at: DateTime<Utc>,
}
