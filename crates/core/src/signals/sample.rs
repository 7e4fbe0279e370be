//! Demo marketplace used by tests and local runs. Mirrors
//! `config/fixtures/seed_data.sql` row for row.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::domain::deal::{Deal, DealType};
use crate::domain::product::{Product, ProductId};
use crate::domain::profile::{BusinessProfile, BusinessType, Location, UserId};
use crate::domain::purchase::PurchaseRecord;

use super::memory::SignalSnapshot;

pub const SHARMA_KIRANA: UserId = UserId(1);
pub const ABC_WHOLESALE: UserId = UserId(2);
pub const PATEL_SUPERMARKET: UserId = UserId(3);
pub const MEHTA_GENERAL: UserId = UserId(4);

pub const BASMATI_RICE: ProductId = ProductId(1);
pub const WHEAT_ATTA: ProductId = ProductId(2);
pub const TOOR_DAL: ProductId = ProductId(3);
pub const MUSTARD_OIL: ProductId = ProductId(4);
pub const SUGAR: ProductId = ProductId(5);
pub const TEA: ProductId = ProductId(6);
pub const KAJU_KATLI: ProductId = ProductId(7);
pub const DIYA_SET: ProductId = ProductId(8);
pub const DRY_FRUIT_BOX: ProductId = ProductId(9);
pub const BISCUITS: ProductId = ProductId(10);
pub const GHEE: ProductId = ProductId(11);

fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, 0, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or_default()
}

/// The instant the sample data is written against: 2024-10-15 10:00 UTC.
pub fn reference_time() -> DateTime<Utc> {
    at(2024, 10, 15, 10)
}

fn mumbai() -> Location {
    Location::new("Mumbai", "Maharashtra")
}

fn delhi() -> Location {
    Location::new("Delhi", "Delhi")
}

fn profile(
    id: UserId,
    name: &str,
    business_type: BusinessType,
    location: Location,
    registered_at: DateTime<Utc>,
) -> BusinessProfile {
    BusinessProfile {
        id,
        business_name: name.to_string(),
        business_type,
        location,
        registered_at,
    }
}

struct Row<'a> {
    id: ProductId,
    name: &'a str,
    category: &'a str,
    subcategory: &'a str,
    price: i64,
    stock: i64,
    margin_pct: i64,
    tags: &'a [&'a str],
    region: Location,
}

impl Row<'_> {
    fn build(self) -> Product {
        Product {
            id: self.id,
            name: self.name.to_string(),
            category: self.category.to_string(),
            subcategory: Some(self.subcategory.to_string()),
            price: Decimal::new(self.price * 100, 2),
            stock: self.stock,
            margin: Decimal::new(self.margin_pct, 2),
            tags: self.tags.iter().map(|tag| tag.to_string()).collect(),
            region: self.region,
            active: true,
            created_at: at(2024, 1, 1, 0),
        }
    }
}

pub fn products() -> Vec<Product> {
    let kolkata = Location::new("Kolkata", "West Bengal");
    let pune = Location::new("Pune", "Maharashtra");
    #[rustfmt::skip]
    let rows = vec![
        Row { id: BASMATI_RICE, name: "India Gate Basmati Rice 5kg", category: "grains",
            subcategory: "rice", price: 450, stock: 200, margin_pct: 18,
            tags: &["rice", "staple", "basmati"], region: mumbai() },
        Row { id: WHEAT_ATTA, name: "Aashirvaad Whole Wheat Atta 10kg", category: "grains",
            subcategory: "flour", price: 420, stock: 150, margin_pct: 15,
            tags: &["atta", "staple", "flour"], region: delhi() },
        Row { id: TOOR_DAL, name: "Tata Toor Dal 1kg", category: "pulses",
            subcategory: "dal", price: 165, stock: 300, margin_pct: 20,
            tags: &["dal", "protein", "staple"], region: mumbai() },
        Row { id: MUSTARD_OIL, name: "Fortune Mustard Oil 1L", category: "oils",
            subcategory: "mustard-oil", price: 180, stock: 120, margin_pct: 22,
            tags: &["oil", "cooking"], region: delhi() },
        Row { id: SUGAR, name: "Madhur Sugar 5kg", category: "sweeteners",
            subcategory: "sugar", price: 250, stock: 80, margin_pct: 12,
            tags: &["sugar", "sweets", "staple"], region: mumbai() },
        Row { id: TEA, name: "Tata Tea Premium 1kg", category: "beverages",
            subcategory: "tea", price: 520, stock: 60, margin_pct: 28,
            tags: &["tea", "beverage"], region: kolkata },
        Row { id: KAJU_KATLI, name: "Haldiram Kaju Katli 500g", category: "sweets",
            subcategory: "mithai", price: 380, stock: 40, margin_pct: 35,
            tags: &["diwali", "sweets", "gifting", "festive"], region: mumbai() },
        Row { id: DIYA_SET, name: "Clay Diya Set (12 pcs)", category: "decorations",
            subcategory: "diya", price: 120, stock: 90, margin_pct: 45,
            tags: &["diwali", "decorations", "festive"], region: mumbai() },
        Row { id: DRY_FRUIT_BOX, name: "Dry Fruit Gift Box", category: "gifting",
            subcategory: "dry-fruits", price: 950, stock: 25, margin_pct: 32,
            tags: &["diwali", "gifting", "festive"], region: delhi() },
        Row { id: BISCUITS, name: "Parle-G Biscuits Carton", category: "snacks",
            subcategory: "biscuits", price: 300, stock: 0, margin_pct: 10,
            tags: &["biscuits", "snacks"], region: mumbai() },
        Row { id: GHEE, name: "Amul Ghee 1L", category: "dairy",
            subcategory: "ghee", price: 650, stock: 70, margin_pct: 18,
            tags: &["ghee", "dairy", "festive"], region: pune },
    ];
    rows.into_iter().map(Row::build).collect()
}

pub fn profiles() -> Vec<BusinessProfile> {
    vec![
        profile(
            SHARMA_KIRANA,
            "Sharma Kirana Store",
            BusinessType::Kirana,
            mumbai(),
            at(2023, 4, 1, 0),
        ),
        profile(
            ABC_WHOLESALE,
            "ABC Wholesale Traders",
            BusinessType::Wholesale,
            delhi(),
            at(2022, 11, 15, 0),
        ),
        profile(
            PATEL_SUPERMARKET,
            "Patel Supermarket",
            BusinessType::Supermarket,
            Location::new("Pune", "Maharashtra"),
            at(2024, 1, 10, 0),
        ),
        profile(
            MEHTA_GENERAL,
            "Mehta General Store",
            BusinessType::Kirana,
            mumbai(),
            at(2024, 3, 5, 0),
        ),
    ]
}

fn deal(
    id: &str,
    title: &str,
    product_ids: &[ProductId],
    pct: i64,
    (starts_at, ends_at): (DateTime<Utc>, DateTime<Utc>),
    deal_type: DealType,
) -> Deal {
    Deal {
        id: id.to_string(),
        title: title.to_string(),
        product_ids: product_ids.to_vec(),
        discount_pct: Decimal::new(pct, 0),
        starts_at,
        ends_at,
        deal_type,
    }
}

pub fn deals() -> Vec<Deal> {
    vec![
        deal(
            "DIWALI24",
            "Diwali Dhamaka",
            &[KAJU_KATLI, DIYA_SET, DRY_FRUIT_BOX],
            20,
            (at(2024, 10, 1, 0), at(2024, 11, 5, 0)),
            DealType::Seasonal,
        ),
        deal(
            "DAL-BULK",
            "Bulk Dal Saver",
            &[TOOR_DAL],
            10,
            (at(2024, 10, 10, 0), at(2024, 10, 20, 0)),
            DealType::Bulk,
        ),
        deal(
            "CHAI-DAILY",
            "Chai Time",
            &[TEA],
            15,
            (at(2024, 10, 15, 0), at(2024, 10, 16, 0)),
            DealType::Daily,
        ),
        deal(
            "SUMMER24",
            "Summer Coolers",
            &[TEA],
            25,
            (at(2024, 4, 1, 0), at(2024, 6, 30, 0)),
            DealType::Seasonal,
        ),
    ]
}

fn line(
    user_id: UserId,
    product_id: ProductId,
    order: &str,
    quantity: u32,
    purchased_at: DateTime<Utc>,
) -> PurchaseRecord {
    PurchaseRecord { user_id, product_id, order_id: order.to_string(), quantity, purchased_at }
}

pub fn purchases() -> Vec<PurchaseRecord> {
    vec![
        line(SHARMA_KIRANA, BASMATI_RICE, "ORD001", 10, at(2024, 9, 25, 9)),
        line(SHARMA_KIRANA, TOOR_DAL, "ORD001", 5, at(2024, 9, 25, 9)),
        line(SHARMA_KIRANA, SUGAR, "ORD002", 4, at(2024, 10, 12, 11)),
        line(SHARMA_KIRANA, TOOR_DAL, "ORD002", 2, at(2024, 10, 12, 11)),
        line(SHARMA_KIRANA, MUSTARD_OIL, "ORD003", 6, at(2024, 8, 20, 15)),
        line(MEHTA_GENERAL, KAJU_KATLI, "ORD004", 12, at(2024, 10, 13, 10)),
        line(MEHTA_GENERAL, DIYA_SET, "ORD004", 30, at(2024, 10, 13, 10)),
        line(ABC_WHOLESALE, WHEAT_ATTA, "ORD005", 50, at(2024, 10, 10, 8)),
        line(ABC_WHOLESALE, MUSTARD_OIL, "ORD005", 40, at(2024, 10, 10, 8)),
        line(PATEL_SUPERMARKET, TEA, "ORD006", 20, at(2024, 10, 11, 12)),
        line(PATEL_SUPERMARKET, GHEE, "ORD006", 10, at(2024, 10, 11, 12)),
        line(MEHTA_GENERAL, BASMATI_RICE, "ORD007", 3, at(2024, 10, 14, 16)),
        line(MEHTA_GENERAL, TOOR_DAL, "ORD007", 6, at(2024, 10, 14, 16)),
    ]
}

pub fn snapshot() -> SignalSnapshot {
    SignalSnapshot {
        profiles: profiles(),
        products: products(),
        purchases: purchases(),
        deals: deals(),
    }
}
