use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Sqlite};

use dukaan_core::domain::deal::{Deal, DealType};
use dukaan_core::domain::product::{Product, ProductId};
use dukaan_core::domain::profile::{BusinessProfile, BusinessType, Location, UserId};
use dukaan_core::domain::purchase::PurchaseRecord;
use dukaan_core::signals::{ProductFilter, PurchaseQuery, SignalStore, SignalStoreError};

use super::{column, parse_decimal, parse_id, parse_timestamp, timestamp, RepositoryError};
use crate::DbPool;

const PRODUCT_SELECT: &str = "SELECT id, name, category, subcategory, price, stock, margin,
        tags_json, region_city, region_state, active, created_at
     FROM products WHERE 1 = 1";

const PURCHASE_SELECT: &str =
    "SELECT p.user_id, p.product_id, p.order_id, p.quantity, p.purchased_at
     FROM purchases p LEFT JOIN business_profiles b ON b.id = p.user_id
     WHERE 1 = 1";

/// Signal store over the marketplace tables. Read only: the marketplace
/// application owns the rows.
pub struct SqlSignalStore {
    pool: DbPool,
}

impl SqlSignalStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Ids beyond `i64::MAX` cannot be stored, so they bind to a value no row has.
fn sql_id(id: u64) -> i64 {
    i64::try_from(id).unwrap_or(-1)
}

fn row_to_profile(row: &SqliteRow) -> Result<BusinessProfile, RepositoryError> {
    let business_type: String = column(row, "business_type")?;
    let registered_at: String = column(row, "registered_at")?;

    Ok(BusinessProfile {
        id: UserId(parse_id(column(row, "id")?, "id")?),
        business_name: column(row, "business_name")?,
        business_type: BusinessType::from_str(&business_type)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        location: Location::new(column::<String>(row, "city")?, column::<String>(row, "state")?),
        registered_at: parse_timestamp(&registered_at, "registered_at")?,
    })
}

fn row_to_product(row: &SqliteRow) -> Result<Product, RepositoryError> {
    let price: String = column(row, "price")?;
    let margin: String = column(row, "margin")?;
    let tags_json: String = column(row, "tags_json")?;
    let created_at: String = column(row, "created_at")?;
    let active: i64 = column(row, "active")?;

    Ok(Product {
        id: ProductId(parse_id(column(row, "id")?, "id")?),
        name: column(row, "name")?,
        category: column(row, "category")?,
        subcategory: column(row, "subcategory")?,
        price: parse_decimal(&price, "price")?,
        stock: column(row, "stock")?,
        margin: parse_decimal(&margin, "margin")?,
        tags: serde_json::from_str(&tags_json)
            .map_err(|e| RepositoryError::Decode(format!("tags_json: {e}")))?,
        region: Location::new(
            column::<String>(row, "region_city")?,
            column::<String>(row, "region_state")?,
        ),
        active: active != 0,
        created_at: parse_timestamp(&created_at, "created_at")?,
    })
}

fn row_to_purchase(row: &SqliteRow) -> Result<PurchaseRecord, RepositoryError> {
    let quantity: i64 = column(row, "quantity")?;
    let purchased_at: String = column(row, "purchased_at")?;

    Ok(PurchaseRecord {
        user_id: UserId(parse_id(column(row, "user_id")?, "user_id")?),
        product_id: ProductId(parse_id(column(row, "product_id")?, "product_id")?),
        order_id: column(row, "order_id")?,
        quantity: u32::try_from(quantity)
            .map_err(|_| RepositoryError::Decode(format!("quantity `{quantity}`")))?,
        purchased_at: parse_timestamp(&purchased_at, "purchased_at")?,
    })
}

fn push_in_list<T>(query: &mut QueryBuilder<'_, Sqlite>, column: &str, values: Vec<T>)
where
    T: for<'q> sqlx::Encode<'q, Sqlite> + sqlx::Type<Sqlite> + Send + 'static,
{
    query.push(format!(" AND {column} IN ("));
    let mut separated = query.separated(", ");
    for value in values {
        separated.push_bind(value);
    }
    separated.push_unseparated(")");
}

impl SqlSignalStore {
    async fn fetch_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<Vec<Product>, RepositoryError> {
        let empty_set = filter.ids.as_ref().is_some_and(Vec::is_empty)
            || filter.categories.as_ref().is_some_and(Vec::is_empty);
        if empty_set {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(PRODUCT_SELECT);
        if let Some(ids) = &filter.ids {
            push_in_list(&mut query, "id", ids.iter().map(|id| sql_id(id.0)).collect());
        }
        if let Some(categories) = &filter.categories {
            let lowered = categories.iter().map(|category| category.to_lowercase()).collect();
            push_in_list::<String>(&mut query, "lower(category)", lowered);
        }
        if filter.in_stock_only {
            query.push(" AND active = 1 AND stock > 0");
        }
        query.push(" ORDER BY id");

        let rows = query.build().fetch_all(&self.pool).await?;
        let mut products = Vec::with_capacity(rows.len());
        for row in &rows {
            // Tags, text and price predicates run in process with the same
            // semantics as every other adapter.
            let product = row_to_product(row)?;
            if filter.matches(&product) {
                products.push(product);
            }
        }
        Ok(products)
    }

    async fn fetch_purchases(
        &self,
        purchase_query: &PurchaseQuery,
    ) -> Result<Vec<PurchaseRecord>, RepositoryError> {
        let empty_set = purchase_query.product_ids.as_ref().is_some_and(Vec::is_empty)
            || purchase_query.order_ids.as_ref().is_some_and(Vec::is_empty);
        if empty_set {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(PURCHASE_SELECT);
        if let Some(user_id) = purchase_query.user_id {
            query.push(" AND p.user_id = ").push_bind(sql_id(user_id.0));
        }
        if let Some(city) = &purchase_query.city {
            query.push(" AND lower(b.city) = ").push_bind(city.to_lowercase());
        }
        if let Some(product_ids) = &purchase_query.product_ids {
            let ids = product_ids.iter().map(|id| sql_id(id.0)).collect();
            push_in_list::<i64>(&mut query, "p.product_id", ids);
        }
        if let Some(order_ids) = &purchase_query.order_ids {
            push_in_list::<String>(&mut query, "p.order_id", order_ids.clone());
        }
        if let Some(since) = purchase_query.since {
            query.push(" AND p.purchased_at >= ").push_bind(timestamp(since));
        }
        query.push(" ORDER BY p.id");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_purchase).collect()
    }

    async fn fetch_active_deals(&self, at: DateTime<Utc>) -> Result<Vec<Deal>, RepositoryError> {
        let at = timestamp(at);
        let rows = sqlx::query(
            "SELECT id, title, discount_pct, starts_at, ends_at, deal_type
             FROM deals WHERE starts_at <= ?1 AND ends_at > ?1
             ORDER BY starts_at, id",
        )
        .bind(&at)
        .fetch_all(&self.pool)
        .await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut deals = Vec::with_capacity(rows.len());
        for row in &rows {
            let discount_pct: String = column(row, "discount_pct")?;
            let starts_at: String = column(row, "starts_at")?;
            let ends_at: String = column(row, "ends_at")?;
            let deal_type: String = column(row, "deal_type")?;
            deals.push(Deal {
                id: column(row, "id")?,
                title: column(row, "title")?,
                product_ids: Vec::new(),
                discount_pct: parse_decimal(&discount_pct, "discount_pct")?,
                starts_at: parse_timestamp(&starts_at, "starts_at")?,
                ends_at: parse_timestamp(&ends_at, "ends_at")?,
                deal_type: DealType::from_str(&deal_type)
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?,
            });
        }

        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT deal_id, product_id FROM deal_products WHERE 1 = 1",
        );
        push_in_list::<String>(&mut query, "deal_id", deals.iter().map(|d| d.id.clone()).collect());
        query.push(" ORDER BY deal_id, product_id");

        let mut products: HashMap<String, Vec<ProductId>> = HashMap::new();
        for row in query.build().fetch_all(&self.pool).await? {
            let deal_id: String = column(&row, "deal_id")?;
            let product_id = ProductId(parse_id(column(&row, "product_id")?, "product_id")?);
            products.entry(deal_id).or_default().push(product_id);
        }
        for deal in &mut deals {
            deal.product_ids = products.remove(&deal.id).unwrap_or_default();
        }
        Ok(deals)
    }
}

#[async_trait::async_trait]
impl SignalStore for SqlSignalStore {
    async fn business_profile(
        &self,
        user_id: UserId,
    ) -> Result<Option<BusinessProfile>, SignalStoreError> {
        let row = sqlx::query(
            "SELECT id, business_name, business_type, city, state, registered_at
             FROM business_profiles WHERE id = ?",
        )
        .bind(sql_id(user_id.0))
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(row.as_ref().map(row_to_profile).transpose()?)
    }

    async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>, SignalStoreError> {
        Ok(self.fetch_products(filter).await?)
    }

    async fn purchases(
        &self,
        query: &PurchaseQuery,
    ) -> Result<Vec<PurchaseRecord>, SignalStoreError> {
        Ok(self.fetch_purchases(query).await?)
    }

    async fn active_deals(&self, at: DateTime<Utc>) -> Result<Vec<Deal>, SignalStoreError> {
        Ok(self.fetch_active_deals(at).await?)
    }
}
