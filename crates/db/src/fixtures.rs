use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const SEED_USER_IDS: &[i64] = &[1, 2, 3, 4];
const SEED_PRODUCT_IDS: &[i64] = &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];
const SEED_PURCHASE_IDS: &[i64] = &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13];
const SEED_DEAL_IDS: &[&str] = &["DIWALI24", "DAL-BULK", "CHAI-DAILY", "SUMMER24"];

/// Deal id and the products it covers, as written by the fixture.
const SEED_DEAL_PRODUCTS: &[(&str, &[i64])] =
    &[("DIWALI24", &[7, 8, 9]), ("DAL-BULK", &[3]), ("CHAI-DAILY", &[6]), ("SUMMER24", &[6])];

/// Demo marketplace: four buyers, eleven products (one out of stock), seven
/// orders and four deals (one expired). Matches
/// `dukaan_core::signals::sample` so SQL-backed runs can be compared against
/// the in-memory store.
pub struct SeedDataset;

impl SeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/seed_data.sql");

    /// Loads the dataset. Safe to run repeatedly: existing rows are kept.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult {
            profiles: SEED_USER_IDS.len(),
            products: SEED_PRODUCT_IDS.len(),
            purchases: SEED_PURCHASE_IDS.len(),
            deals: SEED_DEAL_IDS.len(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let profiles =
            count_in(pool, "business_profiles", "id", &sql_int_list(SEED_USER_IDS)).await?;
        checks.push(("business-profiles", profiles == SEED_USER_IDS.len() as i64));

        let products = count_in(pool, "products", "id", &sql_int_list(SEED_PRODUCT_IDS)).await?;
        checks.push(("products", products == SEED_PRODUCT_IDS.len() as i64));

        let purchases =
            count_in(pool, "purchases", "id", &sql_int_list(SEED_PURCHASE_IDS)).await?;
        checks.push(("purchases", purchases == SEED_PURCHASE_IDS.len() as i64));

        let deals = count_in(pool, "deals", "id", &sql_text_list(SEED_DEAL_IDS)).await?;
        checks.push(("deals", deals == SEED_DEAL_IDS.len() as i64));

        let mut deal_products_ok = true;
        for (deal_id, expected) in SEED_DEAL_PRODUCTS {
            let actual: Vec<i64> = sqlx::query_scalar(
                "SELECT product_id FROM deal_products WHERE deal_id = ?1 ORDER BY product_id",
            )
            .bind(deal_id)
            .fetch_all(pool)
            .await?;
            deal_products_ok &= actual == *expected;
        }
        checks.push(("deal-products", deal_products_ok));

        let out_of_stock: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE id = 10 AND stock = 0)")
                .fetch_one(pool)
                .await?;
        checks.push(("out-of-stock-product", out_of_stock == 1));

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes the seeded rows, children before parents.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let deals = sql_text_list(SEED_DEAL_IDS);
        let purchases = sql_int_list(SEED_PURCHASE_IDS);
        let products = sql_int_list(SEED_PRODUCT_IDS);
        let users = sql_int_list(SEED_USER_IDS);

        sqlx::query(&format!("DELETE FROM deal_products WHERE deal_id IN {deals}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM deals WHERE id IN {deals}")).execute(&mut *tx).await?;
        sqlx::query(&format!("DELETE FROM purchases WHERE id IN {purchases}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM products WHERE id IN {products}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM business_profiles WHERE id IN {users}"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

async fn count_in(
    pool: &DbPool,
    table: &str,
    key: &str,
    list: &str,
) -> Result<i64, RepositoryError> {
    let count = sqlx::query_scalar(&format!("SELECT COUNT(1) FROM {table} WHERE {key} IN {list}"))
        .fetch_one(pool)
        .await?;
    Ok(count)
}

fn sql_int_list(ids: &[i64]) -> String {
    let joined = ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
    format!("({joined})")
}

fn sql_text_list(ids: &[&str]) -> String {
    let quoted = ids.iter().map(|id| format!("'{id}'")).collect::<Vec<_>>().join(",");
    format!("({quoted})")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SeedResult {
    pub profiles: usize,
    pub products: usize,
    pub purchases: usize,
    pub deals: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
