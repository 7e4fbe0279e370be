use chrono::{DateTime, Utc};
use dukaan_core::config::LoadOptions;
use dukaan_core::domain::product::ProductId;
use dukaan_core::domain::profile::UserId;
use dukaan_core::recommendations::SearchFilters;

use crate::commands::engine::run_request;
use crate::commands::CommandResult;

pub fn homepage(options: &LoadOptions, user_id: u64, at: Option<DateTime<Utc>>) -> CommandResult {
    run_request("homepage", options, at, move |engine, now| async move {
        let page = engine.service.get_homepage(UserId(user_id), now).await?;
        let message = format!(
            "homepage for user {user_id}: {} recommendations, {} deals, {} trending, \
             {} low-stock alerts",
            page.recommendations.len(),
            page.deals.len(),
            page.trending.len(),
            page.low_stock_alerts.len()
        );
        Ok((message, page))
    })
}

pub fn suggest(
    options: &LoadOptions,
    user_id: u64,
    product_id: u64,
    at: Option<DateTime<Utc>>,
) -> CommandResult {
    run_request("suggest", options, at, move |engine, now| async move {
        let suggestions = engine
            .service
            .get_product_suggestions(UserId(user_id), ProductId(product_id), now)
            .await?;
        let message = format!("{} suggestions for product {product_id}", suggestions.len());
        Ok((message, suggestions))
    })
}

pub fn search(
    options: &LoadOptions,
    query: String,
    filters: SearchFilters,
    user_id: u64,
    at: Option<DateTime<Utc>>,
) -> CommandResult {
    run_request("search", options, at, move |engine, now| async move {
        let results = engine.service.search(&query, &filters, UserId(user_id), now).await?;
        let message = format!("{} results for `{query}`", results.len());
        Ok((message, results))
    })
}
