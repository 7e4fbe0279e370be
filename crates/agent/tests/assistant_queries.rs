use std::sync::Arc;

use dukaan_agent::{Assistant, AssistantIntent};
use dukaan_core::config::AssistantConfig;
use dukaan_core::domain::product::ProductId;
use dukaan_core::domain::profile::UserId;
use dukaan_core::errors::EngineError;
use dukaan_core::scoring::ScoringEngine;
use dukaan_core::signals::sample::{
    self, BISCUITS, DIYA_SET, DRY_FRUIT_BOX, KAJU_KATLI, SHARMA_KIRANA, TEA, TOOR_DAL, WHEAT_ATTA,
};
use dukaan_core::signals::InMemorySignalStore;

fn assistant() -> (Arc<InMemorySignalStore>, Assistant) {
    let store = Arc::new(InMemorySignalStore::from_snapshot(sample::snapshot()));
    let assistant = Assistant::new(
        store.clone(),
        Arc::new(ScoringEngine::default()),
        AssistantConfig::default(),
    )
    .expect("assistant");
    (store, assistant)
}

fn now() -> chrono::DateTime<chrono::Utc> {
    sample::reference_time()
}

fn ids(response: &dukaan_agent::AssistantResponse) -> Vec<ProductId> {
    response.products.iter().map(|candidate| candidate.product.id).collect()
}

#[tokio::test]
async fn diwali_query_returns_only_diwali_stock() {
    let (_, assistant) = assistant();
    let response = assistant
        .resolve_assistant_query(
            SHARMA_KIRANA,
            "What should I stock for Diwali season?",
            sample::reference_time(),
        )
        .await
        .expect("resolve");

    assert_eq!(response.intent, AssistantIntent::SeasonalStock);
    assert_eq!(response.season.as_deref(), Some("diwali"));
    assert!(!response.products.is_empty());
    assert!(response.products.len() <= 5);
    for candidate in &response.products {
        assert!(
            ["sweets", "decorations", "gifting"].iter().any(|tag| candidate.product.has_tag(tag)),
            "{} carries no Diwali tag",
            candidate.product.name
        );
        assert!(candidate.product.is_available());
    }
    assert!(response.message.starts_with("For Diwali season"));
    assert!(response.message.contains("kirana business in Mumbai"));
    assert_eq!(response.follow_ups[0], "Should I focus more on gifts or food items?");
}

#[tokio::test]
async fn named_season_uses_its_own_tags() {
    let (_, assistant) = assistant();
    let response = assistant
        .resolve_assistant_query(SHARMA_KIRANA, "what sells in winter", sample::reference_time())
        .await
        .expect("resolve");

    assert_eq!(response.season.as_deref(), Some("winter"));
    assert!(ids(&response).contains(&TEA));
    for candidate in &response.products {
        assert!(["ghee", "tea", "dry-fruits"].iter().any(|tag| candidate.product.has_tag(tag)));
    }
    assert!(response.follow_ups[0].contains("winter"));
}

#[tokio::test]
async fn gibberish_falls_back_to_examples() {
    let (_, assistant) = assistant();
    let response = assistant
        .resolve_assistant_query(SHARMA_KIRANA, "asdf1234", sample::reference_time())
        .await
        .expect("resolve");

    assert_eq!(response.intent, AssistantIntent::Fallback);
    assert!(response.products.is_empty());
    assert!(!response.follow_ups.is_empty());
    assert!(response.message.contains("\"What should I stock for Diwali season?\""));
}

#[tokio::test]
async fn fallback_answers_even_when_the_store_is_down() {
    let (store, assistant) = assistant();
    store.set_unavailable(true);

    let response = assistant
        .resolve_assistant_query(SHARMA_KIRANA, "hello", sample::reference_time())
        .await
        .expect("fallback never reads signals");
    assert_eq!(response.intent, AssistantIntent::Fallback);
    assert_eq!(store.read_count(), 0);
}

#[tokio::test]
async fn margin_answer_is_sorted_by_margin() {
    let (_, assistant) = assistant();
    let response = assistant
        .resolve_assistant_query(
            SHARMA_KIRANA,
            "Which products have the best profit margins?",
            sample::reference_time(),
        )
        .await
        .expect("resolve");

    assert_eq!(response.intent, AssistantIntent::MarginOptimization);
    assert_eq!(ids(&response), vec![DIYA_SET, KAJU_KATLI, DRY_FRUIT_BOX, TEA]);
    assert_eq!(response.products[0].reasons[0], "45% margin");
    assert!(response.message.contains("25%+ margins"));
}

#[tokio::test]
async fn shopping_list_reorders_what_the_buyer_already_buys() {
    let (_, assistant) = assistant();
    let response = assistant
        .resolve_assistant_query(SHARMA_KIRANA, "Make me a shopping list", now())
        .await
        .expect("resolve");

    assert_eq!(response.intent, AssistantIntent::ShoppingList);
    assert_eq!(response.products.len(), 4);
    let dal = response
        .products
        .iter()
        .find(|candidate| candidate.product.id == TOOR_DAL)
        .expect("dal is on the list");
    assert_eq!(dal.reasons[0], "Bought in 2 orders, last on 2024-10-12");
    assert!(response.message.contains("Sharma Kirana Store"));
}

#[tokio::test]
async fn cold_start_shopping_list_uses_the_catalog() {
    let (_, assistant) = assistant();
    let response = assistant
        .resolve_assistant_query(UserId(999), "shopping list please", sample::reference_time())
        .await
        .expect("resolve");

    assert_eq!(response.products.len(), 8);
    assert!(!ids(&response).contains(&BISCUITS));
}

#[tokio::test]
async fn trend_answer_follows_local_velocity() {
    let (_, assistant) = assistant();
    let response = assistant
        .resolve_assistant_query(SHARMA_KIRANA, "What is trending in my area?", now())
        .await
        .expect("resolve");

    assert_eq!(response.intent, AssistantIntent::TrendQuery);
    assert_eq!(ids(&response).first(), Some(&DIYA_SET));
    assert_eq!(response.products[0].reasons[0], "30 units sold in Mumbai over the last 7 days");
    assert!(response.message.starts_with("Trending in Mumbai"));
}

#[tokio::test]
async fn trend_answer_for_unknown_user_is_marketplace_wide() {
    let (_, assistant) = assistant();
    let response = assistant
        .resolve_assistant_query(UserId(999), "top sellers", sample::reference_time())
        .await
        .expect("resolve");

    assert_eq!(ids(&response).first(), Some(&WHEAT_ATTA));
    assert!(response.message.starts_with("Trending in the marketplace"));
}

#[tokio::test]
async fn unavailable_store_fails_resolution() {
    let (store, assistant) = assistant();
    store.set_unavailable(true);

    let error = assistant
        .resolve_assistant_query(
            SHARMA_KIRANA,
            "What should I stock for Diwali season?",
            sample::reference_time(),
        )
        .await
        .expect_err("store offline");
    assert!(matches!(error, EngineError::DataUnavailable(_)));
    assert!(error.is_recoverable());
}
