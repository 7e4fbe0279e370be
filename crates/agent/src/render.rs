use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use tera::{Context, Tera};

use dukaan_core::domain::profile::BusinessProfile;
use dukaan_core::scoring::ScoredCandidate;

use crate::intent::AssistantIntent;
use crate::strategy::{margin_percent, Resolution};
use crate::AssistantError;

const TEMPLATES: [(AssistantIntent, &str, &str); 5] = [
    (
        AssistantIntent::SeasonalStock,
        "seasonal_stock.txt.tera",
        include_str!("../../../templates/assistant/seasonal_stock.txt.tera"),
    ),
    (
        AssistantIntent::MarginOptimization,
        "margin_optimization.txt.tera",
        include_str!("../../../templates/assistant/margin_optimization.txt.tera"),
    ),
    (
        AssistantIntent::ShoppingList,
        "shopping_list.txt.tera",
        include_str!("../../../templates/assistant/shopping_list.txt.tera"),
    ),
    (
        AssistantIntent::TrendQuery,
        "trend_query.txt.tera",
        include_str!("../../../templates/assistant/trend_query.txt.tera"),
    ),
    (
        AssistantIntent::Fallback,
        "fallback.txt.tera",
        include_str!("../../../templates/assistant/fallback.txt.tera"),
    ),
];

pub const EXAMPLE_QUERIES: [&str; 4] = [
    "What should I stock for Diwali season?",
    "Which products give me the best margins?",
    "Make me a shopping list for this week",
    "What is trending in my area?",
];

/// Everything a response template can refer to.
#[derive(Clone, Debug, Serialize)]
pub struct RenderContext {
    pub business_name: String,
    pub business_type: String,
    pub city: String,
    pub season: String,
    pub area: String,
    pub product_count: usize,
    pub products: Vec<ProductLine>,
    pub min_margin_pct: Decimal,
    pub trend_window_days: u32,
    pub examples: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ProductLine {
    pub name: String,
    pub price: Decimal,
    pub margin_pct: Decimal,
    /// Strongest reason, empty when the candidate carries none.
    pub reason: String,
}

impl ProductLine {
    fn from_candidate(candidate: &ScoredCandidate) -> Self {
        Self {
            name: candidate.product.name.clone(),
            price: candidate.product.price,
            margin_pct: margin_percent(candidate.product.margin),
            reason: candidate.reasons.first().cloned().unwrap_or_default(),
        }
    }
}

impl RenderContext {
    pub fn new(
        profile: Option<&BusinessProfile>,
        resolution: &Resolution,
        min_margin: f64,
        trend_window_days: u32,
    ) -> Self {
        let city = profile.map_or("your area", |profile| profile.location.city.as_str());
        Self {
            business_name: profile
                .map_or("your store", |profile| profile.business_name.as_str())
                .to_string(),
            business_type: profile
                .map_or("retail", |profile| profile.business_type.as_str())
                .to_string(),
            city: city.to_string(),
            season: resolution.season.clone().unwrap_or_else(|| "current".to_string()),
            area: resolution.trend_city.clone().unwrap_or_else(|| "the marketplace".to_string()),
            product_count: resolution.products.len(),
            products: resolution.products.iter().map(ProductLine::from_candidate).collect(),
            min_margin_pct: Decimal::try_from(min_margin * 100.0)
                .map(|pct| pct.round_dp(1).normalize())
                .unwrap_or_default(),
            trend_window_days,
            examples: EXAMPLE_QUERIES.iter().map(|example| example.to_string()).collect(),
        }
    }
}

/// One embedded tera template per intent.
pub struct ResponseRenderer {
    tera: Tera,
}

impl ResponseRenderer {
    pub fn new() -> Result<Self, AssistantError> {
        let mut tera = Tera::default();
        tera.register_filter("rupees", rupees_filter);
        for (_, name, source) in TEMPLATES {
            tera.add_raw_template(name, source)
                .map_err(|error| AssistantError::Template(error.to_string()))?;
        }
        Ok(Self { tera })
    }

    pub fn render(
        &self,
        intent: AssistantIntent,
        context: &RenderContext,
    ) -> Result<String, AssistantError> {
        let context = Context::from_serialize(context)
            .map_err(|error| AssistantError::Template(error.to_string()))?;
        self.tera
            .render(template_name(intent), &context)
            .map(|message| message.trim().to_string())
            .map_err(|error| AssistantError::Template(error.to_string()))
    }
}

fn template_name(intent: AssistantIntent) -> &'static str {
    TEMPLATES
        .iter()
        .find(|(candidate, _, _)| *candidate == intent)
        .map_or("fallback.txt.tera", |(_, name, _)| name)
}

/// Formats a price as rupees with two decimals. Accepts numbers and the
/// string form `Decimal` serializes to.
fn rupees_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let amount = match value {
        tera::Value::Number(number) => number.as_f64().unwrap_or(0.0),
        tera::Value::String(text) => text
            .parse::<f64>()
            .map_err(|_| tera::Error::msg(format!("rupees filter got a non-numeric `{text}`")))?,
        tera::Value::Null => 0.0,
        _ => return Err(tera::Error::msg("rupees filter expects a number")),
    };
    Ok(tera::Value::String(format!("₹{amount:.2}")))
}

/// Follow-up questions offered with each kind of answer.
pub fn follow_ups(intent: AssistantIntent, season: Option<&str>) -> Vec<String> {
    match intent {
        AssistantIntent::SeasonalStock if season == Some("diwali") => vec![
            "Should I focus more on gifts or food items?".to_string(),
            "What's the ideal inventory quantity for these?".to_string(),
            "Any specific brands that sell better during Diwali?".to_string(),
        ],
        AssistantIntent::SeasonalStock => vec![
            format!(
                "What are the best {} products for my business type?",
                season.unwrap_or("seasonal")
            ),
            "What's the ideal inventory quantity for these?".to_string(),
            "Any upcoming seasonal promotions?".to_string(),
        ],
        AssistantIntent::MarginOptimization => vec![
            "What's the demand for these in my area?".to_string(),
            "Can you suggest bundle offers for these?".to_string(),
            "What's the optimal pricing strategy?".to_string(),
        ],
        AssistantIntent::ShoppingList => vec![
            "Should I add any seasonal items?".to_string(),
            "What quantities do you recommend?".to_string(),
            "Any bulk purchase discounts available?".to_string(),
        ],
        AssistantIntent::TrendQuery => vec![
            "Which of these work best for my business size?".to_string(),
            "What's the competition like for these products?".to_string(),
            "Any emerging trends I should watch?".to_string(),
        ],
        AssistantIntent::Fallback => vec![
            "What should I stock for the upcoming season?".to_string(),
            "Which products have the best profit margins?".to_string(),
            "What are the trending items in my area?".to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rust_decimal::Decimal;

    use super::{follow_ups, rupees_filter, ProductLine, RenderContext, ResponseRenderer};
    use crate::intent::AssistantIntent;

    fn context(season: &str, products: Vec<ProductLine>) -> RenderContext {
        RenderContext {
            business_name: "Sharma Kirana Store".to_string(),
            business_type: "kirana".to_string(),
            city: "Mumbai".to_string(),
            season: season.to_string(),
            area: "Mumbai".to_string(),
            product_count: products.len(),
            products,
            min_margin_pct: Decimal::new(25, 0),
            trend_window_days: 7,
            examples: vec!["What is trending in my area?".to_string()],
        }
    }

    fn kaju_katli() -> ProductLine {
        ProductLine {
            name: "Haldiram Kaju Katli 500g".to_string(),
            price: Decimal::new(38000, 2),
            margin_pct: Decimal::new(35, 0),
            reason: "20% off with Diwali Dhamaka".to_string(),
        }
    }

    #[test]
    fn every_intent_has_a_template() {
        let renderer = ResponseRenderer::new().expect("templates parse");
        for intent in [
            AssistantIntent::SeasonalStock,
            AssistantIntent::MarginOptimization,
            AssistantIntent::ShoppingList,
            AssistantIntent::TrendQuery,
            AssistantIntent::Fallback,
        ] {
            let message = renderer.render(intent, &context("diwali", vec![kaju_katli()]));
            assert!(message.is_ok_and(|message| !message.is_empty()), "intent {intent}");
        }
    }

    #[test]
    fn diwali_message_names_business_and_lists_products() {
        let renderer = ResponseRenderer::new().expect("templates parse");
        let message = renderer
            .render(AssistantIntent::SeasonalStock, &context("diwali", vec![kaju_katli()]))
            .expect("render");

        assert!(message.starts_with("For Diwali season"));
        assert!(message.contains("kirana business in Mumbai"));
        assert!(message.contains("- Haldiram Kaju Katli 500g at ₹380.00 (20% off with Diwali"));
    }

    #[test]
    fn empty_margin_answer_mentions_the_floor() {
        let renderer = ResponseRenderer::new().expect("templates parse");
        let message = renderer
            .render(AssistantIntent::MarginOptimization, &context("current", Vec::new()))
            .expect("render");
        assert_eq!(message, "None of the products in stock right now reach a 25% margin.");
    }

    #[test]
    fn rupees_filter_formats_strings_and_numbers() {
        let args = HashMap::new();
        let from_string = rupees_filter(&tera::Value::String("450".to_string()), &args);
        assert_eq!(from_string.ok(), Some(tera::Value::String("₹450.00".to_string())));

        let from_number = rupees_filter(&serde_json::json!(12.5), &args);
        assert_eq!(from_number.ok(), Some(tera::Value::String("₹12.50".to_string())));

        assert!(rupees_filter(&tera::Value::Bool(true), &args).is_err());
    }

    #[test]
    fn diwali_follow_ups_differ_from_other_seasons() {
        let diwali = follow_ups(AssistantIntent::SeasonalStock, Some("diwali"));
        assert_eq!(diwali[0], "Should I focus more on gifts or food items?");

        let winter = follow_ups(AssistantIntent::SeasonalStock, Some("winter"));
        assert_eq!(winter[0], "What are the best winter products for my business type?");
    }
}
