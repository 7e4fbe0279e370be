use serde::{Deserialize, Serialize};

use dukaan_core::config::IntentKeywords;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistantIntent {
    SeasonalStock,
    MarginOptimization,
    ShoppingList,
    TrendQuery,
    Fallback,
}

impl AssistantIntent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SeasonalStock => "seasonal_stock",
            Self::MarginOptimization => "margin_optimization",
            Self::ShoppingList => "shopping_list",
            Self::TrendQuery => "trend_query",
            Self::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for AssistantIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntentRule {
    pub intent: AssistantIntent,
    pub keywords: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classification {
    pub intent: AssistantIntent,
    /// The keyword that selected the intent, `None` for the fallback.
    pub matched_keyword: Option<String>,
    pub normalized_query: String,
}

/// Ordered keyword rules; the first rule with a matching keyword wins.
#[derive(Clone, Debug)]
pub struct IntentClassifier {
    rules: Vec<IntentRule>,
}

impl IntentClassifier {
    pub fn new(keywords: &IntentKeywords) -> Self {
        let rule = |intent, words: &[String]| IntentRule {
            intent,
            keywords: words.iter().map(|word| normalize_text(word)).collect(),
        };

        Self {
            rules: vec![
                rule(AssistantIntent::SeasonalStock, &keywords.seasonal_stock),
                rule(AssistantIntent::MarginOptimization, &keywords.margin_optimization),
                rule(AssistantIntent::ShoppingList, &keywords.shopping_list),
                rule(AssistantIntent::TrendQuery, &keywords.trend_query),
            ],
        }
    }

    pub fn rules(&self) -> &[IntentRule] {
        &self.rules
    }

    /// Total: every input classifies, unmatched text falls back.
    pub fn classify(&self, text: &str) -> Classification {
        let normalized_query = normalize_text(text);

        for rule in &self.rules {
            let matched = rule
                .keywords
                .iter()
                .find(|keyword| !keyword.is_empty() && normalized_query.contains(keyword.as_str()));
            if let Some(keyword) = matched {
                return Classification {
                    intent: rule.intent,
                    matched_keyword: Some(keyword.clone()),
                    normalized_query,
                };
            }
        }

        Classification {
            intent: AssistantIntent::Fallback,
            matched_keyword: None,
            normalized_query,
        }
    }
}

/// Lowercased with runs of whitespace collapsed to one space.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().map(str::to_lowercase).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use dukaan_core::config::AssistantConfig;

    use super::{normalize_text, AssistantIntent, IntentClassifier};

    fn classifier() -> IntentClassifier {
        IntentClassifier::new(&AssistantConfig::default().keywords)
    }

    #[test]
    fn seasonal_rule_outranks_shopping_list_keywords() {
        let classification = classifier().classify("What should I stock for Diwali season?");
        assert_eq!(classification.intent, AssistantIntent::SeasonalStock);
        assert_eq!(classification.matched_keyword.as_deref(), Some("diwali"));
    }

    #[test]
    fn handles_common_phrases() {
        let cases = [
            ("Which items give the best PROFIT?", AssistantIntent::MarginOptimization),
            ("show me high-margin products", AssistantIntent::MarginOptimization),
            ("make me a shopping list", AssistantIntent::ShoppingList),
            ("what do I need to order this week", AssistantIntent::ShoppingList),
            ("how is my inventory looking", AssistantIntent::ShoppingList),
            ("what is trending near me", AssistantIntent::TrendQuery),
            ("top sellers in Mumbai", AssistantIntent::TrendQuery),
            ("what sells in winter", AssistantIntent::SeasonalStock),
            ("festive   offers", AssistantIntent::SeasonalStock),
            ("hello there", AssistantIntent::Fallback),
        ];

        let classifier = classifier();
        for (query, expected) in cases {
            assert_eq!(classifier.classify(query).intent, expected, "query: {query}");
        }
    }

    #[test]
    fn unmatched_text_falls_back() {
        let classification = classifier().classify("asdf1234");
        assert_eq!(classification.intent, AssistantIntent::Fallback);
        assert_eq!(classification.matched_keyword, None);

        assert_eq!(classifier().classify("").intent, AssistantIntent::Fallback);
    }

    #[test]
    fn normalization_lowercases_and_collapses_whitespace() {
        assert_eq!(normalize_text("  Shopping \t LIST\nplease "), "shopping list please");
    }
}
