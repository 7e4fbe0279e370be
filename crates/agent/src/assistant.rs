use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use dukaan_core::config::AssistantConfig;
use dukaan_core::domain::profile::UserId;
use dukaan_core::errors::EngineError;
use dukaan_core::recommendations::{BuyerContext, Recommender};
use dukaan_core::scoring::{ScoredCandidate, ScoringContext, ScoringEngine};
use dukaan_core::signals::SignalStore;

use crate::intent::{AssistantIntent, IntentClassifier};
use crate::render::{follow_ups, RenderContext, ResponseRenderer};
use crate::strategy::{Resolution, Strategy};
use crate::AssistantError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssistantResponse {
    pub intent: AssistantIntent,
    pub message: String,
    pub products: Vec<ScoredCandidate>,
    pub follow_ups: Vec<String>,
    /// Season the answer was built for, set for seasonal answers only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
}

/// Rule-based assistant over the signal store and scoring engine. Answers
/// are computed per request and never cached.
pub struct Assistant {
    recommender: Recommender,
    config: AssistantConfig,
    classifier: IntentClassifier,
    renderer: ResponseRenderer,
}

impl Assistant {
    pub fn new(
        signals: Arc<dyn SignalStore>,
        engine: Arc<ScoringEngine>,
        config: AssistantConfig,
    ) -> Result<Self, AssistantError> {
        Self::with_recommender(Recommender::new(signals, engine), config)
    }

    pub fn with_recommender(
        recommender: Recommender,
        config: AssistantConfig,
    ) -> Result<Self, AssistantError> {
        Ok(Self {
            classifier: IntentClassifier::new(&config.keywords),
            renderer: ResponseRenderer::new()?,
            recommender,
            config,
        })
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    pub async fn resolve_assistant_query(
        &self,
        user_id: UserId,
        query_text: &str,
        now: DateTime<Utc>,
    ) -> Result<AssistantResponse, EngineError> {
        info!(
            event_name = "assistant.received",
            user_id = %user_id,
            query_len = query_text.len(),
            "assistant query received"
        );

        let classification = self.classifier.classify(query_text);
        let strategy = Strategy::for_classification(&classification, &self.config, now);
        info!(
            event_name = "assistant.classified",
            user_id = %user_id,
            intent = %classification.intent,
            keyword = classification.matched_keyword.as_deref().unwrap_or(""),
            "assistant query classified"
        );

        let buyer = if strategy.reads_signals() {
            self.recommender.buyer_context(user_id, now).await?
        } else {
            unknown_buyer(now)
        };
        let resolution = strategy.resolve(&self.recommender, &self.config, &buyer, now).await?;
        info!(
            event_name = "assistant.resolved",
            user_id = %user_id,
            intent = %strategy.intent(),
            products = resolution.products.len(),
            season = resolution.season.as_deref().unwrap_or(""),
            "assistant query resolved"
        );

        let message = self.render(strategy.intent(), &buyer, &resolution);
        info!(
            event_name = "assistant.rendered",
            user_id = %user_id,
            intent = %strategy.intent(),
            message_len = message.len(),
            "assistant response rendered"
        );

        Ok(AssistantResponse {
            intent: strategy.intent(),
            message,
            follow_ups: follow_ups(strategy.intent(), resolution.season.as_deref()),
            products: resolution.products,
            season: resolution.season,
        })
    }

    fn render(
        &self,
        intent: AssistantIntent,
        buyer: &BuyerContext,
        resolution: &Resolution,
    ) -> String {
        let context = RenderContext::new(
            buyer.scoring.profile.as_ref(),
            resolution,
            self.config.min_margin,
            self.config.trend_window_days,
        );
        match self.renderer.render(intent, &context) {
            Ok(message) => message,
            Err(error) => {
                warn!(
                    event_name = "assistant.render.failed",
                    intent = %intent,
                    error = %error,
                    "falling back to a plain response"
                );
                let names: Vec<&str> =
                    resolution.products.iter().map(|c| c.product.name.as_str()).collect();
                format!("Suggested products: {}", names.join(", "))
            }
        }
    }
}

fn unknown_buyer(now: DateTime<Utc>) -> BuyerContext {
    BuyerContext {
        scoring: ScoringContext::anonymous(Vec::new(), now),
        purchases: Vec::new(),
        purchased: Vec::new(),
    }
}
