//! Scoring algorithms for (buyer, product) relevance

use crate::domain::deal::Deal;
use crate::domain::product::Product;
use crate::domain::profile::BusinessType;

use super::types::*;

/// Stateless scorer; every constant comes from [`ScoringConfig`].
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score one product for the buyer described by `context`.
    pub fn score(&self, product: &Product, context: &ScoringContext) -> ScoredCandidate {
        let deal = best_deal(product, &context.deals);
        let components = ComponentScores {
            affinity: self.affinity_score(product, context),
            proximity: self.proximity_score(product, context),
            purchase: self.purchase_score(product, context),
            deal: self.deal_score(deal),
        };

        ScoredCandidate {
            product: product.clone(),
            score: self.calculate_total_score(&components),
            reasons: self.generate_reasoning(&components, product, context, deal),
            components,
        }
    }

    /// Score every available product; unavailable ones never reach scoring.
    pub fn score_candidates<'a>(
        &self,
        products: impl IntoIterator<Item = &'a Product>,
        context: &ScoringContext,
    ) -> Vec<ScoredCandidate> {
        products
            .into_iter()
            .filter(|product| product.is_available())
            .map(|product| self.score(product, context))
            .collect()
    }

    /// Weighted sum normalized by the weight total, so the result stays in `[0, 1]`.
    pub fn calculate_total_score(&self, components: &ComponentScores) -> f64 {
        let weights = &self.config.weights;
        let sum = weights.sum();
        if sum <= 0.0 {
            return 0.0;
        }

        let total = components.affinity * weights.affinity
            + components.proximity * weights.proximity
            + components.purchase * weights.purchase
            + components.deal * weights.deal;

        (total / sum).clamp(0.0, 1.0)
    }

    pub fn affinity_score(&self, product: &Product, context: &ScoringContext) -> f64 {
        let Some(profile) = &context.profile else {
            return self.config.affinity_baseline;
        };

        if self.is_favored(profile.business_type, &product.category) {
            1.0
        } else {
            self.config.affinity_baseline
        }
    }

    pub fn proximity_score(&self, product: &Product, context: &ScoringContext) -> f64 {
        let Some(profile) = &context.profile else {
            return self.config.proximity_floor;
        };

        if product.region.same_city(&profile.location) {
            self.config.same_city
        } else if product.region.same_state(&profile.location) {
            self.config.same_state
        } else {
            self.config.proximity_floor
        }
    }

    /// Recency and frequency of the buyer's purchases in the product category.
    ///
    /// Related categories count at `related_category_factor`. A buyer with no
    /// history at all gets the neutral cold-start value.
    pub fn purchase_score(&self, product: &Product, context: &ScoringContext) -> f64 {
        if context.history.is_empty() {
            return self.config.cold_start_purchase;
        }

        let direct = context
            .history
            .get(&product.category)
            .map(|stats| self.category_signal(stats, context))
            .unwrap_or(0.0);

        let related = self
            .config
            .related_categories
            .get(&product.category.to_ascii_lowercase())
            .into_iter()
            .flatten()
            .filter_map(|category| context.history.get(category))
            .map(|stats| self.category_signal(stats, context) * self.config.related_category_factor)
            .fold(0.0_f64, f64::max);

        direct.max(related).clamp(0.0, 1.0)
    }

    pub fn deal_score(&self, deal: Option<&Deal>) -> f64 {
        let Some(deal) = deal else {
            return 0.0;
        };
        if self.config.deal_full_scale_pct <= 0.0 {
            return 0.0;
        }

        (deal.discount() / self.config.deal_full_scale_pct).clamp(0.0, 1.0)
    }

    pub fn is_favored(&self, business_type: BusinessType, category: &str) -> bool {
        self.config
            .affinity
            .get(&business_type)
            .is_some_and(|favored| favored.iter().any(|item| item.eq_ignore_ascii_case(category)))
    }

    fn category_signal(&self, stats: &CategoryStats, context: &ScoringContext) -> f64 {
        let days = (context.now - stats.last_purchase).num_seconds().max(0) as f64 / 86_400.0;
        let half_life = self.config.recency_half_life_days.max(f64::EPSILON);
        let recency = 0.5_f64.powf(days / half_life);

        let saturation = self.config.frequency_saturation.max(1);
        let frequency = f64::from(stats.count.min(saturation)) / f64::from(saturation);

        0.5 * recency + 0.5 * frequency
    }

    /// Generate human-readable reasoning, strongest weighted contribution first
    pub fn generate_reasoning(
        &self,
        components: &ComponentScores,
        product: &Product,
        context: &ScoringContext,
        deal: Option<&Deal>,
    ) -> Vec<String> {
        let weights = &self.config.weights;
        let mut reasons: Vec<(f64, String)> = Vec::new();

        if let Some(profile) = &context.profile {
            if components.affinity >= 1.0 {
                reasons.push((
                    components.affinity * weights.affinity,
                    format!("Popular with {} businesses", profile.business_type),
                ));
            }

            if product.region.same_city(&profile.location) {
                reasons.push((
                    components.proximity * weights.proximity,
                    format!("Distributed in {}", profile.location.city),
                ));
            } else if product.region.same_state(&profile.location) {
                reasons.push((
                    components.proximity * weights.proximity,
                    format!("Ships within {}", profile.location.state),
                ));
            }
        }

        if !context.history.is_empty() && components.purchase > 0.0 {
            let message = if context.history.get(&product.category).is_some() {
                format!("You regularly buy {}", product.category)
            } else {
                "Pairs with categories you already stock".to_string()
            };
            reasons.push((components.purchase * weights.purchase, message));
        }

        if let Some(deal) = deal {
            if components.deal > 0.0 {
                reasons.push((
                    components.deal * weights.deal,
                    format!("{}% off with {}", deal.discount_pct.normalize(), deal.title),
                ));
            }
        }

        reasons.sort_by(|a, b| b.0.total_cmp(&a.0));
        let mut reasons: Vec<String> = reasons.into_iter().map(|(_, reason)| reason).collect();

        // Ensure at least one reason
        if reasons.is_empty() {
            reasons.push(if context.profile.is_some() {
                "Based on your business profile".to_string()
            } else {
                "Popular across the marketplace".to_string()
            });
        }

        reasons
    }
}

/// Highest-discount active deal covering `product`.
pub fn best_deal<'a>(product: &Product, deals: &'a [Deal]) -> Option<&'a Deal> {
    deals
        .iter()
        .filter(|deal| deal.covers(product.id))
        .max_by(|a, b| a.discount_pct.cmp(&b.discount_pct).then_with(|| b.id.cmp(&a.id)))
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::*;
    use crate::domain::deal::DealType;
    use crate::domain::product::ProductId;
    use crate::domain::profile::{BusinessProfile, BusinessType, Location, UserId};
    use crate::domain::purchase::PurchaseRecord;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 15, 12, 0, 0).unwrap()
    }

    fn grains(id: u64, city: &str, state: &str) -> Product {
        Product {
            id: ProductId(id),
            name: format!("Rice {id}"),
            category: "grains".to_string(),
            subcategory: Some("rice".to_string()),
            price: Decimal::new(150, 0),
            stock: 20,
            margin: Decimal::new(20, 2),
            tags: vec![],
            region: Location::new(city, state),
            active: true,
            created_at: now() - Duration::days(90),
        }
    }

    fn kirana_in_mumbai() -> BusinessProfile {
        BusinessProfile {
            id: UserId(1),
            business_name: "Sharma Kirana Store".to_string(),
            business_type: BusinessType::Kirana,
            location: Location::new("Mumbai", "Maharashtra"),
            registered_at: now() - Duration::days(400),
        }
    }

    fn deal_on(product_id: u64, pct: i64) -> Deal {
        Deal {
            id: format!("deal-{product_id}"),
            title: "Festive grains".to_string(),
            product_ids: vec![ProductId(product_id)],
            discount_pct: Decimal::new(pct, 0),
            starts_at: now() - Duration::days(1),
            ends_at: now() + Duration::days(7),
            deal_type: DealType::Daily,
        }
    }

    #[test]
    fn test_total_score_calculation() {
        let engine = ScoringEngine::default();
        let components =
            ComponentScores { affinity: 1.0, proximity: 0.6, purchase: 0.5, deal: 0.0 };

        let total = engine.calculate_total_score(&components);
        // (1.0 * 0.3) + (0.6 * 0.2) + (0.5 * 0.3) + 0.0 = 0.30 + 0.12 + 0.15 = 0.57
        assert!((total - 0.57).abs() < 1e-9);
    }

    #[test]
    fn discounted_local_product_beats_remote_full_price_product() {
        let engine = ScoringEngine::default();
        let local = grains(1, "Mumbai", "Maharashtra");
        let remote = grains(2, "Delhi", "Delhi");
        let context = ScoringContext::new(
            Some(kirana_in_mumbai()),
            CategoryHistory::default(),
            vec![deal_on(1, 20)],
            now(),
        );

        let local_score = engine.score(&local, &context);
        let remote_score = engine.score(&remote, &context);

        assert!(local_score.score > remote_score.score);
        assert_eq!(local_score.components.affinity, 1.0);
        assert_eq!(remote_score.components.proximity, engine.config().proximity_floor);
        assert!(local_score.reasons.iter().any(|reason| reason.contains("20% off")));
    }

    #[test]
    fn purchase_signal_decays_with_age_and_saturates_with_frequency() {
        let engine = ScoringEngine::default();
        let product = grains(1, "Mumbai", "Maharashtra");
        let catalog = vec![product.clone()];

        let recent: Vec<PurchaseRecord> = (0..5)
            .map(|n| PurchaseRecord {
                user_id: UserId(1),
                product_id: ProductId(1),
                order_id: format!("ORD{n}"),
                quantity: 1,
                purchased_at: now() - Duration::days(1),
            })
            .collect();
        let stale = vec![PurchaseRecord {
            purchased_at: now() - Duration::days(120),
            ..recent[0].clone()
        }];

        let recent_context = ScoringContext::new(
            Some(kirana_in_mumbai()),
            CategoryHistory::build(&recent, &catalog),
            vec![],
            now(),
        );
        let stale_context = ScoringContext::new(
            Some(kirana_in_mumbai()),
            CategoryHistory::build(&stale, &catalog),
            vec![],
            now(),
        );

        let recent_signal = engine.purchase_score(&product, &recent_context);
        let stale_signal = engine.purchase_score(&product, &stale_context);
        assert!(recent_signal > 0.95);
        assert!(stale_signal < 0.2);
    }

    #[test]
    fn related_category_contributes_at_a_discount() {
        let engine = ScoringEngine::default();
        let rice = grains(1, "Mumbai", "Maharashtra");
        let dal = Product { id: ProductId(2), category: "pulses".to_string(), ..rice.clone() };
        let history = vec![PurchaseRecord {
            user_id: UserId(1),
            product_id: ProductId(1),
            order_id: "ORD001".to_string(),
            quantity: 2,
            purchased_at: now(),
        }];
        let context = ScoringContext::new(
            Some(kirana_in_mumbai()),
            CategoryHistory::build(&history, &[rice.clone(), dal.clone()]),
            vec![],
            now(),
        );

        let direct = engine.purchase_score(&rice, &context);
        let related = engine.purchase_score(&dal, &context);
        assert!(related > 0.0);
        assert!((related - direct * engine.config().related_category_factor).abs() < 1e-9);
    }

    #[test]
    fn anonymous_context_uses_baselines() {
        let engine = ScoringEngine::default();
        let product = grains(1, "Mumbai", "Maharashtra");
        let scored = engine.score(&product, &ScoringContext::anonymous(vec![], now()));

        assert_eq!(scored.components.affinity, engine.config().affinity_baseline);
        assert_eq!(scored.components.proximity, engine.config().proximity_floor);
        assert_eq!(scored.components.purchase, engine.config().cold_start_purchase);
        assert_eq!(scored.reasons, vec!["Popular across the marketplace".to_string()]);
    }

    #[test]
    fn score_candidates_skips_unavailable_products() {
        let engine = ScoringEngine::default();
        let in_stock = grains(1, "Mumbai", "Maharashtra");
        let sold_out = Product { stock: 0, ..grains(2, "Mumbai", "Maharashtra") };
        let inactive = Product { active: false, ..grains(3, "Mumbai", "Maharashtra") };

        let scored = engine.score_candidates(
            [&in_stock, &sold_out, &inactive],
            &ScoringContext::anonymous(vec![], now()),
        );
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].product.id, ProductId(1));
    }

    #[test]
    fn best_deal_picks_highest_discount() {
        let product = grains(1, "Mumbai", "Maharashtra");
        let deals = vec![deal_on(1, 10), Deal { id: "deal-big".to_string(), ..deal_on(1, 25) }];
        assert_eq!(best_deal(&product, &deals).map(|deal| deal.id.as_str()), Some("deal-big"));

        let engine = ScoringEngine::default();
        assert!((engine.deal_score(best_deal(&product, &deals)) - 25.0 / 30.0).abs() < 1e-9);
        assert_eq!(engine.deal_score(None), 0.0);
    }
}
