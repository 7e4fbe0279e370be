//! Ranking Aggregator
//!
//! Turns a bag of scored candidates into the list a caller displays: only
//! available products, score descending with product id ascending as the
//! tie-break, one entry per dedup key, at most `limit` entries.

use std::collections::HashSet;
use std::hash::Hash;

use crate::domain::product::ProductId;
use crate::scoring::ScoredCandidate;

pub fn rank<K, F>(
    mut candidates: Vec<ScoredCandidate>,
    limit: usize,
    dedup_key: F,
) -> Vec<ScoredCandidate>
where
    K: Eq + Hash,
    F: Fn(&ScoredCandidate) -> K,
{
    candidates.retain(|candidate| candidate.product.is_available());
    candidates.sort_by(|a, b| {
        b.score.total_cmp(&a.score).then_with(|| a.product.id.cmp(&b.product.id))
    });

    // Sorted first, so the first occurrence of a key is its best-scoring one.
    let mut seen = HashSet::with_capacity(candidates.len());
    candidates.retain(|candidate| seen.insert(dedup_key(candidate)));
    candidates.truncate(limit);
    candidates
}

/// The dedup key used by every built-in list.
pub fn by_product_id(candidate: &ScoredCandidate) -> ProductId {
    candidate.product.id
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{by_product_id, rank};
    use crate::domain::product::{Product, ProductId};
    use crate::domain::profile::Location;
    use crate::scoring::{ComponentScores, ScoredCandidate};

    fn candidate(id: u64, score: f64, stock: i64) -> ScoredCandidate {
        ScoredCandidate {
            product: Product {
                id: ProductId(id),
                name: format!("Product {id}"),
                category: "grains".to_string(),
                subcategory: None,
                price: Decimal::new(100, 0),
                stock,
                margin: Decimal::new(20, 2),
                tags: vec![],
                region: Location::new("Mumbai", "Maharashtra"),
                active: true,
                created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            },
            score,
            reasons: vec![],
            components: ComponentScores::default(),
        }
    }

    fn ids(ranked: &[ScoredCandidate]) -> Vec<u64> {
        ranked.iter().map(|candidate| candidate.product.id.0).collect()
    }

    #[test]
    fn orders_by_score_then_product_id() {
        let ranked = rank(
            vec![candidate(3, 0.5, 1), candidate(1, 0.9, 1), candidate(2, 0.5, 1)],
            10,
            by_product_id,
        );
        assert_eq!(ids(&ranked), vec![1, 2, 3]);
    }

    #[test]
    fn never_exceeds_limit() {
        let candidates = (1..=20).map(|id| candidate(id, 1.0 / id as f64, 5)).collect();
        let ranked = rank(candidates, 8, by_product_id);
        assert_eq!(ranked.len(), 8);
        assert!(ranked.windows(2).all(|pair| pair[0].score >= pair[1].score));
    }

    #[test]
    fn drops_out_of_stock_products() {
        let ranked = rank(
            vec![candidate(1, 0.9, 0), candidate(2, 0.4, 3), candidate(3, 0.8, -1)],
            10,
            by_product_id,
        );
        assert_eq!(ids(&ranked), vec![2]);
    }

    #[test]
    fn keeps_highest_scoring_duplicate() {
        let ranked = rank(
            vec![candidate(7, 0.2, 1), candidate(7, 0.6, 1), candidate(4, 0.4, 1)],
            10,
            by_product_id,
        );
        assert_eq!(ids(&ranked), vec![7, 4]);
        assert_eq!(ranked[0].score, 0.6);
    }

    #[test]
    fn custom_dedup_key_collapses_categories() {
        let mut oil = candidate(5, 0.3, 1);
        oil.product.category = "oils".to_string();
        let ranked = rank(
            vec![candidate(1, 0.9, 1), candidate(2, 0.8, 1), oil],
            10,
            |candidate| candidate.product.category.clone(),
        );
        assert_eq!(ids(&ranked), vec![1, 5]);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(rank(Vec::new(), 5, by_product_id).is_empty());
        assert!(rank(vec![candidate(1, 0.5, 1)], 0, by_product_id).is_empty());
    }
}
