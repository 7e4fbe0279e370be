//! Scoring Engine
//!
//! Relevance of a product for a buyer from four normalized signals: business
//! type affinity, geographic proximity, purchase recency and frequency, and
//! deal attractiveness.

mod engine;
mod types;

pub use engine::{best_deal, ScoringEngine};
pub use types::*;

/// Default scoring weights
pub const DEFAULT_WEIGHTS: ScoringWeights =
    ScoringWeights { affinity: 0.30, proximity: 0.20, purchase: 0.30, deal: 0.20 };
