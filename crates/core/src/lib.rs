pub mod cache;
pub mod config;
pub mod domain;
pub mod errors;
pub mod ranking;
pub mod recommendations;
pub mod scoring;
pub mod signals;

pub use cache::{CacheEntry, CacheKey, CacheStore, CacheStoreError, MokaCacheStore, ResponseCache};
pub use config::{AppConfig, AssistantConfig, CacheBackend, ConfigError, LoadOptions};
pub use domain::deal::{Deal, DealType};
pub use domain::product::{Product, ProductId};
pub use domain::profile::{BusinessProfile, BusinessType, Location, UserId};
pub use domain::purchase::PurchaseRecord;
pub use errors::{DomainError, EngineError, InterfaceError};
pub use ranking::rank;
pub use recommendations::{CacheTtls, Homepage, RecommendationService, Recommender, SearchFilters};
pub use scoring::{ScoredCandidate, ScoringConfig, ScoringContext, ScoringEngine};
pub use signals::{InMemorySignalStore, ProductFilter, PurchaseQuery, SignalStore, SignalStoreError};
