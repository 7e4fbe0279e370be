//! Rule-based buyer assistant.
//!
//! Answers free-text questions from shop owners ("what should I stock for
//! Diwali?") with products picked from the signal store and scored by the
//! core scoring engine. There is no language model involved: every answer is
//! deterministic for a fixed query, catalog and clock.
//!
//! # Architecture
//!
//! Each query moves through four stages:
//! 1. **Received** (`assistant`) - the raw query text and the asking user
//! 2. **Classified** (`intent`) - ordered keyword rules pick an `AssistantIntent`
//! 3. **Resolved** (`strategy`) - the intent's strategy reads signals and ranks products
//! 4. **Rendered** (`render`) - a tera template per intent turns the products into a message
//!
//! # Failure model
//!
//! Classification and rendering never fail a request. Only an unavailable
//! signal store does, surfaced as a recoverable `EngineError::DataUnavailable`.

pub mod assistant;
pub mod intent;
pub mod render;
pub mod strategy;

use thiserror::Error;

pub use assistant::{Assistant, AssistantResponse};
pub use intent::{AssistantIntent, Classification, IntentClassifier};
pub use strategy::Strategy;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("template error: {0}")]
    Template(String),
}
