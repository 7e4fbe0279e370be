use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::profile::BusinessType;
use crate::recommendations::CacheTtls;
use crate::scoring::{ScoringConfig, ScoringWeights};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub scoring: ScoringConfig,
    pub assistant: AssistantConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Entry bound for the in-process store.
    pub capacity: u64,
    pub homepage_ttl_secs: u64,
    pub product_ttl_secs: u64,
    pub search_ttl_secs: u64,
}

impl CacheConfig {
    pub fn ttls(&self) -> CacheTtls {
        CacheTtls {
            homepage: Duration::from_secs(self.homepage_ttl_secs),
            product: Duration::from_secs(self.product_ttl_secs),
            search: Duration::from_secs(self.search_ttl_secs),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    Memory,
    Sqlite,
}

impl CacheBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeasonConfig {
    pub name: String,
    /// Extra words that name this season in a query.
    #[serde(default)]
    pub aliases: Vec<String>,
    pub tags: Vec<String>,
    /// Calendar months (1-12) in which the season is current.
    #[serde(default)]
    pub months: Vec<u32>,
}

impl SeasonConfig {
    fn new(name: &str, aliases: &[&str], tags: &[&str], months: &[u32]) -> Self {
        Self {
            name: name.to_string(),
            aliases: aliases.iter().map(|alias| alias.to_string()).collect(),
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            months: months.to_vec(),
        }
    }

    pub fn is_named_in(&self, normalized_query: &str) -> bool {
        std::iter::once(&self.name)
            .chain(&self.aliases)
            .any(|word| normalized_query.contains(&word.to_lowercase()))
    }
}

/// Keyword sets per intent, checked in the order the intents are declared.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntentKeywords {
    pub seasonal_stock: Vec<String>,
    pub margin_optimization: Vec<String>,
    pub shopping_list: Vec<String>,
    pub trend_query: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct AssistantConfig {
    pub seasons: Vec<SeasonConfig>,
    pub keywords: IntentKeywords,
    /// Margin fraction a product needs to count as high margin.
    pub min_margin: f64,
    pub margin_limit: usize,
    pub shopping_list_size: usize,
    pub seasonal_limit: usize,
    pub trend_window_days: u32,
    pub trend_limit: usize,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub cache_backend: Option<CacheBackend>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

fn words(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            seasons: vec![
                SeasonConfig::new(
                    "diwali",
                    &["deepavali", "festive", "festival", "celebration"],
                    &["sweets", "decorations", "gifting"],
                    &[10, 11],
                ),
                SeasonConfig::new("winter", &[], &["ghee", "tea", "dry-fruits"], &[12, 1, 2]),
                SeasonConfig::new("summer", &[], &["beverage", "cold-drinks"], &[3, 4, 5]),
                SeasonConfig::new("monsoon", &["rainy"], &["tea", "snacks"], &[6, 7, 8, 9]),
            ],
            keywords: IntentKeywords {
                seasonal_stock: words(&[
                    "diwali",
                    "festive",
                    "festival",
                    "celebration",
                    "season",
                    "month",
                    "weather",
                    "winter",
                    "summer",
                    "monsoon",
                ]),
                margin_optimization: words(&["profit", "high-margin", "margin", "profitable"]),
                shopping_list: words(&["shopping list", "stock", "inventory", "order"]),
                trend_query: words(&["best", "popular", "trending", "top"]),
            },
            min_margin: 0.25,
            margin_limit: 8,
            shopping_list_size: 8,
            seasonal_limit: 5,
            trend_window_days: 7,
            trend_limit: 8,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://dukaan.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            cache: CacheConfig {
                backend: CacheBackend::Memory,
                capacity: 10_000,
                homepage_ttl_secs: 15 * 60,
                product_ttl_secs: 30 * 60,
                search_ttl_secs: 5 * 60,
            },
            scoring: ScoringConfig::default(),
            assistant: AssistantConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for CacheBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(ConfigError::Validation(format!(
                "unsupported cache backend `{other}` (expected memory|sqlite)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("dukaan.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(cache) = patch.cache {
            if let Some(backend) = cache.backend {
                self.cache.backend = backend;
            }
            if let Some(capacity) = cache.capacity {
                self.cache.capacity = capacity;
            }
            if let Some(ttl) = cache.homepage_ttl_secs {
                self.cache.homepage_ttl_secs = ttl;
            }
            if let Some(ttl) = cache.product_ttl_secs {
                self.cache.product_ttl_secs = ttl;
            }
            if let Some(ttl) = cache.search_ttl_secs {
                self.cache.search_ttl_secs = ttl;
            }
        }

        if let Some(scoring) = patch.scoring {
            apply_scoring_patch(&mut self.scoring, scoring)?;
        }

        if let Some(assistant) = patch.assistant {
            if let Some(seasons) = assistant.seasons {
                self.assistant.seasons = seasons;
            }
            if let Some(keywords) = assistant.keywords {
                let current = &mut self.assistant.keywords;
                if let Some(values) = keywords.seasonal_stock {
                    current.seasonal_stock = values;
                }
                if let Some(values) = keywords.margin_optimization {
                    current.margin_optimization = values;
                }
                if let Some(values) = keywords.shopping_list {
                    current.shopping_list = values;
                }
                if let Some(values) = keywords.trend_query {
                    current.trend_query = values;
                }
            }
            if let Some(min_margin) = assistant.min_margin {
                self.assistant.min_margin = min_margin;
            }
            if let Some(limit) = assistant.margin_limit {
                self.assistant.margin_limit = limit;
            }
            if let Some(size) = assistant.shopping_list_size {
                self.assistant.shopping_list_size = size;
            }
            if let Some(limit) = assistant.seasonal_limit {
                self.assistant.seasonal_limit = limit;
            }
            if let Some(days) = assistant.trend_window_days {
                self.assistant.trend_window_days = days;
            }
            if let Some(limit) = assistant.trend_limit {
                self.assistant.trend_limit = limit;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("DUKAAN_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("DUKAAN_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("DUKAAN_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("DUKAAN_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("DUKAAN_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("DUKAAN_CACHE_BACKEND") {
            self.cache.backend = value.parse()?;
        }
        if let Some(value) = read_env("DUKAAN_CACHE_CAPACITY") {
            self.cache.capacity = parse_u64("DUKAAN_CACHE_CAPACITY", &value)?;
        }
        if let Some(value) = read_env("DUKAAN_CACHE_HOMEPAGE_TTL_SECS") {
            self.cache.homepage_ttl_secs = parse_u64("DUKAAN_CACHE_HOMEPAGE_TTL_SECS", &value)?;
        }
        if let Some(value) = read_env("DUKAAN_CACHE_PRODUCT_TTL_SECS") {
            self.cache.product_ttl_secs = parse_u64("DUKAAN_CACHE_PRODUCT_TTL_SECS", &value)?;
        }
        if let Some(value) = read_env("DUKAAN_CACHE_SEARCH_TTL_SECS") {
            self.cache.search_ttl_secs = parse_u64("DUKAAN_CACHE_SEARCH_TTL_SECS", &value)?;
        }

        let weights = &mut self.scoring.weights;
        if let Some(value) = read_env("DUKAAN_SCORING_WEIGHT_AFFINITY") {
            weights.affinity = parse_f64("DUKAAN_SCORING_WEIGHT_AFFINITY", &value)?;
        }
        if let Some(value) = read_env("DUKAAN_SCORING_WEIGHT_PROXIMITY") {
            weights.proximity = parse_f64("DUKAAN_SCORING_WEIGHT_PROXIMITY", &value)?;
        }
        if let Some(value) = read_env("DUKAAN_SCORING_WEIGHT_PURCHASE") {
            weights.purchase = parse_f64("DUKAAN_SCORING_WEIGHT_PURCHASE", &value)?;
        }
        if let Some(value) = read_env("DUKAAN_SCORING_WEIGHT_DEAL") {
            weights.deal = parse_f64("DUKAAN_SCORING_WEIGHT_DEAL", &value)?;
        }

        if let Some(value) = read_env("DUKAAN_ASSISTANT_MIN_MARGIN") {
            self.assistant.min_margin = parse_f64("DUKAAN_ASSISTANT_MIN_MARGIN", &value)?;
        }
        if let Some(value) = read_env("DUKAAN_ASSISTANT_SHOPPING_LIST_SIZE") {
            self.assistant.shopping_list_size =
                parse_usize("DUKAAN_ASSISTANT_SHOPPING_LIST_SIZE", &value)?;
        }
        if let Some(value) = read_env("DUKAAN_ASSISTANT_TREND_WINDOW_DAYS") {
            self.assistant.trend_window_days =
                parse_u32("DUKAAN_ASSISTANT_TREND_WINDOW_DAYS", &value)?;
        }

        let log_level = read_env("DUKAAN_LOGGING_LEVEL").or_else(|| read_env("DUKAAN_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("DUKAAN_LOGGING_FORMAT").or_else(|| read_env("DUKAAN_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(backend) = overrides.cache_backend {
            self.cache.backend = backend;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_cache(&self.cache)?;
        validate_scoring(&self.scoring)?;
        validate_assistant(&self.assistant)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn apply_scoring_patch(
    scoring: &mut ScoringConfig,
    patch: ScoringPatch,
) -> Result<(), ConfigError> {
    if let Some(weights) = patch.weights {
        let ScoringWeights { affinity, proximity, purchase, deal } = scoring.weights;
        scoring.weights = ScoringWeights {
            affinity: weights.affinity.unwrap_or(affinity),
            proximity: weights.proximity.unwrap_or(proximity),
            purchase: weights.purchase.unwrap_or(purchase),
            deal: weights.deal.unwrap_or(deal),
        };
    }
    if let Some(affinity) = patch.affinity {
        for (business_type, categories) in affinity {
            let business_type: BusinessType = business_type.parse().map_err(|err| {
                ConfigError::Validation(format!("scoring.affinity has an unknown key: {err}"))
            })?;
            let categories = categories.into_iter().map(|c| c.to_ascii_lowercase()).collect();
            scoring.affinity.insert(business_type, categories);
        }
    }
    if let Some(related) = patch.related_categories {
        for (category, related) in related {
            let related = related.into_iter().map(|c| c.to_ascii_lowercase()).collect();
            scoring.related_categories.insert(category.to_ascii_lowercase(), related);
        }
    }

    let scalars: [(&mut f64, Option<f64>); 8] = [
        (&mut scoring.affinity_baseline, patch.affinity_baseline),
        (&mut scoring.same_city, patch.same_city),
        (&mut scoring.same_state, patch.same_state),
        (&mut scoring.proximity_floor, patch.proximity_floor),
        (&mut scoring.recency_half_life_days, patch.recency_half_life_days),
        (&mut scoring.related_category_factor, patch.related_category_factor),
        (&mut scoring.cold_start_purchase, patch.cold_start_purchase),
        (&mut scoring.deal_full_scale_pct, patch.deal_full_scale_pct),
    ];
    for (field, value) in scalars {
        if let Some(value) = value {
            *field = value;
        }
    }
    if let Some(saturation) = patch.frequency_saturation {
        scoring.frequency_saturation = saturation;
    }

    Ok(())
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("dukaan.toml"), PathBuf::from("config/dukaan.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_cache(cache: &CacheConfig) -> Result<(), ConfigError> {
    if cache.capacity == 0 {
        return Err(ConfigError::Validation(
            "cache.capacity must be greater than zero".to_string(),
        ));
    }

    let ttls = [
        ("cache.homepage_ttl_secs", cache.homepage_ttl_secs),
        ("cache.product_ttl_secs", cache.product_ttl_secs),
        ("cache.search_ttl_secs", cache.search_ttl_secs),
    ];
    if let Some((name, _)) = ttls.iter().find(|(_, ttl)| *ttl == 0) {
        return Err(ConfigError::Validation(format!("{name} must be greater than zero")));
    }

    Ok(())
}

fn validate_unit(name: &str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::Validation(format!("{name} must be in range 0..=1, got {value}")));
    }
    Ok(())
}

fn validate_scoring(scoring: &ScoringConfig) -> Result<(), ConfigError> {
    let weights = scoring.weights;
    validate_unit("scoring.weights.affinity", weights.affinity)?;
    validate_unit("scoring.weights.proximity", weights.proximity)?;
    validate_unit("scoring.weights.purchase", weights.purchase)?;
    validate_unit("scoring.weights.deal", weights.deal)?;
    if weights.sum() <= 0.0 {
        return Err(ConfigError::Validation(
            "scoring.weights must not all be zero".to_string(),
        ));
    }

    validate_unit("scoring.affinity_baseline", scoring.affinity_baseline)?;
    validate_unit("scoring.same_city", scoring.same_city)?;
    validate_unit("scoring.same_state", scoring.same_state)?;
    validate_unit("scoring.proximity_floor", scoring.proximity_floor)?;
    validate_unit("scoring.related_category_factor", scoring.related_category_factor)?;
    validate_unit("scoring.cold_start_purchase", scoring.cold_start_purchase)?;

    if scoring.recency_half_life_days.is_nan() || scoring.recency_half_life_days <= 0.0 {
        return Err(ConfigError::Validation(
            "scoring.recency_half_life_days must be greater than zero".to_string(),
        ));
    }
    if scoring.frequency_saturation == 0 {
        return Err(ConfigError::Validation(
            "scoring.frequency_saturation must be greater than zero".to_string(),
        ));
    }
    if scoring.deal_full_scale_pct.is_nan() || scoring.deal_full_scale_pct <= 0.0 {
        return Err(ConfigError::Validation(
            "scoring.deal_full_scale_pct must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_assistant(assistant: &AssistantConfig) -> Result<(), ConfigError> {
    if assistant.seasons.is_empty() {
        return Err(ConfigError::Validation(
            "assistant.seasons must define at least one season".to_string(),
        ));
    }
    for season in &assistant.seasons {
        if season.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "assistant.seasons entries need a name".to_string(),
            ));
        }
        if season.tags.iter().all(|tag| tag.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "assistant season `{}` must list at least one tag",
                season.name
            )));
        }
        if let Some(month) = season.months.iter().find(|month| !(1..=12).contains(*month)) {
            return Err(ConfigError::Validation(format!(
                "assistant season `{}` has invalid month {month}",
                season.name
            )));
        }
    }

    let keywords = &assistant.keywords;
    let keyword_sets = [
        ("seasonal_stock", &keywords.seasonal_stock),
        ("margin_optimization", &keywords.margin_optimization),
        ("shopping_list", &keywords.shopping_list),
        ("trend_query", &keywords.trend_query),
    ];
    if let Some((intent, _)) = keyword_sets.iter().find(|(_, words)| words.is_empty()) {
        return Err(ConfigError::Validation(format!(
            "assistant.keywords.{intent} must not be empty"
        )));
    }

    validate_unit("assistant.min_margin", assistant.min_margin)?;
    let limits = [
        ("assistant.margin_limit", assistant.margin_limit),
        ("assistant.shopping_list_size", assistant.shopping_list_size),
        ("assistant.seasonal_limit", assistant.seasonal_limit),
        ("assistant.trend_limit", assistant.trend_limit),
    ];
    if let Some((name, _)) = limits.iter().find(|(_, limit)| *limit == 0) {
        return Err(ConfigError::Validation(format!("{name} must be greater than zero")));
    }
    if assistant.trend_window_days == 0 {
        return Err(ConfigError::Validation(
            "assistant.trend_window_days must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| invalid_override(key, value))
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
        .ok_or_else(|| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    cache: Option<CachePatch>,
    scoring: Option<ScoringPatch>,
    assistant: Option<AssistantPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CachePatch {
    backend: Option<CacheBackend>,
    capacity: Option<u64>,
    homepage_ttl_secs: Option<u64>,
    product_ttl_secs: Option<u64>,
    search_ttl_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct WeightsPatch {
    affinity: Option<f64>,
    proximity: Option<f64>,
    purchase: Option<f64>,
    deal: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct ScoringPatch {
    weights: Option<WeightsPatch>,
    affinity: Option<HashMap<String, Vec<String>>>,
    affinity_baseline: Option<f64>,
    same_city: Option<f64>,
    same_state: Option<f64>,
    proximity_floor: Option<f64>,
    recency_half_life_days: Option<f64>,
    frequency_saturation: Option<u32>,
    related_categories: Option<HashMap<String, Vec<String>>>,
    related_category_factor: Option<f64>,
    cold_start_purchase: Option<f64>,
    deal_full_scale_pct: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct KeywordsPatch {
    seasonal_stock: Option<Vec<String>>,
    margin_optimization: Option<Vec<String>>,
    shopping_list: Option<Vec<String>>,
    trend_query: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct AssistantPatch {
    seasons: Option<Vec<SeasonConfig>>,
    keywords: Option<KeywordsPatch>,
    min_margin: Option<f64>,
    margin_limit: Option<usize>,
    shopping_list_size: Option<usize>,
    seasonal_limit: Option<usize>,
    trend_window_days: Option<u32>,
    trend_limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, CacheBackend, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
    use crate::domain::profile::BusinessType;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    fn write_config(dir: &TempDir, body: &str) -> Result<PathBuf, String> {
        let path = dir.path().join("dukaan.toml");
        fs::write(&path, body).map_err(|err| err.to_string())?;
        Ok(path)
    }

    fn load_file(body: &str) -> Result<Result<AppConfig, ConfigError>, String> {
        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = write_config(&dir, body)?;
        Ok(AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() }))
    }

    #[test]
    fn defaults_are_valid() -> Result<(), String> {
        let config = AppConfig::default();
        config.validate().map_err(|err| format!("default config rejected: {err}"))?;

        ensure(config.cache.homepage_ttl_secs == 900, "homepage ttl should be 15 minutes")?;
        ensure(config.cache.product_ttl_secs == 1800, "product ttl should be 30 minutes")?;
        ensure(config.cache.search_ttl_secs == 300, "search ttl should be 5 minutes")?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )?;
        ensure(
            config.assistant.seasons.first().is_some_and(|season| season.name == "diwali"),
            "diwali should be the first configured season",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_DUKAAN_DB_PATH", "from-env.db");

        let result = (|| -> Result<(), String> {
            let config = load_file(
                r#"
[database]
url = "sqlite://${TEST_DUKAAN_DB_PATH}"
"#,
            )?
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-env.db",
                "database url should be interpolated from environment",
            )
        })();

        clear_vars(&["TEST_DUKAAN_DB_PATH"]);
        result
    }

    #[test]
    fn missing_interpolation_variable_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&["TEST_DUKAAN_UNSET"]);

        let error = match load_file("[database]\nurl = \"${TEST_DUKAAN_UNSET}\"\n")? {
            Ok(_) => return Err("expected interpolation failure".to_string()),
            Err(error) => error,
        };
        let names_var = matches!(
            error,
            ConfigError::MissingEnvInterpolation { ref var } if var == "TEST_DUKAAN_UNSET"
        );
        ensure(names_var, "error should name the missing variable")
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("DUKAAN_LOG_LEVEL", "warn");
        env::set_var("DUKAAN_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Json),
                "json logging format should be set from env var",
            )
        })();

        clear_vars(&["DUKAAN_LOG_LEVEL", "DUKAAN_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("DUKAAN_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("DUKAAN_CACHE_SEARCH_TTL_SECS", "120");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = write_config(
                &dir,
                r#"
[database]
url = "sqlite://from-file.db"

[cache]
backend = "sqlite"
search_ttl_secs = 60
homepage_ttl_secs = 600

[logging]
level = "warn"
"#,
            )?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.cache.search_ttl_secs == 120, "env search ttl should win over file")?;
            ensure(config.cache.homepage_ttl_secs == 600, "file homepage ttl should apply")?;
            ensure(config.cache.backend == CacheBackend::Sqlite, "file backend should apply")
        })();

        clear_vars(&["DUKAAN_DATABASE_URL", "DUKAAN_CACHE_SEARCH_TTL_SECS"]);
        result
    }

    #[test]
    fn scoring_and_assistant_sections_are_applied() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        let config = load_file(
            r#"
[scoring]
affinity_baseline = 0.25
frequency_saturation = 3

[scoring.weights]
deal = 0.5

[scoring.affinity]
restaurant = ["Spices", "dairy"]

[assistant]
min_margin = 0.3

[[assistant.seasons]]
name = "holi"
tags = ["colours", "sweets"]
months = [3]
"#,
        )?
        .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.scoring.affinity_baseline == 0.25, "baseline should come from file")?;
        ensure(config.scoring.frequency_saturation == 3, "saturation should come from file")?;
        ensure(config.scoring.weights.deal == 0.5, "deal weight should come from file")?;
        ensure(config.scoring.weights.affinity == 0.30, "unset weights keep their default")?;
        ensure(
            config.scoring.affinity.get(&BusinessType::Restaurant)
                == Some(&vec!["spices".to_string(), "dairy".to_string()]),
            "affinity categories should be replaced and lowercased",
        )?;
        ensure(config.assistant.min_margin == 0.3, "margin floor should come from file")?;
        ensure(
            config.assistant.seasons.len() == 1 && config.assistant.seasons[0].name == "holi",
            "season table should be replaced",
        )
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        let cases = [
            ("[cache]\nproduct_ttl_secs = 0\n", "cache.product_ttl_secs"),
            (
                "[scoring.weights]\naffinity = 0.0\nproximity = 0.0\npurchase = 0.0\ndeal = 0.0\n",
                "must not all be zero",
            ),
            ("[scoring.weights]\npurchase = 1.5\n", "scoring.weights.purchase"),
            ("[[assistant.seasons]]\nname = \"diwali\"\ntags = []\n", "at least one tag"),
            ("[database]\nurl = \"postgres://localhost/dukaan\"\n", "database.url"),
            ("[scoring.affinity]\nbakery = [\"bread\"]\n", "scoring.affinity"),
        ];

        for (body, expected) in cases {
            match load_file(body)? {
                Ok(_) => return Err(format!("expected validation failure for {body:?}")),
                Err(ConfigError::Validation(message)) if message.contains(expected) => {}
                Err(other) => {
                    return Err(format!("unexpected error for {body:?}: {other}"));
                }
            }
        }
        Ok(())
    }

    #[test]
    fn malformed_numeric_env_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("DUKAAN_CACHE_HOMEPAGE_TTL_SECS", "soon");
        let result = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => Err("expected env override failure".to_string()),
            Err(ConfigError::InvalidEnvOverride { key, .. }) => ensure(
                key == "DUKAAN_CACHE_HOMEPAGE_TTL_SECS",
                "error should name the offending variable",
            ),
            Err(other) => Err(format!("unexpected error: {other}")),
        };

        clear_vars(&["DUKAAN_CACHE_HOMEPAGE_TTL_SECS"]);
        result
    }

    #[test]
    fn missing_required_file_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("absent.toml");
        match AppConfig::load(LoadOptions {
            config_path: Some(path.clone()),
            require_file: true,
            ..LoadOptions::default()
        }) {
            Err(ConfigError::MissingConfigFile(missing)) => {
                ensure(missing == path, "error should carry the expected path")
            }
            other => Err(format!("expected missing file error, got {other:?}")),
        }
    }
}
