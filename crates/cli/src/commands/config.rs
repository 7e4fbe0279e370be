use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use dukaan_core::config::{AppConfig, LoadOptions};
use toml::Value;

struct Field {
    key: &'static str,
    value: String,
    env_key: &'static str,
    cli_flag: Option<&'static str>,
}

fn field(key: &'static str, value: impl ToString, env_key: &'static str) -> Field {
    Field { key, value: value.to_string(), env_key, cli_flag: None }
}

pub fn run(options: &LoadOptions) -> String {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let overrides = &options.overrides;

    let weights = &config.scoring.weights;
    let assistant = &config.assistant;
    let fields = [
        Field {
            cli_flag: overrides.database_url.as_ref().map(|_| "--database-url"),
            ..field("database.url", &config.database.url, "DUKAAN_DATABASE_URL")
        },
        field(
            "database.max_connections",
            config.database.max_connections,
            "DUKAAN_DATABASE_MAX_CONNECTIONS",
        ),
        field(
            "database.timeout_secs",
            config.database.timeout_secs,
            "DUKAAN_DATABASE_TIMEOUT_SECS",
        ),
        Field {
            cli_flag: overrides.cache_backend.map(|_| "--cache-backend"),
            ..field("cache.backend", config.cache.backend.as_str(), "DUKAAN_CACHE_BACKEND")
        },
        field("cache.capacity", config.cache.capacity, "DUKAAN_CACHE_CAPACITY"),
        field(
            "cache.homepage_ttl_secs",
            config.cache.homepage_ttl_secs,
            "DUKAAN_CACHE_HOMEPAGE_TTL_SECS",
        ),
        field(
            "cache.product_ttl_secs",
            config.cache.product_ttl_secs,
            "DUKAAN_CACHE_PRODUCT_TTL_SECS",
        ),
        field(
            "cache.search_ttl_secs",
            config.cache.search_ttl_secs,
            "DUKAAN_CACHE_SEARCH_TTL_SECS",
        ),
        field("scoring.weights.affinity", weights.affinity, "DUKAAN_SCORING_WEIGHT_AFFINITY"),
        field("scoring.weights.proximity", weights.proximity, "DUKAAN_SCORING_WEIGHT_PROXIMITY"),
        field("scoring.weights.purchase", weights.purchase, "DUKAAN_SCORING_WEIGHT_PURCHASE"),
        field("scoring.weights.deal", weights.deal, "DUKAAN_SCORING_WEIGHT_DEAL"),
        field("assistant.min_margin", assistant.min_margin, "DUKAAN_ASSISTANT_MIN_MARGIN"),
        field(
            "assistant.shopping_list_size",
            assistant.shopping_list_size,
            "DUKAAN_ASSISTANT_SHOPPING_LIST_SIZE",
        ),
        field(
            "assistant.trend_window_days",
            assistant.trend_window_days,
            "DUKAAN_ASSISTANT_TREND_WINDOW_DAYS",
        ),
        Field {
            cli_flag: overrides.log_level.as_ref().map(|_| "--log-level"),
            ..field("logging.level", &config.logging.level, "DUKAAN_LOGGING_LEVEL")
        },
        Field {
            cli_flag: overrides.log_format.map(|_| "--log-format"),
            ..field(
                "logging.format",
                format!("{:?}", config.logging.format),
                "DUKAAN_LOGGING_FORMAT",
            )
        },
    ];

    let mut lines =
        vec!["effective config (source precedence: cli > env > file > default):".to_string()];
    for field in &fields {
        let source =
            field_source(field, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(field.key, &field.value, source));
    }
    let seasons = assistant.seasons.iter().map(|season| season.name.as_str()).collect::<Vec<_>>();
    let seasons_source =
        file_or_default("assistant.seasons", config_file_doc.as_ref(), config_file_path.as_deref());
    let seasons = format!("[{}]", seasons.join(", "));
    lines.push(render_line("assistant.seasons", &seasons, seasons_source));

    lines.join("\n")
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    let root = PathBuf::from("dukaan.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/dukaan.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    field: &Field,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(flag) = field.cli_flag {
        return format!("cli ({flag})");
    }

    if env::var_os(field.env_key).is_some() {
        return format!("env ({})", field.env_key);
    }

    file_or_default(field.key, config_file_doc, config_file_path)
}

fn file_or_default(
    key_path: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use super::contains_path;
    use toml::Value;

    #[test]
    fn nested_keys_are_found_in_the_config_document() {
        let doc: Value = "[scoring.weights]\naffinity = 0.4\n".parse().expect("toml");

        assert!(contains_path(&doc, "scoring.weights.affinity"));
        assert!(!contains_path(&doc, "scoring.weights.deal"));
        assert!(!contains_path(&doc, "cache"));
    }
}
