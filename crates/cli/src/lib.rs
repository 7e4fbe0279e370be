pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use dukaan_core::config::{AppConfig, CacheBackend, ConfigOverrides, LoadOptions, LogFormat};
use dukaan_core::recommendations::SearchFilters;
use rust_decimal::Decimal;

#[derive(Debug, Parser)]
#[command(
    name = "dukaan",
    about = "Dukaan recommendation engine operator CLI",
    long_about = "Run migrations, load the demo marketplace, inspect configuration and query \
                  homepage recommendations, product suggestions, search and the assistant.",
    after_help = "Examples:\n  dukaan seed\n  dukaan homepage 1 --at 2024-10-15T10:00:00Z\n  \
                  dukaan ask 1 \"What should I stock for Diwali season?\""
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    #[arg(long, global = true, help = "Config file (default: dukaan.toml or config/dukaan.toml)")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override database.url")]
    database_url: Option<String>,
    #[arg(long, global = true, value_parser = parse_cache_backend, help = "memory or sqlite")]
    cache_backend: Option<CacheBackend>,
    #[arg(long, global = true, help = "Override logging.level")]
    log_level: Option<String>,
    #[arg(long, global = true, value_parser = parse_log_format, help = "compact, pretty or json")]
    log_format: Option<LogFormat>,
}

impl GlobalArgs {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            require_file: self.config.is_some(),
            config_path: self.config.clone(),
            overrides: ConfigOverrides {
                database_url: self.database_url.clone(),
                cache_backend: self.cache_backend,
                log_level: self.log_level.clone(),
                log_format: self.log_format,
            },
        }
    }
}

#[derive(Debug, Args)]
struct ClockArgs {
    #[arg(long, help = "Evaluate at this RFC 3339 instant instead of now")]
    at: Option<DateTime<Utc>>,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo marketplace dataset and verify it")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, cache backend, DB connectivity and schema state")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Homepage sections for a buyer")]
    Homepage {
        user_id: u64,
        #[command(flatten)]
        clock: ClockArgs,
    },
    #[command(about = "Products to show next to a product page")]
    Suggest {
        user_id: u64,
        product_id: u64,
        #[command(flatten)]
        clock: ClockArgs,
    },
    #[command(about = "Personalized product search")]
    Search {
        query: String,
        #[arg(long, default_value_t = 0, help = "Buyer id; unknown ids search anonymously")]
        user: u64,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        min_price: Option<Decimal>,
        #[arg(long)]
        max_price: Option<Decimal>,
        #[arg(long)]
        limit: Option<usize>,
        #[command(flatten)]
        clock: ClockArgs,
    },
    #[command(about = "Ask the business assistant a question")]
    Ask {
        user_id: u64,
        query: String,
        #[command(flatten)]
        clock: ClockArgs,
    },
}

fn parse_cache_backend(value: &str) -> Result<CacheBackend, String> {
    value.parse().map_err(|error: dukaan_core::config::ConfigError| error.to_string())
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    value.parse().map_err(|error: dukaan_core::config::ConfigError| error.to_string())
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.global.load_options();

    let logging = AppConfig::load(options.clone()).unwrap_or_default().logging;
    logging::init(&logging);

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(&options),
        Command::Seed => commands::seed::run(&options),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(&options) }
        }
        Command::Doctor { json } => {
            let report = commands::doctor::run(&options, json);
            let exit_code = if report.passed { 0 } else { 1 };
            commands::CommandResult { exit_code, output: report.output }
        }
        Command::Homepage { user_id, clock } => {
            commands::recommend::homepage(&options, user_id, clock.at)
        }
        Command::Suggest { user_id, product_id, clock } => {
            commands::recommend::suggest(&options, user_id, product_id, clock.at)
        }
        Command::Search { query, user, category, min_price, max_price, limit, clock } => {
            let filters = SearchFilters { category, min_price, max_price, limit };
            commands::recommend::search(&options, query, filters, user, clock.at)
        }
        Command::Ask { user_id, query, clock } => {
            commands::ask::run(&options, user_id, query, clock.at)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::{Cli, Command};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn search_flags_become_filters() {
        let cli = Cli::parse_from([
            "dukaan",
            "search",
            "rice",
            "--user",
            "1",
            "--min-price",
            "50",
            "--max-price",
            "200.5",
            "--cache-backend",
            "sqlite",
        ]);

        assert_eq!(cli.global.cache_backend, Some(dukaan_core::config::CacheBackend::Sqlite));
        let Command::Search { query, user, min_price, max_price, .. } = cli.command else {
            panic!("expected search command");
        };
        assert_eq!(query, "rice");
        assert_eq!(user, 1);
        assert_eq!(min_price, Some(rust_decimal::Decimal::new(50, 0)));
        assert_eq!(max_price, Some(rust_decimal::Decimal::new(2005, 1)));
    }

    #[test]
    fn explicit_config_path_is_required_to_exist() {
        let cli = Cli::parse_from(["dukaan", "--config", "missing.toml", "config"]);
        let options = cli.global.load_options();

        assert!(options.require_file);
        assert!(dukaan_core::config::AppConfig::load(options).is_err());
    }
}
