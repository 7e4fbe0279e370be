//! Wiring shared by the commands that answer engine requests.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use dukaan_agent::Assistant;
use dukaan_core::cache::{CacheStore, MokaCacheStore, ResponseCache};
use dukaan_core::config::{AppConfig, CacheBackend, LoadOptions};
use dukaan_core::errors::EngineError;
use dukaan_core::recommendations::RecommendationService;
use dukaan_core::scoring::ScoringEngine;
use dukaan_core::signals::SignalStore;
use dukaan_db::{connect_with_config, migrations, DbPool, SqlCacheStore, SqlSignalStore};

use crate::commands::{
    current_thread_runtime, load_config, CommandResult, StepError, EXIT_DB_CONNECTIVITY,
    EXIT_INTERNAL, EXIT_MIGRATION,
};

/// Service and assistant over the configured database and cache backend.
pub struct EngineRuntime {
    pub service: RecommendationService,
    pub assistant: Assistant,
}

impl EngineRuntime {
    /// Opens the pool, applies pending migrations and builds the cache
    /// backend. The sqlite backend drops rows already expired at `now`.
    pub async fn open(
        config: &AppConfig,
        now: DateTime<Utc>,
    ) -> Result<(Self, DbPool), StepError> {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), EXIT_DB_CONNECTIVITY))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), EXIT_MIGRATION))?;

        let cache_store: Arc<dyn CacheStore> = match config.cache.backend {
            CacheBackend::Memory => Arc::new(MokaCacheStore::new(config.cache.capacity)),
            CacheBackend::Sqlite => {
                let store = SqlCacheStore::new(pool.clone());
                if let Err(error) = store.purge_expired(now).await {
                    warn!(
                        event_name = "cache.sql.purge_failed",
                        error = %error,
                        "expired cache rows were not removed"
                    );
                }
                Arc::new(store)
            }
        };

        let signals: Arc<dyn SignalStore> = Arc::new(SqlSignalStore::new(pool.clone()));
        let service = RecommendationService::new(
            signals,
            ScoringEngine::new(config.scoring.clone()),
            ResponseCache::new(cache_store),
            config.cache.ttls(),
        );
        let assistant =
            Assistant::with_recommender(service.recommender().clone(), config.assistant.clone())
                .map_err(|error| ("assistant_init", error.to_string(), EXIT_INTERNAL))?;

        info!(
            event_name = "cli.engine.ready",
            cache_backend = config.cache.backend.as_str(),
            "engine runtime initialized"
        );
        Ok((Self { service, assistant }, pool))
    }
}

/// Runs one engine request and wraps its answer in the command envelope.
///
/// Every invocation gets a fresh correlation id, logged with the request and
/// returned in the envelope on success and on engine failure alike.
pub fn run_request<F, Fut, T>(
    command: &'static str,
    options: &LoadOptions,
    at: Option<DateTime<Utc>>,
    request: F,
) -> CommandResult
where
    F: FnOnce(EngineRuntime, DateTime<Utc>) -> Fut,
    Fut: Future<Output = Result<(String, T), EngineError>>,
    T: Serialize,
{
    let config = match load_config(options) {
        Ok(config) => config,
        Err(error) => return CommandResult::step_failure(command, error),
    };
    let runtime = match current_thread_runtime() {
        Ok(runtime) => runtime,
        Err(error) => return CommandResult::step_failure(command, error),
    };

    let correlation_id = Uuid::new_v4().to_string();
    let now = at.unwrap_or_else(Utc::now);
    info!(
        event_name = "cli.command.started",
        command,
        correlation_id = %correlation_id,
        now = %now,
        "engine command started"
    );

    runtime.block_on(async {
        let (engine, pool) = match EngineRuntime::open(&config, now).await {
            Ok(opened) => opened,
            Err(error) => return CommandResult::step_failure(command, error),
        };

        let outcome = request(engine, now).await;
        pool.close().await;

        match outcome {
            Ok((message, data)) => match serde_json::to_value(&data) {
                Ok(data) => {
                    info!(
                        event_name = "cli.command.completed",
                        command,
                        correlation_id = %correlation_id,
                        "engine command completed"
                    );
                    CommandResult::success_with_data(command, message, &correlation_id, data)
                }
                Err(error) => CommandResult::failure(
                    command,
                    "serialization",
                    error.to_string(),
                    EXIT_INTERNAL,
                ),
            },
            Err(error) => {
                warn!(
                    event_name = "cli.command.failed",
                    command,
                    correlation_id = %correlation_id,
                    recoverable = error.is_recoverable(),
                    error = %error,
                    "engine command failed"
                );
                CommandResult::interface_failure(command, &error.into_interface(correlation_id))
            }
        }
    })
}
