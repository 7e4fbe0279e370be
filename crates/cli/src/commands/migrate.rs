use dukaan_core::config::LoadOptions;
use dukaan_db::{connect_with_config, migrations};

use crate::commands::{
    current_thread_runtime, load_config, CommandResult, StepError, EXIT_DB_CONNECTIVITY,
    EXIT_MIGRATION,
};

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match load_config(options) {
        Ok(config) => config,
        Err(error) => return CommandResult::step_failure("migrate", error),
    };
    let runtime = match current_thread_runtime() {
        Ok(runtime) => runtime,
        Err(error) => return CommandResult::step_failure("migrate", error),
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), EXIT_DB_CONNECTIVITY))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), EXIT_MIGRATION))?;
        pool.close().await;
        Ok::<(), StepError>(())
    });

    match result {
        Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
        Err(error) => CommandResult::step_failure("migrate", error),
    }
}
