use dukaan_core::config::LoadOptions;
use dukaan_db::{connect_with_config, migrations, SeedDataset, SeedResult};

use crate::commands::{
    current_thread_runtime, load_config, CommandResult, StepError, EXIT_DB_CONNECTIVITY,
    EXIT_MIGRATION, EXIT_SEED_VERIFICATION,
};

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match load_config(options) {
        Ok(config) => config,
        Err(error) => return CommandResult::step_failure("seed", error),
    };
    let runtime = match current_thread_runtime() {
        Ok(runtime) => runtime,
        Err(error) => return CommandResult::step_failure("seed", error),
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), EXIT_DB_CONNECTIVITY))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), EXIT_MIGRATION))?;

        let seeded = SeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), EXIT_MIGRATION))?;

        let verification = SeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), EXIT_SEED_VERIFICATION))?;

        let run_result: Result<SeedResult, StepError> = if verification.all_present {
            Ok(seeded)
        } else {
            let failed = verification
                .checks
                .iter()
                .filter_map(|(check, passed)| (!passed).then_some(*check))
                .collect::<Vec<_>>();
            Err(("seed_verification", verification_message(&failed), EXIT_SEED_VERIFICATION))
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", summary(&seeded)),
        Err(error) => CommandResult::step_failure("seed", error),
    }
}

fn summary(seeded: &SeedResult) -> String {
    format!(
        "demo marketplace loaded: {} business profiles, {} products, {} purchase lines, {} deals",
        seeded.profiles, seeded.products, seeded.purchases, seeded.deals
    )
}

fn verification_message(failed_checks: &[&str]) -> String {
    if failed_checks.is_empty() {
        "some seed data failed to load".to_string()
    } else {
        format!("seed verification failed for checks: {}", failed_checks.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::verification_message;

    #[test]
    fn verification_error_message_targets_failed_checks() {
        assert_eq!(
            verification_message(&["deal-products", "out-of-stock-product"]),
            "seed verification failed for checks: deal-products, out-of-stock-product"
        );
    }

    #[test]
    fn verification_error_message_falls_back_to_generic_when_no_labels() {
        assert_eq!(verification_message(&[]), "some seed data failed to load");
    }
}
