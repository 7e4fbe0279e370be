use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MigrationStatus {
    pub applied: usize,
    pub known: usize,
}

impl MigrationStatus {
    pub fn is_current(&self) -> bool {
        self.applied >= self.known
    }
}

/// Applied versus bundled migrations. A database that was never migrated
/// reports zero applied.
pub async fn status(pool: &DbPool) -> Result<MigrationStatus, sqlx::Error> {
    let known = MIGRATOR.iter().filter(|m| m.migration_type.is_up_migration()).count();

    let tracked: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;
    if tracked == 0 {
        return Ok(MigrationStatus { applied: 0, known });
    }

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await?;
    Ok(MigrationStatus { applied: usize::try_from(applied).unwrap_or_default(), known })
}
