//! Schema for users and the refresh token ledger.
//!
//! SQL lives in `bazaar_core/migrations/` and is embedded at compile time.

use sqlx::PgPool;
use sqlx::migrate::{MigrateError, Migrator};
use tracing::info;

/// Embedded migrations, exposed so tests can use `#[sqlx::test(migrator = ...)]`.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Bring the database up to the latest schema.
pub async fn migrate(pool: &PgPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await?;
    info!(
        migrations = MIGRATOR.iter().count(),
        "database schema up to date"
    );
    Ok(())
}
