//! Postgres pool for the direct storage path.
//!
//! Only used when `DATABASE_URL` is set; the default deployment reaches the
//! same schema through PostgREST and never opens a pool.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

const MAX_CONNECTIONS: u32 = 5;

/// Connect and bring the `profiles`/`survey_responses` schema up to date.
///
/// # Errors
///
/// Returns an error if the connection or a migration fails.
pub async fn connect_and_migrate(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(database_url)
        .await?;

    let migrator = sqlx::migrate!("src/db/migrations");
    migrator.run(&pool).await?;
    info!(migrations = migrator.iter().count(), "survey schema migrated");

    Ok(pool)
}
