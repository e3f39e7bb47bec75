use std::time::Duration;

use bastion_core::{AppError, AppResult};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

const MAX_CONNECTIONS: u32 = 10;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

static MIGRATOR: Migrator = sqlx::migrate!("../../crates/infrastructure/migrations");

/// Opens the pool backing counters, revocations, access documents and the
/// audit trail, then brings the schema up to date.
///
/// A request waits at most `ACQUIRE_TIMEOUT` for a connection.
pub async fn connect_and_migrate(database_url: &str) -> AppResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    MIGRATOR
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;
    info!(
        migrations = MIGRATOR.iter().count(),
        max_connections = MAX_CONNECTIONS,
        "database schema is current"
    );

    Ok(pool)
}
