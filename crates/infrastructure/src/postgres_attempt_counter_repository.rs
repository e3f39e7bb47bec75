//! PostgreSQL-backed attempt counters using the `attempt_counters` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bastion_application::{AttemptCounterRepository, GuardStats};
use bastion_core::{AppError, AppResult};
use bastion_domain::{AttemptCounter, AttemptKey, AttemptPolicy};

/// PostgreSQL implementation of the attempt counter repository port.
#[derive(Clone)]
pub struct PostgresAttemptCounterRepository {
    pool: PgPool,
}

impl PostgresAttemptCounterRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttemptCounterRepository for PostgresAttemptCounterRepository {
    async fn record_failure(
        &self,
        key: &AttemptKey,
        policy: &AttemptPolicy,
        now: DateTime<Utc>,
    ) -> AppResult<AttemptCounter> {
        let threshold = i32::try_from(policy.failure_threshold()).map_err(|error| {
            AppError::Validation(format!("invalid failure threshold: {error}"))
        })?;
        let block_seconds = policy.block_duration().num_milliseconds() as f64 / 1_000.0;

        // Single UPSERT keeps concurrent failures for one key from being lost.
        // Active blocks are left untouched; an elapsed block restarts at one.
        let row = sqlx::query_as::<_, AttemptCounterRow>(
            r#"
            INSERT INTO attempt_counters (key, failed_count, last_attempt_at, blocked_until)
            VALUES (
                $1,
                1,
                $2,
                CASE WHEN 1 >= $3 THEN $2 + make_interval(secs => $4::float8) ELSE NULL END
            )
            ON CONFLICT (key) DO UPDATE
            SET
                failed_count = CASE
                    WHEN attempt_counters.blocked_until > $2 THEN attempt_counters.failed_count
                    WHEN attempt_counters.blocked_until IS NOT NULL THEN 1
                    ELSE attempt_counters.failed_count + 1
                END,
                last_attempt_at = CASE
                    WHEN attempt_counters.blocked_until > $2 THEN attempt_counters.last_attempt_at
                    ELSE $2
                END,
                blocked_until = CASE
                    WHEN attempt_counters.blocked_until > $2 THEN attempt_counters.blocked_until
                    WHEN attempt_counters.blocked_until IS NOT NULL THEN
                        CASE WHEN 1 >= $3 THEN $2 + make_interval(secs => $4::float8) END
                    WHEN attempt_counters.failed_count + 1 >= $3
                        THEN $2 + make_interval(secs => $4::float8)
                    ELSE NULL
                END
            RETURNING key, failed_count, last_attempt_at, blocked_until
            "#,
        )
        .bind(key.as_str())
        .bind(now)
        .bind(threshold)
        .bind(block_seconds)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to record failed attempt: {error}"))
        })?;

        row.try_into()
    }

    async fn record_success(&self, key: &AttemptKey, now: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE attempt_counters
            SET failed_count = 0, blocked_until = NULL, last_attempt_at = $2
            WHERE key = $1
            "#,
        )
        .bind(key.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to record successful attempt: {error}"))
        })?;

        Ok(())
    }

    async fn find(&self, key: &AttemptKey) -> AppResult<Option<AttemptCounter>> {
        let row = sqlx::query_as::<_, AttemptCounterRow>(
            r#"
            SELECT key, failed_count, last_attempt_at, blocked_until
            FROM attempt_counters
            WHERE key = $1
            "#,
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load attempt counter: {error}")))?;

        row.map(AttemptCounter::try_from).transpose()
    }

    async fn list_blocked(&self, now: DateTime<Utc>) -> AppResult<Vec<AttemptCounter>> {
        let rows = sqlx::query_as::<_, AttemptCounterRow>(
            r#"
            SELECT key, failed_count, last_attempt_at, blocked_until
            FROM attempt_counters
            WHERE blocked_until > $1
            ORDER BY blocked_until ASC, key ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list blocked attempt counters: {error}"))
        })?;

        rows.into_iter().map(AttemptCounter::try_from).collect()
    }

    async fn stats(&self, now: DateTime<Utc>) -> AppResult<GuardStats> {
        let row = sqlx::query_as::<_, GuardStatsRow>(
            r#"
            SELECT
                COUNT(*) AS tracked_keys,
                COUNT(*) FILTER (
                    WHERE blocked_until IS NULL AND failed_count > 0
                ) AS counting_keys,
                COUNT(*) FILTER (WHERE blocked_until > $1) AS blocked_keys,
                COALESCE(
                    SUM(failed_count) FILTER (
                        WHERE blocked_until IS NULL OR blocked_until > $1
                    ),
                    0
                )::BIGINT AS total_failures
            FROM attempt_counters
            "#,
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to aggregate attempt counters: {error}"))
        })?;

        Ok(GuardStats {
            tracked_keys: non_negative(row.tracked_keys),
            counting_keys: non_negative(row.counting_keys),
            blocked_keys: non_negative(row.blocked_keys),
            total_failures: non_negative(row.total_failures),
        })
    }

    async fn delete_sweepable(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM attempt_counters
            WHERE (blocked_until IS NOT NULL AND blocked_until <= $1)
               OR (blocked_until IS NULL AND failed_count = 0)
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to sweep attempt counters: {error}"))
        })?;

        Ok(result.rows_affected())
    }
}

fn non_negative(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

#[derive(Debug, sqlx::FromRow)]
struct AttemptCounterRow {
    key: String,
    failed_count: i32,
    last_attempt_at: DateTime<Utc>,
    blocked_until: Option<DateTime<Utc>>,
}

impl TryFrom<AttemptCounterRow> for AttemptCounter {
    type Error = AppError;

    fn try_from(row: AttemptCounterRow) -> Result<Self, Self::Error> {
        Ok(Self {
            key: AttemptKey::from_storage(row.key)?,
            failed_count: u32::try_from(row.failed_count).map_err(|error| {
                AppError::Internal(format!("invalid stored failed_count: {error}"))
            })?,
            last_attempt_at: row.last_attempt_at,
            blocked_until: row.blocked_until,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct GuardStatsRow {
    tracked_keys: i64,
    counting_keys: i64,
    blocked_keys: i64,
    total_failures: i64,
}
