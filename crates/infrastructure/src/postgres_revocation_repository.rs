use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bastion_application::RevocationRepository;
use bastion_core::{AppError, AppResult};
use bastion_domain::TokenId;

/// PostgreSQL-backed revocation set using the `token_revocations` table.
#[derive(Clone)]
pub struct PostgresRevocationRepository {
    pool: PgPool,
}

impl PostgresRevocationRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevocationRepository for PostgresRevocationRepository {
    async fn revoke(&self, token_id: TokenId, expires_at: DateTime<Utc>) -> AppResult<bool> {
        // xmax is zero only for a row this statement inserted.
        sqlx::query_scalar::<_, bool>(
            r#"
            INSERT INTO token_revocations (token_id, expires_at)
            VALUES ($1, $2)
            ON CONFLICT (token_id) DO UPDATE
            SET expires_at = GREATEST(token_revocations.expires_at, EXCLUDED.expires_at)
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(token_id.as_uuid())
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to revoke token: {error}")))
    }

    async fn is_revoked(&self, token_id: TokenId, now: DateTime<Utc>) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM token_revocations
                WHERE token_id = $1 AND expires_at > $2
            )
            "#,
        )
        .bind(token_id.as_uuid())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to check revocation: {error}")))
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM token_revocations
            WHERE expires_at <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to purge expired revocations: {error}"))
        })?;

        Ok(result.rows_affected())
    }
}
