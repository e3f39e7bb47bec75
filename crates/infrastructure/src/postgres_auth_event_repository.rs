use async_trait::async_trait;
use sqlx::PgPool;

use bastion_application::{AuthEvent, AuthEventRepository};
use bastion_core::{AppError, AppResult};

/// PostgreSQL audit trail for token lifecycle events.
///
/// The outcome column holds `success`, `rejected` or `failed`; the reason
/// column carries the rejection code and stays null on success.
#[derive(Clone)]
pub struct PostgresAuthEventRepository {
    pool: PgPool,
}

impl PostgresAuthEventRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthEventRepository for PostgresAuthEventRepository {
    async fn append_event(&self, event: AuthEvent) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO auth_events (subject, event_type, outcome, reason, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event.subject.as_ref().map(|subject| subject.as_str()))
        .bind(event.kind.as_str())
        .bind(event.outcome.as_str())
        .bind(event.outcome.reason())
        .bind(event.ip_address)
        .bind(event.user_agent)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to append {} event: {error}",
                event.kind.as_str()
            ))
        })?;

        Ok(())
    }
}
