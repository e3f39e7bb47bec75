use async_trait::async_trait;
use sqlx::PgPool;

use bastion_application::AccessConfigurationRepository;
use bastion_core::{AppError, AppResult, SubjectId};

/// Reads access documents from `subject_access_configurations`.
#[derive(Clone)]
pub struct PostgresAccessConfigurationRepository {
    pool: PgPool,
}

impl PostgresAccessConfigurationRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessConfigurationRepository for PostgresAccessConfigurationRepository {
    async fn find_document(&self, subject: &SubjectId) -> AppResult<Option<serde_json::Value>> {
        sqlx::query_scalar::<_, serde_json::Value>(
            r#"
            SELECT document
            FROM subject_access_configurations
            WHERE subject_id = $1
            "#,
        )
        .bind(subject.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load access configuration: {error}"))
        })
    }
}
