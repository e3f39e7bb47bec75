use std::sync::Arc;

use bastion_application::{
    AccessConfigurationRepository, AttemptCounterRepository, AuthEventRepository,
    RevocationRepository,
};
use bastion_infrastructure::{
    InMemoryAccessConfigurationRepository, InMemoryAttemptCounterRepository,
    InMemoryRevocationRepository, PostgresAccessConfigurationRepository,
    PostgresAttemptCounterRepository, PostgresAuthEventRepository, PostgresRevocationRepository,
    TracingAuthEventRepository,
};
use sqlx::PgPool;

/// Storage adapters behind the application ports.
pub struct Adapters {
    pub attempt_counters: Arc<dyn AttemptCounterRepository>,
    pub revocations: Arc<dyn RevocationRepository>,
    pub access_configurations: Arc<dyn AccessConfigurationRepository>,
    pub auth_events: Arc<dyn AuthEventRepository>,
}

impl Adapters {
    pub fn in_memory() -> Self {
        Self {
            attempt_counters: Arc::new(InMemoryAttemptCounterRepository::new()),
            revocations: Arc::new(InMemoryRevocationRepository::new()),
            access_configurations: Arc::new(InMemoryAccessConfigurationRepository::new()),
            auth_events: Arc::new(TracingAuthEventRepository),
        }
    }

    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            attempt_counters: Arc::new(PostgresAttemptCounterRepository::new(pool.clone())),
            revocations: Arc::new(PostgresRevocationRepository::new(pool.clone())),
            access_configurations: Arc::new(PostgresAccessConfigurationRepository::new(
                pool.clone(),
            )),
            auth_events: Arc::new(PostgresAuthEventRepository::new(pool.clone())),
        }
    }

    pub fn with_revocations(mut self, revocations: Arc<dyn RevocationRepository>) -> Self {
        self.revocations = revocations;
        self
    }

    #[cfg(test)]
    pub fn with_access_configurations(
        mut self,
        access_configurations: Arc<dyn AccessConfigurationRepository>,
    ) -> Self {
        self.access_configurations = access_configurations;
        self
    }
}
