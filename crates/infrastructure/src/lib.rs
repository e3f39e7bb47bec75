//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_access_configuration_repository;
mod in_memory_attempt_counter_repository;
mod in_memory_revocation_repository;
mod jwt_token_codec;
mod postgres_access_configuration_repository;
mod postgres_attempt_counter_repository;
mod postgres_auth_event_repository;
mod postgres_revocation_repository;
mod redis_revocation_repository;
mod tracing_auth_event_repository;

pub use in_memory_access_configuration_repository::InMemoryAccessConfigurationRepository;
pub use in_memory_attempt_counter_repository::InMemoryAttemptCounterRepository;
pub use in_memory_revocation_repository::InMemoryRevocationRepository;
pub use jwt_token_codec::{JwtTokenCodec, MIN_SIGNING_SECRET_BYTES};
pub use postgres_access_configuration_repository::PostgresAccessConfigurationRepository;
pub use postgres_attempt_counter_repository::PostgresAttemptCounterRepository;
pub use postgres_auth_event_repository::PostgresAuthEventRepository;
pub use postgres_revocation_repository::PostgresRevocationRepository;
pub use redis_revocation_repository::RedisRevocationRepository;
pub use tracing_auth_event_repository::TracingAuthEventRepository;
