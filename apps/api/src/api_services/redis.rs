use bastion_core::{AppError, AppResult};
use bastion_infrastructure::RedisRevocationRepository;

/// Redis handles for the shared revocation set.
pub struct RedisRevocations {
    /// Client kept for the readiness check.
    pub client: redis::Client,
    pub repository: RedisRevocationRepository,
}

/// Opens the revocation set at `redis_url`.
///
/// Only the URL is parsed here. Connections are made per call, so an
/// unreachable server shows up in readiness and on the first revocation.
pub fn open_redis_revocations(redis_url: &str) -> AppResult<RedisRevocations> {
    let client = redis::Client::open(redis_url)
        .map_err(|error| AppError::Validation(format!("invalid REDIS_URL: {error}")))?;
    let repository = RedisRevocationRepository::new(
        client.clone(),
        RedisRevocationRepository::DEFAULT_KEY_PREFIX,
    );

    Ok(RedisRevocations { client, repository })
}
