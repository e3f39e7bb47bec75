//! Redis-backed revocation set.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{AsyncCommands, Script};

use bastion_application::RevocationRepository;
use bastion_core::{AppError, AppResult};
use bastion_domain::TokenId;

/// Adds the key if absent. An existing key keeps the longer of its current
/// and the requested TTL. Returns 1 when the key was added.
const REVOKE_SCRIPT: &str = r#"
local key = KEYS[1]
local ttl = tonumber(ARGV[1])

if redis.call('SET', key, '1', 'NX', 'EX', ttl) then
  return 1
end

local current = redis.call('TTL', key)
if current >= 0 and current < ttl then
  redis.call('EXPIRE', key, ttl)
end
return 0
"#;

/// Redis implementation of the revocation set.
///
/// Each entry is a key with a TTL matching the token's remaining lifetime, so
/// the set prunes itself.
#[derive(Clone)]
pub struct RedisRevocationRepository {
    client: redis::Client,
    key_prefix: String,
}

impl RedisRevocationRepository {
    /// Key namespace shared by the API and the worker.
    pub const DEFAULT_KEY_PREFIX: &'static str = "bastion:revoked";

    /// Creates a repository with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn key_for(&self, token_id: TokenId) -> String {
        format!("{}:{token_id}", self.key_prefix)
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))
    }
}

#[async_trait]
impl RevocationRepository for RedisRevocationRepository {
    async fn revoke(&self, token_id: TokenId, expires_at: DateTime<Utc>) -> AppResult<bool> {
        let ttl_seconds = (expires_at - Utc::now()).num_seconds();
        if ttl_seconds <= 0 {
            return Ok(false);
        }

        let mut connection = self.connection().await?;
        let added: i64 = Script::new(REVOKE_SCRIPT)
            .key(self.key_for(token_id))
            .arg(ttl_seconds)
            .invoke_async(&mut connection)
            .await
            .map_err(|error| AppError::Internal(format!("failed to write revocation: {error}")))?;

        Ok(added == 1)
    }

    async fn is_revoked(&self, token_id: TokenId, _now: DateTime<Utc>) -> AppResult<bool> {
        let mut connection = self.connection().await?;
        connection
            .exists(self.key_for(token_id))
            .await
            .map_err(|error| AppError::Internal(format!("failed to read revocation: {error}")))
    }

    async fn delete_expired(&self, _now: DateTime<Utc>) -> AppResult<u64> {
        // Entries expire via TTL.
        Ok(0)
    }
}
