use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bastion_core::{AppResult, SubjectId};
use bastion_domain::{TokenClaims, TokenId};

/// Why an encoded token could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenDecodeError {
    /// The token is not structurally a signed token carrying our claims.
    Malformed,
    /// The signature or issuer does not verify.
    InvalidSignature,
}

/// Port for signing and verifying bearer tokens.
///
/// `decode` verifies signature and issuer only. Expiry is evaluated by the
/// caller against its own clock so refresh can honour a grace window.
pub trait TokenCodec: Send + Sync {
    /// Signs the claims into an encoded token.
    fn encode(&self, claims: &TokenClaims) -> AppResult<String>;

    /// Reads the subject claim without verifying anything.
    fn peek_subject(&self, token: &str) -> Option<SubjectId>;

    /// Verifies and decodes the claims.
    fn decode(&self, token: &str) -> Result<TokenClaims, TokenDecodeError>;
}

/// Repository port for the revocation set.
#[async_trait]
pub trait RevocationRepository: Send + Sync {
    /// Adds a token id retained until at least `expires_at`.
    ///
    /// Revoking an id twice is not an error, and an existing entry is only
    /// ever extended. Returns `true` when this call added the id and `false`
    /// when it was already present. The check and the write are one atomic
    /// step.
    async fn revoke(&self, token_id: TokenId, expires_at: DateTime<Utc>) -> AppResult<bool>;

    /// Returns whether the id is in the set at `now`.
    async fn is_revoked(&self, token_id: TokenId, now: DateTime<Utc>) -> AppResult<bool>;

    /// Drops entries whose expiry has passed. Returns the number removed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;
}

/// Read-only port onto the external store of subject access documents.
#[async_trait]
pub trait AccessConfigurationRepository: Send + Sync {
    /// Returns the raw access document for a subject, if one is stored.
    async fn find_document(&self, subject: &SubjectId) -> AppResult<Option<serde_json::Value>>;
}
