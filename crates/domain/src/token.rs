use std::fmt::{Display, Formatter};
use std::str::FromStr;

use bastion_core::{AppError, SubjectId};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AccessConfiguration;

/// Unique token identifier used for revocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(Uuid);

impl TokenId {
    /// Creates a random token identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TokenId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TokenId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl FromStr for TokenId {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value)
            .map(Self)
            .map_err(|error| AppError::Validation(format!("invalid token id '{value}': {error}")))
    }
}

/// Claims embedded in a signed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Issuer name.
    pub iss: String,
    /// Subject identifier.
    pub sub: SubjectId,
    /// Token identifier.
    pub jti: TokenId,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expires-at, seconds since the Unix epoch.
    pub exp: i64,
    /// Permission snapshot taken at issuance.
    pub access: AccessConfiguration,
    /// Digest of the permission snapshot.
    pub digest: String,
}

impl TokenClaims {
    /// Builds claims for a new token.
    #[must_use]
    pub fn new(
        issuer: impl Into<String>,
        subject: SubjectId,
        access: AccessConfiguration,
        issued_at: DateTime<Utc>,
        ttl: TimeDelta,
    ) -> Self {
        let digest = access.digest();
        Self {
            iss: issuer.into(),
            sub: subject,
            jti: TokenId::new(),
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
            access,
            digest,
        }
    }

    /// Returns the issued-at instant.
    #[must_use]
    pub fn issued_at(&self) -> DateTime<Utc> {
        timestamp_to_datetime(self.iat)
    }

    /// Returns the expires-at instant.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        timestamp_to_datetime(self.exp)
    }

    /// Returns whether the token is expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    /// Returns whether the embedded digest matches the embedded snapshot.
    #[must_use]
    pub fn digest_matches(&self) -> bool {
        self.digest == self.access.digest()
    }
}

fn timestamp_to_datetime(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Why a presented token was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenRejection {
    /// The token could not be parsed.
    Malformed,
    /// The signature or issuer did not verify.
    InvalidSignature,
    /// The token is past its expiry.
    Expired,
    /// The token was explicitly revoked.
    Revoked,
    /// The subject or caller is blocked after repeated failures.
    Blocked,
}

impl TokenRejection {
    /// Returns a stable transport code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::InvalidSignature => "invalid_signature",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
            Self::Blocked => "blocked",
        }
    }

    /// Returns whether the rejection counts as a credential failure.
    #[must_use]
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            Self::Malformed | Self::InvalidSignature | Self::Expired
        )
    }
}

impl Display for TokenRejection {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// A freshly signed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// Encoded bearer token.
    pub token: String,
    /// Token identifier.
    pub token_id: TokenId,
    /// Subject the token was issued to.
    pub subject: SubjectId,
    /// Expiry instant.
    pub expires_at: DateTime<Utc>,
    /// Digest of the embedded permission snapshot.
    pub digest: String,
}
