//! Token lifecycle: issuance, validation, refresh and revocation.
//!
//! Every validation runs the same pipeline: blocked check on the unverified
//! subject, signature, expiry, revocation. Credential failures feed the
//! attempt guard so that a subject guessing tokens is blocked the same way as
//! one guessing passwords.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info, warn};

use bastion_core::{AppError, AppResult, SubjectId};
use bastion_domain::{
    AccessConfiguration, AttemptKey, IssuedToken, TokenClaims, TokenId, TokenRejection,
};

use crate::{
    AccessConfigurationService, AttemptGuardService, AuthEvent, AuthEventKind, AuthEventOutcome,
    AuthEventService, Clock, RevocationRepository, TokenCodec, TokenDecodeError,
};

/// Lifetime and policy flags for issued tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPolicy {
    /// Value of the `iss` claim.
    pub issuer: String,
    /// Lifetime of a freshly issued token.
    pub ttl: TimeDelta,
    /// How long after expiry a token may still be refreshed. Zero disables.
    pub refresh_grace: TimeDelta,
    /// Whether refreshing revokes the presented token.
    pub revoke_on_refresh: bool,
    /// Whether presenting a revoked token counts as a failed attempt.
    pub count_revoked_as_failure: bool,
}

impl TokenPolicy {
    /// Default issuer name.
    pub const DEFAULT_ISSUER: &'static str = "bastion";
    /// Default token lifetime in seconds.
    pub const DEFAULT_TTL_SECONDS: i64 = 60 * 60;
    /// Default refresh grace window in seconds.
    pub const DEFAULT_REFRESH_GRACE_SECONDS: i64 = 5 * 60;
    /// Upper bound for both the lifetime and the grace window, in seconds.
    pub const MAX_LIFETIME_SECONDS: i64 = 366 * 24 * 60 * 60;

    /// Checks the policy values.
    pub fn validate(&self) -> AppResult<()> {
        if self.issuer.trim().is_empty() {
            return Err(AppError::Validation(
                "token issuer must not be empty".to_owned(),
            ));
        }
        if self.ttl <= TimeDelta::zero() {
            return Err(AppError::Validation(
                "token ttl must be greater than zero".to_owned(),
            ));
        }
        if self.refresh_grace < TimeDelta::zero() {
            return Err(AppError::Validation(
                "refresh grace must not be negative".to_owned(),
            ));
        }
        let max_lifetime = TimeDelta::seconds(Self::MAX_LIFETIME_SECONDS);
        if self.ttl > max_lifetime || self.refresh_grace > max_lifetime {
            return Err(AppError::Validation(format!(
                "token ttl and refresh grace must not exceed {} seconds",
                Self::MAX_LIFETIME_SECONDS
            )));
        }

        Ok(())
    }
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            issuer: Self::DEFAULT_ISSUER.to_owned(),
            ttl: TimeDelta::seconds(Self::DEFAULT_TTL_SECONDS),
            refresh_grace: TimeDelta::seconds(Self::DEFAULT_REFRESH_GRACE_SECONDS),
            revoke_on_refresh: true,
            count_revoked_as_failure: false,
        }
    }
}

/// Request metadata attached to audit events and used as the fallback key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerContext {
    /// Caller IP address if available.
    pub ip_address: Option<String>,
    /// Caller user-agent if available.
    pub user_agent: Option<String>,
}

impl CallerContext {
    /// Key used for tokens whose subject cannot be read.
    #[must_use]
    pub fn fallback_key(&self) -> AttemptKey {
        AttemptKey::fallback(self.ip_address.as_deref().unwrap_or_default())
    }
}

/// Claims of a token that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedToken {
    /// Token subject.
    pub subject: SubjectId,
    /// Token identifier.
    pub token_id: TokenId,
    /// Permission snapshot embedded at issuance.
    pub access: AccessConfiguration,
    /// Digest of the snapshot.
    pub digest: String,
    /// Issued-at instant.
    pub issued_at: DateTime<Utc>,
    /// Expiry instant.
    pub expires_at: DateTime<Utc>,
}

impl From<TokenClaims> for ValidatedToken {
    fn from(claims: TokenClaims) -> Self {
        let issued_at = claims.issued_at();
        let expires_at = claims.expires_at();
        Self {
            subject: claims.sub,
            token_id: claims.jti,
            access: claims.access,
            digest: claims.digest,
            issued_at,
            expires_at,
        }
    }
}

/// Result of validating a presented token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenValidation {
    /// The token is authentic, current and not revoked.
    Valid(ValidatedToken),
    /// The token was refused.
    Rejected(TokenRejection),
}

/// Result of refreshing a presented token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new token was issued.
    Refreshed(IssuedToken),
    /// The presented token was refused.
    Rejected(TokenRejection),
}

/// What a revocation request names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevocationTarget {
    /// An encoded token. Its signature must verify.
    Token(String),
    /// A bare token id. Without an expiry the longest possible lifetime is assumed.
    TokenId {
        /// Token identifier.
        token_id: TokenId,
        /// Expiry of the token, if known.
        expires_at: Option<DateTime<Utc>>,
    },
}

/// Application service for the token lifecycle.
#[derive(Clone)]
pub struct TokenService {
    codec: Arc<dyn TokenCodec>,
    revocations: Arc<dyn RevocationRepository>,
    access_configurations: AccessConfigurationService,
    attempt_guard: AttemptGuardService,
    auth_events: AuthEventService,
    policy: TokenPolicy,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    /// Creates a new token service.
    #[must_use]
    pub fn new(
        codec: Arc<dyn TokenCodec>,
        revocations: Arc<dyn RevocationRepository>,
        access_configurations: AccessConfigurationService,
        attempt_guard: AttemptGuardService,
        auth_events: AuthEventService,
        policy: TokenPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            codec,
            revocations,
            access_configurations,
            attempt_guard,
            auth_events,
            policy,
            clock,
        }
    }

    /// Returns the active policy.
    #[must_use]
    pub fn policy(&self) -> &TokenPolicy {
        &self.policy
    }

    async fn record(
        &self,
        kind: AuthEventKind,
        subject: Option<&SubjectId>,
        outcome: AuthEventOutcome,
        caller: &CallerContext,
    ) -> AppResult<()> {
        self.auth_events
            .record_event(AuthEvent {
                subject: subject.cloned(),
                kind,
                outcome,
                ip_address: caller.ip_address.clone(),
                user_agent: caller.user_agent.clone(),
            })
            .await
    }

    async fn sign(&self, subject: SubjectId, now: DateTime<Utc>) -> AppResult<IssuedToken> {
        let access = self.access_configurations.resolve(&subject).await?;
        let claims = TokenClaims::new(
            self.policy.issuer.as_str(),
            subject,
            access,
            now,
            self.policy.ttl,
        );
        let token = self.codec.encode(&claims)?;
        let expires_at = claims.expires_at();

        Ok(IssuedToken {
            token,
            token_id: claims.jti,
            subject: claims.sub,
            expires_at,
            digest: claims.digest,
        })
    }

    /// Runs the validation pipeline. `grace` widens the expiry check.
    async fn inspect(
        &self,
        token: &str,
        caller: &CallerContext,
        grace: TimeDelta,
    ) -> AppResult<Inspection> {
        let Some(subject) = self.codec.peek_subject(token) else {
            let key = caller.fallback_key();
            if self.attempt_guard.is_blocked(&key).await? {
                return Ok(Inspection::rejected(TokenRejection::Blocked, None));
            }
            return self.reject(&key, TokenRejection::Malformed, None).await;
        };

        let key = AttemptKey::subject(&subject);
        if self.attempt_guard.is_blocked(&key).await? {
            debug!(subject = %subject, "token presented for blocked subject");
            return Ok(Inspection::rejected(TokenRejection::Blocked, Some(subject)));
        }

        let claims = match self.codec.decode(token) {
            Ok(claims) if claims.digest_matches() => claims,
            Ok(_) | Err(TokenDecodeError::Malformed) => {
                return self
                    .reject(&key, TokenRejection::Malformed, Some(subject))
                    .await;
            }
            Err(TokenDecodeError::InvalidSignature) => {
                warn!(subject = %subject, "token signature did not verify");
                return self
                    .reject(&key, TokenRejection::InvalidSignature, Some(subject))
                    .await;
            }
        };

        let now = self.clock.now();
        if claims.is_expired_at(now - grace) {
            return self
                .reject(&key, TokenRejection::Expired, Some(subject))
                .await;
        }

        if self.revocations.is_revoked(claims.jti, now).await? {
            return self
                .reject(&key, TokenRejection::Revoked, Some(subject))
                .await;
        }

        self.attempt_guard.record_success(&key).await?;
        Ok(Inspection::Accepted(claims))
    }

    /// Counts the rejection against `key` when policy says it is a failure.
    async fn reject(
        &self,
        key: &AttemptKey,
        rejection: TokenRejection,
        subject: Option<SubjectId>,
    ) -> AppResult<Inspection> {
        let counts = rejection.is_credential_failure()
            || (rejection == TokenRejection::Revoked && self.policy.count_revoked_as_failure);
        if counts {
            self.attempt_guard.record_failure(key).await?;
        }

        Ok(Inspection::rejected(rejection, subject))
    }
}

enum Inspection {
    Accepted(TokenClaims),
    Rejected {
        rejection: TokenRejection,
        subject: Option<SubjectId>,
    },
}

impl Inspection {
    fn rejected(rejection: TokenRejection, subject: Option<SubjectId>) -> Self {
        Self::Rejected { rejection, subject }
    }
}

mod issue;
mod refresh;
mod revoke;
mod validate;
