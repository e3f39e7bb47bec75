use std::sync::Arc;

use async_trait::async_trait;

use bastion_core::{AppResult, SubjectId};
use bastion_domain::TokenRejection;

/// Token lifecycle step an audit event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthEventKind {
    /// A token was signed for a subject.
    TokenIssued,
    /// A presented token was checked.
    TokenValidated,
    /// A token was exchanged for a fresh one.
    TokenRefreshed,
    /// A token was added to the revocation set.
    TokenRevoked,
    /// The external credential check reported a failed login.
    LoginFailed,
}

impl AuthEventKind {
    /// Returns the stable storage identifier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TokenIssued => "token_issued",
            Self::TokenValidated => "token_validated",
            Self::TokenRefreshed => "token_refreshed",
            Self::TokenRevoked => "token_revoked",
            Self::LoginFailed => "login_failed",
        }
    }
}

/// How the step an audit event describes ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEventOutcome {
    /// The step completed.
    Success,
    /// A token was refused.
    Rejected(TokenRejection),
    /// The identity store reported wrong credentials.
    InvalidCredentials,
}

impl AuthEventOutcome {
    /// Returns the stored status: `success`, `rejected` or `failed`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Rejected(_) => "rejected",
            Self::InvalidCredentials => "failed",
        }
    }

    /// Returns the reason code for anything but success.
    #[must_use]
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            Self::Success => None,
            Self::Rejected(rejection) => Some(rejection.as_str()),
            Self::InvalidCredentials => Some("invalid_credentials"),
        }
    }
}

impl std::fmt::Display for AuthEventOutcome {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.reason() {
            Some(reason) => write!(formatter, "{}:{reason}", self.as_str()),
            None => formatter.write_str(self.as_str()),
        }
    }
}

/// Authentication event payload for security analytics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    /// Subject if known.
    pub subject: Option<SubjectId>,
    /// Lifecycle step.
    pub kind: AuthEventKind,
    /// How the step ended.
    pub outcome: AuthEventOutcome,
    /// Caller IP address if available.
    pub ip_address: Option<String>,
    /// Caller user-agent if available.
    pub user_agent: Option<String>,
}

/// Repository port for auth event persistence.
#[async_trait]
pub trait AuthEventRepository: Send + Sync {
    /// Appends an auth event entry.
    async fn append_event(&self, event: AuthEvent) -> AppResult<()>;
}

/// Application service for auth event recording.
#[derive(Clone)]
pub struct AuthEventService {
    repository: Arc<dyn AuthEventRepository>,
}

impl AuthEventService {
    /// Creates a service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn AuthEventRepository>) -> Self {
        Self { repository }
    }

    /// Persists an auth event.
    pub async fn record_event(&self, event: AuthEvent) -> AppResult<()> {
        self.repository.append_event(event).await
    }
}
