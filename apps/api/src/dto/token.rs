use bastion_application::{RevocationTarget, TokenValidation};
use bastion_core::{AppError, AppResult, SubjectId};
use bastion_domain::{AccessConfiguration, IssuedToken, TokenId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Incoming payload for token issuance.
#[derive(Debug, Deserialize)]
pub struct IssueTokenRequest {
    pub subject_id: String,
}

impl IssueTokenRequest {
    pub fn subject(&self) -> AppResult<SubjectId> {
        SubjectId::new(self.subject_id.as_str())
    }
}

/// Incoming payload carrying a single encoded token.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

/// Incoming revocation payload: either `token` or `token_id` is required.
#[derive(Debug, Deserialize)]
pub struct RevokeTokenRequest {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub token_id: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl TryFrom<RevokeTokenRequest> for RevocationTarget {
    type Error = AppError;

    fn try_from(value: RevokeTokenRequest) -> Result<Self, Self::Error> {
        match (value.token, value.token_id) {
            (Some(token), None) => Ok(Self::Token(token)),
            (None, Some(token_id)) => Ok(Self::TokenId {
                token_id: token_id.parse::<TokenId>()?,
                expires_at: value.expires_at,
            }),
            (Some(_), Some(_)) => Err(AppError::Validation(
                "provide either token or token_id, not both".to_owned(),
            )),
            (None, None) => Err(AppError::Validation(
                "token or token_id is required".to_owned(),
            )),
        }
    }
}

/// API representation of a freshly issued token.
#[derive(Debug, Serialize)]
pub struct IssuedTokenResponse {
    pub token: String,
    pub token_id: String,
    pub subject_id: String,
    pub expires_at: String,
}

impl From<IssuedToken> for IssuedTokenResponse {
    fn from(value: IssuedToken) -> Self {
        Self {
            token: value.token,
            token_id: value.token_id.to_string(),
            subject_id: value.subject.to_string(),
            expires_at: value.expires_at.to_rfc3339(),
        }
    }
}

/// Result of a validation request. Rejections are reported in `reason`.
///
/// `permissions` lists every known module, denied ones included.
#[derive(Debug, Serialize)]
pub struct TokenValidationResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<AccessConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

impl From<TokenValidation> for TokenValidationResponse {
    fn from(value: TokenValidation) -> Self {
        match value {
            TokenValidation::Valid(token) => Self {
                valid: true,
                subject_id: Some(token.subject.to_string()),
                token_id: Some(token.token_id.to_string()),
                permissions: Some(token.access.normalized()),
                expires_at: Some(token.expires_at.to_rfc3339()),
                reason: None,
            },
            TokenValidation::Rejected(rejection) => Self {
                valid: false,
                subject_id: None,
                token_id: None,
                permissions: None,
                expires_at: None,
                reason: Some(rejection.as_str()),
            },
        }
    }
}
