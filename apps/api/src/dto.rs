mod common;
mod guard;
mod permissions;
mod token;

pub use common::{HealthDependencyStatus, HealthResponse, OkResponse};
pub use guard::{AttemptCounterResponse, GuardStatsResponse, RecordFailureRequest};
pub use permissions::{CheckPermissionRequest, PermissionCheckResponse};
pub use token::{
    IssueTokenRequest, IssuedTokenResponse, RevokeTokenRequest, TokenRequest,
    TokenValidationResponse,
};
