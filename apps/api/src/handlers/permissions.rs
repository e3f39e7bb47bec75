use axum::Json;
use axum::extract::Extension;
use bastion_application::ValidatedToken;
use tracing::debug;

use crate::dto::{CheckPermissionRequest, PermissionCheckResponse};
use crate::error::ApiResult;

/// Evaluates a capability against the permission snapshot of the bearer token.
pub async fn check_permission_handler(
    Extension(token): Extension<ValidatedToken>,
    Json(payload): Json<CheckPermissionRequest>,
) -> ApiResult<Json<PermissionCheckResponse>> {
    let request = payload.into_domain()?;
    let decision = request.evaluate(&token.access);
    debug!(
        subject = %token.subject,
        granted = decision.is_granted(),
        reason = decision.denial_reason().map(|reason| reason.as_str()),
        "permission checked"
    );

    Ok(Json(PermissionCheckResponse::from(decision)))
}
