use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use bastion_application::TokenValidation;
use bastion_core::AppError;
use tracing::debug;

use crate::error::ApiResult;
use crate::request_context::{bearer_token, caller_context};
use crate::state::AppState;

/// Validates the bearer token and exposes its claims as a
/// [`bastion_application::ValidatedToken`] request extension.
pub async fn require_bearer_token(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(peer)| *peer);
    let caller = caller_context(request.headers(), peer, state.trust_forwarded_for);
    let token = bearer_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized("bearer token required".to_owned()))?
        .to_owned();

    match state.token_service.validate(&token, &caller).await? {
        TokenValidation::Valid(validated) => {
            request.extensions_mut().insert(validated);
            Ok(next.run(request).await)
        }
        TokenValidation::Rejected(rejection) => {
            debug!(reason = %rejection, path = %request.uri().path(), "bearer token rejected");
            Err(rejection.into())
        }
    }
}
