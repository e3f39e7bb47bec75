use std::net::SocketAddr;

use axum::Json;
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use bastion_application::{RefreshOutcome, RevocationTarget};

use crate::dto::{
    IssueTokenRequest, IssuedTokenResponse, OkResponse, RevokeTokenRequest, TokenRequest,
    TokenValidationResponse,
};
use crate::error::ApiResult;
use crate::request_context::caller_context;
use crate::state::AppState;

/// Issues a token for a subject whose credentials were already verified.
pub async fn issue_token_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<IssueTokenRequest>,
) -> ApiResult<Json<IssuedTokenResponse>> {
    let caller = caller_context(&headers, Some(peer), state.trust_forwarded_for);
    let subject = payload.subject()?;
    let issued = state.token_service.issue(&subject, &caller).await?;

    Ok(Json(IssuedTokenResponse::from(issued)))
}

pub async fn validate_token_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<TokenRequest>,
) -> ApiResult<Json<TokenValidationResponse>> {
    let caller = caller_context(&headers, Some(peer), state.trust_forwarded_for);
    let validation = state
        .token_service
        .validate(payload.token.as_str(), &caller)
        .await?;

    Ok(Json(TokenValidationResponse::from(validation)))
}

pub async fn refresh_token_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<TokenRequest>,
) -> ApiResult<Json<IssuedTokenResponse>> {
    let caller = caller_context(&headers, Some(peer), state.trust_forwarded_for);
    match state
        .token_service
        .refresh(payload.token.as_str(), &caller)
        .await?
    {
        RefreshOutcome::Refreshed(issued) => Ok(Json(IssuedTokenResponse::from(issued))),
        RefreshOutcome::Rejected(rejection) => Err(rejection.into()),
    }
}

pub async fn revoke_token_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<RevokeTokenRequest>,
) -> ApiResult<Json<OkResponse>> {
    let caller = caller_context(&headers, Some(peer), state.trust_forwarded_for);
    let target = RevocationTarget::try_from(payload)?;
    state.token_service.revoke(target, &caller).await?;

    Ok(Json(OkResponse { ok: true }))
}
