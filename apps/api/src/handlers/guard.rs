use std::net::SocketAddr;

use axum::Json;
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use chrono::Utc;

use crate::dto::{AttemptCounterResponse, GuardStatsResponse, RecordFailureRequest};
use crate::error::ApiResult;
use crate::request_context::caller_context;
use crate::state::AppState;

pub async fn guard_stats_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<GuardStatsResponse>> {
    let stats = state.attempt_guard_service.stats().await?;
    Ok(Json(GuardStatsResponse::new(
        stats,
        state.attempt_guard_service.policy(),
    )))
}

pub async fn blocked_keys_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<AttemptCounterResponse>>> {
    let now = Utc::now();
    let blocked = state
        .attempt_guard_service
        .list_blocked()
        .await?
        .into_iter()
        .map(|counter| AttemptCounterResponse::at(counter, now))
        .collect();

    Ok(Json(blocked))
}

/// Reports a failed credential check from the identity store.
pub async fn record_failure_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<RecordFailureRequest>,
) -> ApiResult<Json<AttemptCounterResponse>> {
    let caller = caller_context(&headers, Some(peer), state.trust_forwarded_for);
    let subject = payload.subject()?;
    let counter = state
        .token_service
        .record_login_failure(&subject, &caller)
        .await?;

    Ok(Json(AttemptCounterResponse::at(counter, Utc::now())))
}
