use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::require_bearer_token;
use crate::state::AppState;

pub fn build_router(app_state: AppState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/permissions/check",
            post(handlers::permissions::check_permission_handler),
        )
        .route_layer(from_fn_with_state(app_state.clone(), require_bearer_token));

    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .route("/token", post(handlers::token::issue_token_handler))
        .route(
            "/token/validate",
            post(handlers::token::validate_token_handler),
        )
        .route("/token/refresh", post(handlers::token::refresh_token_handler))
        .route("/token/revoke", post(handlers::token::revoke_token_handler))
        .route("/guard/stats", get(handlers::guard::guard_stats_handler))
        .route("/guard/blocked", get(handlers::guard::blocked_keys_handler))
        .route(
            "/guard/failures",
            post(handlers::guard::record_failure_handler),
        )
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
