use bastion_application::{AttemptGuardService, JanitorService, TokenService};
use sqlx::PgPool;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub token_service: TokenService,
    pub attempt_guard_service: AttemptGuardService,
    pub janitor_service: JanitorService,
    pub postgres_pool: Option<PgPool>,
    pub redis_client: Option<redis::Client>,
    /// Whether `x-forwarded-for` names the caller instead of the socket peer.
    pub trust_forwarded_for: bool,
}
