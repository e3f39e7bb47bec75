use std::sync::Arc;

use bastion_application::{
    AccessConfigurationService, AttemptGuardService, AuthEventService, Clock, JanitorService,
    SystemClock, TokenService,
};
use bastion_core::AppResult;
use bastion_infrastructure::JwtTokenCodec;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::api_config::{ApiConfig, SecuritySettings};
use crate::state::AppState;

use super::redis::open_redis_revocations;

mod adapters;

pub use adapters::Adapters;

pub fn build_app_state(config: &ApiConfig, pool: Option<PgPool>) -> AppResult<AppState> {
    let redis = config
        .redis_url
        .as_deref()
        .map(open_redis_revocations)
        .transpose()?;

    let adapters = match &pool {
        Some(pool) => {
            info!("using postgres stores");
            Adapters::postgres(pool)
        }
        None => {
            warn!("DATABASE_URL is not set; using in-memory stores, every subject is deny-all");
            Adapters::in_memory()
        }
    };
    let (adapters, redis_client) = match redis {
        Some(redis) => {
            info!("using redis revocation set");
            (adapters.with_revocations(Arc::new(redis.repository)), Some(redis.client))
        }
        None => (adapters, None),
    };

    if config.trust_forwarded_for {
        info!("trusting x-forwarded-for for caller addresses");
    }

    let mut app_state = assemble_app_state(
        adapters,
        &config.security,
        Arc::new(SystemClock),
        pool,
        redis_client,
    )?;
    app_state.trust_forwarded_for = config.trust_forwarded_for;

    Ok(app_state)
}

pub fn assemble_app_state(
    adapters: Adapters,
    security: &SecuritySettings,
    clock: Arc<dyn Clock>,
    postgres_pool: Option<PgPool>,
    redis_client: Option<redis::Client>,
) -> AppResult<AppState> {
    let codec = Arc::new(JwtTokenCodec::new(
        security.signing_secret.as_bytes(),
        security.token_policy.issuer.as_str(),
    )?);

    let attempt_guard_service = AttemptGuardService::new(
        adapters.attempt_counters,
        security.attempt_policy,
        clock.clone(),
    );
    let token_service = TokenService::new(
        codec,
        adapters.revocations.clone(),
        AccessConfigurationService::new(adapters.access_configurations),
        attempt_guard_service.clone(),
        AuthEventService::new(adapters.auth_events),
        security.token_policy.clone(),
        clock.clone(),
    );
    let janitor_service =
        JanitorService::new(attempt_guard_service.clone(), adapters.revocations, clock);

    Ok(AppState {
        token_service,
        attempt_guard_service,
        janitor_service,
        postgres_pool,
        redis_client,
        trust_forwarded_for: false,
    })
}
