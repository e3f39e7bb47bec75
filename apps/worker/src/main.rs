//! Bastion janitor: sweeps lapsed attempt counters and revocation entries.

#![forbid(unsafe_code)]

use std::env;
use std::sync::Arc;
use std::time::Duration;

use bastion_application::{AttemptGuardService, JanitorService, RevocationRepository, SystemClock};
use bastion_core::{AppError, AppResult};
use bastion_domain::AttemptPolicy;
use bastion_infrastructure::{
    PostgresAttemptCounterRepository, PostgresRevocationRepository, RedisRevocationRepository,
};
use chrono::TimeDelta;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct WorkerConfig {
    database_url: String,
    redis_url: Option<String>,
    interval_seconds: u64,
    run_once: bool,
    attempt_policy: AttemptPolicy,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = WorkerConfig::load()?;
    let pool = connect_pool(config.database_url.as_str()).await?;
    let janitor = build_janitor_service(pool, &config)?;

    if config.run_once {
        let report = janitor.run_once().await?;
        info!(
            swept_counters = report.swept_counters,
            purged_revocations = report.purged_revocations,
            "janitor pass finished"
        );
        return Ok(());
    }

    info!(
        interval_seconds = config.interval_seconds,
        redis_revocations = config.redis_url.is_some(),
        "bastion-worker started"
    );

    loop {
        match janitor.run_once().await {
            Ok(report) => {
                if report.swept_counters > 0 || report.purged_revocations > 0 {
                    info!(
                        swept_counters = report.swept_counters,
                        purged_revocations = report.purged_revocations,
                        "janitor pass finished"
                    );
                }
            }
            Err(error) => {
                warn!(error = %error, "janitor pass failed");
            }
        }

        tokio::time::sleep(Duration::from_secs(config.interval_seconds)).await;
    }
}

async fn connect_pool(database_url: &str) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

fn build_janitor_service(pool: PgPool, config: &WorkerConfig) -> AppResult<JanitorService> {
    let clock = Arc::new(SystemClock);
    let attempt_guard = AttemptGuardService::new(
        Arc::new(PostgresAttemptCounterRepository::new(pool.clone())),
        config.attempt_policy,
        clock.clone(),
    );

    // Redis entries expire on their own; the purge there is a no-op.
    let revocations: Arc<dyn RevocationRepository> = match config.redis_url.as_deref() {
        Some(redis_url) => {
            let client = redis::Client::open(redis_url)
                .map_err(|error| AppError::Validation(format!("invalid REDIS_URL: {error}")))?;
            Arc::new(RedisRevocationRepository::new(
                client,
                RedisRevocationRepository::DEFAULT_KEY_PREFIX,
            ))
        }
        None => Arc::new(PostgresRevocationRepository::new(pool)),
    };

    Ok(JanitorService::new(attempt_guard, revocations, clock))
}

impl WorkerConfig {
    fn load() -> AppResult<Self> {
        let database_url = required_env("DATABASE_URL")?;
        let redis_url = env::var("REDIS_URL")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());
        let interval_seconds = parse_env_u64("JANITOR_INTERVAL_SECONDS", 300)?;
        let run_once = env::args().nth(1).as_deref() == Some("once");

        if interval_seconds == 0 {
            return Err(AppError::Validation(
                "JANITOR_INTERVAL_SECONDS must be greater than zero".to_owned(),
            ));
        }

        let failure_threshold = parse_env_u32(
            "GUARD_FAILURE_THRESHOLD",
            AttemptPolicy::DEFAULT_FAILURE_THRESHOLD,
        )?;
        let block_seconds = parse_env_i64(
            "GUARD_BLOCK_SECONDS",
            AttemptPolicy::DEFAULT_BLOCK_SECONDS,
        )?;
        let block_duration = TimeDelta::try_seconds(block_seconds).ok_or_else(|| {
            AppError::Validation("GUARD_BLOCK_SECONDS is out of range".to_owned())
        })?;
        let attempt_policy = AttemptPolicy::new(failure_threshold, block_duration)?;

        Ok(Self {
            database_url,
            redis_url,
            interval_seconds,
            run_once,
            attempt_policy,
        })
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn parse_env_u32(name: &str, default: u32) -> AppResult<u32> {
    match env::var(name) {
        Ok(value) => value.parse::<u32>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    match env::var(name) {
        Ok(value) => value.parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_env_i64(name: &str, default: i64) -> AppResult<i64> {
    match env::var(name) {
        Ok(value) => value.parse::<i64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}
