//! Bastion API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod dto;
mod error;
mod handlers;
mod middleware;
mod request_context;
mod state;

use std::net::SocketAddr;

use bastion_core::AppError;
use tracing::info;

use crate::api_config::{ApiConfig, init_tracing};
use crate::api_router::build_router;
use crate::api_services::{build_app_state, connect_and_migrate, spawn_janitor};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;
    let pool = match config.database_url.as_deref() {
        Some(database_url) => Some(connect_and_migrate(database_url).await?),
        None => None,
    };

    if config.migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let app_state = build_app_state(&config, pool)?;
    if let Some(interval) = config.janitor_interval {
        info!(interval_seconds = interval.as_secs(), "janitor enabled");
        spawn_janitor(app_state.janitor_service.clone(), interval);
    }

    let app = build_router(app_state);
    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "bastion-api listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
