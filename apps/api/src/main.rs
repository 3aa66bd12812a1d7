//! Maintly permission API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod dev_seed;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use maintly_core::AppError;
use tracing::info;

use crate::api_config::{ApiConfig, StorageConfig};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    api_config::init_tracing();

    let config = ApiConfig::load()?;

    let app_state = match &config.storage {
        StorageConfig::Postgres {
            database_url,
            max_connections,
        } => {
            let pool = api_services::connect_and_migrate(database_url, *max_connections).await?;
            if config.migrate_only {
                info!("database migrations applied successfully");
                return Ok(());
            }

            api_services::build_postgres_state(pool, config.resolution_cache_enabled).await?
        }
        StorageConfig::Memory => {
            api_services::build_memory_state(config.resolution_cache_enabled).await?
        }
    };

    let app = api_router::build_router(app_state, &config.frontend_url)?;
    let address = config.socket_address()?;

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "maintly-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
