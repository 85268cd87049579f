//! Roscoe API Server Entry Point
//!
//! Bootstraps configuration, connects the remote store, ensures the tables
//! exist and starts the Axum HTTP server.

use axum::Router;
use roscoe_api::telemetry::{init_tracing, TelemetryConfig};
use roscoe_api::{create_api_router, ApiConfig, ApiError, ApiResult, AppState, StoreTarget};
use roscoe_core::QueueConfig;
use roscoe_storage::schema::ENSURE_TABLES;

#[tokio::main]
async fn main() -> ApiResult<()> {
    dotenv::dotenv().ok();

    let telemetry_config = TelemetryConfig::from_env("roscoe-api");
    init_tracing(&telemetry_config)?;

    let api_config = ApiConfig::from_env().map_err(config_error)?;
    let executor = StoreTarget::from_env(None)
        .map_err(config_error)?
        .connect()?;

    executor.execute(ENSURE_TABLES, &[]).await?;

    let state = AppState::new(executor, api_config.clone(), QueueConfig::default());
    let app: Router = create_api_router(&state);

    let addr = api_config.bind_addr().map_err(config_error)?;
    tracing::info!(%addr, require_auth = api_config.require_auth, "Starting Roscoe API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

fn config_error(e: roscoe_core::ConfigError) -> ApiError {
    ApiError::internal_error(format!("Invalid configuration: {}", e))
}
