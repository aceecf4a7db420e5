//! Application setup and initialization
//!
//! All startup logic lives here instead of main.rs: configuration
//! validation, telemetry, database, storage, service singletons, routes.

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use docflow_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration before anything is started
    config
        .validate()
        .context("Configuration validation failed")?;

    docflow_infra::init_telemetry();
    tracing::info!("Configuration loaded and validated successfully");

    let pool = database::setup_database(&config).await?;
    let storage = storage::setup_storage(&config).await?;
    let state = services::initialize_services(&config, pool, storage).await?;
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
