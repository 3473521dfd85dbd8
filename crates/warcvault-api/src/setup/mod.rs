//! Application setup and initialization

pub mod routes;
pub mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use warcvault_core::Config;
use warcvault_services::StorageRegistry;

use crate::state::AppState;

/// Connect the fast store, build shared state and the router.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config.validate().context("Configuration validation failed")?;

    let store = warcvault_db::connect(&config.redis_base_url)
        .await
        .context("Failed to connect to the fast store")?;

    let registry = Arc::new(StorageRegistry::with_defaults());
    let state = Arc::new(AppState::new(config, store, registry));
    let router = routes::setup_routes(state.clone());

    tracing::info!(
        default_storage = %state.config.default_storage.backend_type,
        chunked = state.config.download_chunk_encoded,
        "Application initialized"
    );

    Ok((state, router))
}
