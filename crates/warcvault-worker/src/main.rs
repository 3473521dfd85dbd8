use std::sync::Arc;

use anyhow::Context;
use warcvault_core::Config;
use warcvault_db::{CollectionRepository, CommitTracker, ProfileRepository, RecordingRepository};
use warcvault_services::StorageResolver;
use warcvault_storage::StorageRegistry;
use warcvault_worker::{CommitterService, CommitterServiceConfig, IndexWriter, StorageCommitter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    warcvault_worker::telemetry::init_tracing();

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        environment = %config.environment,
        record_root = %config.record_root.display(),
        default_storage = %config.default_storage.backend_type,
        commit_wait_secs = config.commit_wait_secs,
        "Starting storage committer"
    );

    let store = warcvault_db::connect(&config.redis_base_url)
        .await
        .context("Failed to connect to the fast store")?;

    let keys = config.keys.clone();
    let recordings = RecordingRepository::new(store.clone(), keys.clone(), config.info_index_key.clone());
    let resolver = StorageResolver::new(
        CollectionRepository::new(store.clone(), keys.clone()),
        ProfileRepository::new(store.clone(), keys.clone()),
        Arc::new(StorageRegistry::with_defaults()),
        &config,
    );
    let index_writer = IndexWriter::new(
        recordings.clone(),
        config.record_root.clone(),
        config.index_name_templ.clone(),
    );
    let committer = StorageCommitter::new(
        recordings,
        CommitTracker::new(store.clone(), keys, config.commit_wait_secs),
        resolver,
        index_writer,
        config.record_root.clone(),
        config.temp_prefix.clone(),
    );

    let service = CommitterService::start(
        committer,
        store,
        CommitterServiceConfig {
            scan_interval_seconds: config.scan_interval_secs,
        },
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to install Ctrl+C handler")?;
    tracing::info!("Shutdown signal received");
    service.shutdown().await;

    Ok(())
}
