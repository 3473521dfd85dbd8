use std::sync::Arc;
use std::time::Duration;

use warcvault_core::models::DeliveryMode;
use warcvault_core::Config;
use warcvault_db::{CollectionRepository, KvStore, ProfileRepository, RecordingRepository};
use warcvault_services::{ArchiveAssembler, CatalogLister, StorageRegistry, StorageResolver, WarcinfoWriter};

/// Shared request state
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn KvStore>,
    pub assembler: ArchiveAssembler,
    pub catalog: CatalogLister,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn KvStore>, registry: Arc<StorageRegistry>) -> Self {
        let keys = config.keys.clone();
        let collections = CollectionRepository::new(store.clone(), keys.clone());
        let recordings =
            RecordingRepository::new(store.clone(), keys.clone(), config.info_index_key.clone());
        let resolver = StorageResolver::new(
            collections.clone(),
            ProfileRepository::new(store.clone(), keys),
            registry,
            &config,
        );

        let assembler = ArchiveAssembler::new(
            collections.clone(),
            recordings.clone(),
            resolver.clone(),
            WarcinfoWriter::new(config.software.clone()),
            config.download_filename_templ.clone(),
        );
        let catalog = CatalogLister::new(
            collections,
            recordings,
            resolver,
            config.public_origin.clone(),
            Duration::from_secs(config.presign_expiry_secs),
        );

        Self {
            config,
            store,
            assembler,
            catalog,
        }
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        DeliveryMode::from_chunked_flag(self.config.download_chunk_encoded)
    }
}
