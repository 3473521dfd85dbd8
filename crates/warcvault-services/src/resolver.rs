//! Storage backend resolution for an owner's collection.
//!
//! Lookup order: temporary owners never resolve; otherwise the collection's
//! `storage_type` names a stored profile, falling back to the process-wide
//! default profile; the profile's type then selects a registered variant.

use std::sync::Arc;

use warcvault_core::models::{Collection, StorageProfile};
use warcvault_core::{AppError, Config};
use warcvault_db::{CollectionRepository, ProfileRepository};
use warcvault_storage::{Storage, StorageRegistry};

#[derive(Clone)]
pub struct StorageResolver {
    collections: CollectionRepository,
    profiles: ProfileRepository,
    registry: Arc<StorageRegistry>,
    default_profile: StorageProfile,
    temp_prefix: String,
}

impl StorageResolver {
    pub fn new(
        collections: CollectionRepository,
        profiles: ProfileRepository,
        registry: Arc<StorageRegistry>,
        config: &Config,
    ) -> Self {
        Self {
            collections,
            profiles,
            registry,
            default_profile: config.default_storage.clone(),
            temp_prefix: config.temp_prefix.clone(),
        }
    }

    fn is_temp_owner(&self, owner: &str) -> bool {
        !self.temp_prefix.is_empty() && owner.starts_with(&self.temp_prefix)
    }

    /// Profile a collection uses. A named profile that is missing from the
    /// store falls back to the default.
    pub async fn profile_for(&self, collection: Option<&Collection>) -> Result<StorageProfile, AppError> {
        if let Some(name) = collection.and_then(Collection::storage_type) {
            if let Some(profile) = self.profiles.get(name).await? {
                return Ok(profile);
            }
            tracing::debug!(profile = %name, "Named storage profile not found, using default");
        }
        Ok(self.default_profile.clone())
    }

    /// Backend for an already loaded collection.
    pub async fn for_collection(&self, collection: &Collection) -> Result<Option<Arc<dyn Storage>>, AppError> {
        if self.is_temp_owner(&collection.owner) {
            return Ok(None);
        }
        let profile = self.profile_for(Some(collection)).await?;
        self.from_profile(&profile)
    }

    /// Backend for an owner's collection by name. A collection without an
    /// info map uses the default profile.
    pub async fn resolve(&self, owner: &str, coll: &str) -> Result<Option<Arc<dyn Storage>>, AppError> {
        if self.is_temp_owner(owner) {
            return Ok(None);
        }
        let collection = self.collections.get(owner, coll).await?;
        let profile = self.profile_for(collection.as_ref()).await?;
        self.from_profile(&profile)
    }

    fn from_profile(&self, profile: &StorageProfile) -> Result<Option<Arc<dyn Storage>>, AppError> {
        Ok(self.registry.resolve(profile)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warcvault_core::KeyTemplates;
    use warcvault_db::{KvStore, MemoryStore};

    fn resolver(store: Arc<dyn KvStore>, default_profile: StorageProfile) -> StorageResolver {
        let keys = KeyTemplates::default();
        let config = Config {
            default_storage: default_profile,
            ..Config::default()
        };
        StorageResolver::new(
            CollectionRepository::new(store.clone(), keys.clone()),
            ProfileRepository::new(store, keys),
            Arc::new(StorageRegistry::with_defaults()),
            &config,
        )
    }

    #[tokio::test]
    async fn temp_owner_never_resolves() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let resolver = resolver(store, StorageProfile::new("local"));
        assert!(resolver.resolve("temp-abc", "coll1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn default_profile_applies() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let resolver = resolver(store, StorageProfile::new("local"));
        let storage = resolver.resolve("alice", "coll1").await.unwrap().unwrap();
        assert!(storage.is_local());
    }

    #[tokio::test]
    async fn collection_profile_overrides_default() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let keys = KeyTemplates::default();
        let collections = CollectionRepository::new(store.clone(), keys.clone());
        let profiles = ProfileRepository::new(store.clone(), keys);
        collections
            .create("alice", "coll1", &[("storage_type", "archive")])
            .await
            .unwrap();
        profiles
            .save("archive", &StorageProfile::new("tape"))
            .await
            .unwrap();

        let resolver = resolver(store, StorageProfile::new("local"));
        let collection = collections.get("alice", "coll1").await.unwrap().unwrap();
        assert_eq!(
            resolver.profile_for(Some(&collection)).await.unwrap().backend_type,
            "tape"
        );
        // no variant registered for "tape"
        assert!(resolver.resolve("alice", "coll1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_named_profile_falls_back() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let collections = CollectionRepository::new(store.clone(), KeyTemplates::default());
        collections
            .create("alice", "coll1", &[("storage_type", "gone")])
            .await
            .unwrap();

        let resolver = resolver(store, StorageProfile::new("local"));
        let storage = resolver.resolve("alice", "coll1").await.unwrap().unwrap();
        assert!(storage.is_local());
    }
}
