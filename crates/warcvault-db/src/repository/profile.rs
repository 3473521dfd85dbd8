use std::collections::BTreeMap;
use std::sync::Arc;

use warcvault_core::models::StorageProfile;
use warcvault_core::KeyTemplates;

use crate::store::{KvStore, StoreResult};

/// Named storage profiles stored as flat maps under `s:{name}`.
#[derive(Clone)]
pub struct ProfileRepository {
    store: Arc<dyn KvStore>,
    keys: KeyTemplates,
}

impl ProfileRepository {
    pub fn new(store: Arc<dyn KvStore>, keys: KeyTemplates) -> Self {
        Self { store, keys }
    }

    /// `None` when the profile is missing or has no `type` field.
    pub async fn get(&self, name: &str) -> StoreResult<Option<StorageProfile>> {
        let map: BTreeMap<String, String> = self
            .store
            .hgetall(&self.keys.storage_profile(name))
            .await?
            .into_iter()
            .collect();
        if map.is_empty() {
            return Ok(None);
        }
        let profile = StorageProfile::from_map(map);
        if profile.is_none() {
            tracing::warn!(profile = %name, "Storage profile has no type field");
        }
        Ok(profile)
    }

    pub async fn save(&self, name: &str, profile: &StorageProfile) -> StoreResult<()> {
        let key = self.keys.storage_profile(name);
        self.store.hset(&key, "type", &profile.backend_type).await?;
        for (field, value) in &profile.params {
            self.store.hset(&key, field, value).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn save_and_load_profile() {
        let repo = ProfileRepository::new(Arc::new(MemoryStore::new()), KeyTemplates::default());
        let profile = StorageProfile::new("s3")
            .with_param("remote_url_templ", "s3://archive/{user}/{coll}/");
        repo.save("archive", &profile).await.unwrap();

        assert_eq!(repo.get("archive").await.unwrap(), Some(profile));
        assert_eq!(repo.get("missing").await.unwrap(), None);
    }
}
