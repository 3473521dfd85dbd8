use std::sync::Arc;

use warcvault_core::models::Collection;
use warcvault_core::KeyTemplates;

use crate::store::{KvStore, StoreResult};

#[derive(Clone)]
pub struct CollectionRepository {
    store: Arc<dyn KvStore>,
    keys: KeyTemplates,
}

impl CollectionRepository {
    pub fn new(store: Arc<dyn KvStore>, keys: KeyTemplates) -> Self {
        Self { store, keys }
    }

    pub async fn user_exists(&self, user: &str) -> StoreResult<bool> {
        self.store.exists(&self.keys.user_info(user)).await
    }

    /// Load a collection. `None` when the collection has no info map.
    pub async fn get(&self, user: &str, coll: &str) -> StoreResult<Option<Collection>> {
        let info = self.store.hgetall(&self.keys.coll_info(user, coll)).await?;
        if info.is_empty() {
            return Ok(None);
        }
        Ok(Some(Collection {
            owner: user.to_string(),
            name: coll.to_string(),
            info: info.into_iter().collect(),
        }))
    }

    /// Collection names of a user in store order.
    pub async fn list_names(&self, user: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .store
            .hgetall(&self.keys.user_colls(user))
            .await?
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }

    /// Bump the collection's download counter, returning the new value.
    pub async fn incr_download_count(&self, user: &str, coll: &str) -> StoreResult<i64> {
        self.store
            .hincr(&self.keys.coll_info(user, coll), "download_count", 1)
            .await
    }

    pub async fn create_user(&self, user: &str) -> StoreResult<()> {
        self.store
            .hset(&self.keys.user_info(user), "created_at", &now_secs())
            .await
    }

    /// Register a collection under a user with the given info fields.
    pub async fn create(&self, user: &str, coll: &str, info: &[(&str, &str)]) -> StoreResult<()> {
        self.store
            .hset(&self.keys.user_colls(user), coll, "")
            .await?;
        let info_key = self.keys.coll_info(user, coll);
        self.store.hset(&info_key, "created_at", &now_secs()).await?;
        for (field, value) in info {
            self.store.hset(&info_key, field, value).await?;
        }
        Ok(())
    }
}

fn now_secs() -> String {
    chrono::Utc::now().timestamp().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn repo() -> CollectionRepository {
        CollectionRepository::new(Arc::new(MemoryStore::new()), KeyTemplates::default())
    }

    #[tokio::test]
    async fn create_and_load() {
        let repo = repo();
        repo.create_user("alice").await.unwrap();
        repo.create("alice", "coll1", &[("title", "First"), ("storage_type", "archive")])
            .await
            .unwrap();

        assert!(repo.user_exists("alice").await.unwrap());
        assert!(!repo.user_exists("bob").await.unwrap());

        let coll = repo.get("alice", "coll1").await.unwrap().unwrap();
        assert_eq!(coll.title(), Some("First"));
        assert_eq!(coll.storage_type(), Some("archive"));
        assert!(coll.created_at().is_some());
        assert_eq!(repo.list_names("alice").await.unwrap(), vec!["coll1"]);
    }

    #[tokio::test]
    async fn unknown_collection_is_none() {
        assert!(repo().get("alice", "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn download_count_increments() {
        let repo = repo();
        repo.create("alice", "coll1", &[]).await.unwrap();
        assert_eq!(repo.incr_download_count("alice", "coll1").await.unwrap(), 1);
        assert_eq!(repo.incr_download_count("alice", "coll1").await.unwrap(), 2);
    }
}
