use std::sync::Arc;

use warcvault_core::KeyTemplates;

use crate::store::{KvStore, StoreResult};

/// Commit-wait markers: "upload attempted, awaiting durability confirmation".
///
/// Keyed by the full local path of the file. A marker only suppresses repeat
/// uploads while its TTL lasts; it is not a lock between committer processes.
#[derive(Clone)]
pub struct CommitTracker {
    store: Arc<dyn KvStore>,
    keys: KeyTemplates,
    ttl_secs: u64,
}

impl CommitTracker {
    pub fn new(store: Arc<dyn KvStore>, keys: KeyTemplates, ttl_secs: u64) -> Self {
        Self {
            store,
            keys,
            ttl_secs,
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    pub async fn is_upload_pending(&self, full_path: &str) -> StoreResult<bool> {
        self.store
            .exists(&self.keys.commit_wait(full_path))
            .await
    }

    pub async fn mark_uploaded(&self, full_path: &str) -> StoreResult<()> {
        self.store
            .set_ex(&self.keys.commit_wait(full_path), "1", self.ttl_secs)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn marker_expires_after_ttl() {
        let tracker = CommitTracker::new(Arc::new(MemoryStore::new()), KeyTemplates::default(), 30);
        let path = "/data/alice/rec-001.warc";

        assert!(!tracker.is_upload_pending(path).await.unwrap());
        tracker.mark_uploaded(path).await.unwrap();
        assert!(tracker.is_upload_pending(path).await.unwrap());

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(!tracker.is_upload_pending(path).await.unwrap());
    }
}
