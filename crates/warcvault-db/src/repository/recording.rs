use std::sync::Arc;

use warcvault_core::models::{FileEntry, FileLocation, InfoMap, Recording, RecordingRef};
use warcvault_core::KeyTemplates;

use crate::store::{KvStore, StoreResult};

/// Recording state: info map, open flag, WARC file map and index fragments.
#[derive(Clone)]
pub struct RecordingRepository {
    store: Arc<dyn KvStore>,
    keys: KeyTemplates,
    info_index_key: String,
}

impl RecordingRepository {
    pub fn new(store: Arc<dyn KvStore>, keys: KeyTemplates, info_index_key: impl Into<String>) -> Self {
        Self {
            store,
            keys,
            info_index_key: info_index_key.into(),
        }
    }

    pub fn info_index_key(&self) -> &str {
        &self.info_index_key
    }

    /// Recordings that still have index fragments tracked, i.e. are not yet
    /// fully committed. Order is the store's scan order.
    pub async fn scan_uncommitted(&self) -> StoreResult<Vec<RecordingRef>> {
        let pattern = self.keys.cdxj_scan_pattern();
        let keys = self.store.scan(&pattern).await?;
        Ok(keys
            .iter()
            .filter_map(|key| {
                let parsed = self.keys.parse_cdxj_key(key);
                if parsed.is_none() {
                    tracing::debug!(key = %key, "Skipping key not matching the index key template");
                }
                parsed
            })
            .collect())
    }

    pub async fn is_open(&self, rec: &RecordingRef) -> StoreResult<bool> {
        self.store.exists(&self.keys.rec_open(rec)).await
    }

    /// True while the committer still tracks index fragments for the recording.
    pub async fn has_pending_commit(&self, rec: &RecordingRef) -> StoreResult<bool> {
        self.store.exists(&self.keys.rec_cdxj(rec)).await
    }

    /// Closed and no longer tracked by the committer.
    pub async fn is_fully_committed(&self, rec: &RecordingRef) -> StoreResult<bool> {
        Ok(!self.is_open(rec).await? && !self.has_pending_commit(rec).await?)
    }

    pub async fn info(&self, rec: &RecordingRef) -> StoreResult<InfoMap> {
        Ok(self
            .store
            .hgetall(&self.keys.rec_info(rec))
            .await?
            .into_iter()
            .collect())
    }

    /// WARC file entries in store order.
    pub async fn warc_files(&self, rec: &RecordingRef) -> StoreResult<Vec<FileEntry>> {
        Ok(self
            .store
            .hgetall(&self.keys.rec_warc(rec))
            .await?
            .into_iter()
            .map(|(name, location)| FileEntry::new(name, FileLocation::parse(&location)))
            .collect())
    }

    /// Location of the consolidated index file, if it has been written.
    pub async fn index_location(&self, rec: &RecordingRef) -> StoreResult<Option<String>> {
        self.store
            .hget(&self.keys.rec_info(rec), &self.info_index_key)
            .await
    }

    pub async fn set_index_location(&self, rec: &RecordingRef, location: &str) -> StoreResult<()> {
        self.store
            .hset(&self.keys.rec_info(rec), &self.info_index_key, location)
            .await
    }

    /// Record the durable reference of a committed WARC file.
    pub async fn set_warc_location(
        &self,
        rec: &RecordingRef,
        name: &str,
        location: &str,
    ) -> StoreResult<()> {
        self.store
            .hset(&self.keys.rec_warc(rec), name, location)
            .await
    }

    /// Index fragments in stored order.
    pub async fn index_fragments(&self, rec: &RecordingRef) -> StoreResult<Vec<String>> {
        self.store.zrange_all(&self.keys.rec_cdxj(rec)).await
    }

    /// Stop tracking the recording once every file is committed.
    pub async fn delete_tracking(&self, rec: &RecordingRef) -> StoreResult<()> {
        self.store.delete(&self.keys.rec_cdxj(rec)).await
    }

    /// Load a recording. `None` when it has neither info nor files.
    pub async fn get(&self, rec: &RecordingRef) -> StoreResult<Option<Recording>> {
        let info = self.info(rec).await?;
        let warcs = self.warc_files(rec).await?;
        if info.is_empty() && warcs.is_empty() {
            return Ok(None);
        }

        let index_file = info
            .get(&self.info_index_key)
            .map(|location| FileEntry::from_reference(location));
        let open = self.is_open(rec).await?;

        Ok(Some(Recording {
            id: rec.clone(),
            info,
            open,
            index_file,
            warcs,
        }))
    }

    /// Recording ids of a collection in store order.
    pub async fn list_ids(&self, owner: &str, coll: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .store
            .hgetall(&self.keys.coll_recs(owner, coll))
            .await?
            .into_iter()
            .map(|(id, _)| id)
            .collect())
    }

    /// All recordings of a collection in store order.
    pub async fn list(&self, owner: &str, coll: &str) -> StoreResult<Vec<Recording>> {
        let mut recordings = Vec::new();
        for id in self.list_ids(owner, coll).await? {
            let rec = RecordingRef::new(owner, coll, id);
            if let Some(recording) = self.get(&rec).await? {
                recordings.push(recording);
            }
        }
        Ok(recordings)
    }

    // Recorder-side writes. The recorder owns these keys; they are exposed
    // here for tooling and test fixtures.

    pub async fn create(&self, rec: &RecordingRef, info: &[(&str, &str)]) -> StoreResult<()> {
        self.store
            .hset(&self.keys.coll_recs(&rec.owner, &rec.collection), &rec.recording, "")
            .await?;
        let info_key = self.keys.rec_info(rec);
        for (field, value) in info {
            self.store.hset(&info_key, field, value).await?;
        }
        Ok(())
    }

    pub async fn set_open(&self, rec: &RecordingRef, open: bool) -> StoreResult<()> {
        let key = self.keys.rec_open(rec);
        if open {
            self.store.set(&key, "1").await
        } else {
            self.store.delete(&key).await
        }
    }

    pub async fn add_warc(&self, rec: &RecordingRef, name: &str, location: &FileLocation) -> StoreResult<()> {
        self.set_warc_location(rec, name, &location.to_reference())
            .await
    }

    pub async fn add_index_fragment(&self, rec: &RecordingRef, score: f64, line: &str) -> StoreResult<()> {
        self.store
            .zadd(&self.keys.rec_cdxj(rec), score, line)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::path::Path;

    fn repo() -> RecordingRepository {
        RecordingRepository::new(Arc::new(MemoryStore::new()), KeyTemplates::default(), "index_file")
    }

    #[tokio::test]
    async fn load_recording_with_files() {
        let repo = repo();
        let rec = RecordingRef::new("alice", "coll1", "session1");
        repo.create(&rec, &[("title", "My session"), ("size", "500")])
            .await
            .unwrap();
        repo.add_warc(&rec, "rec-001.warc", &FileLocation::local(Path::new("/data/alice/rec-001.warc")))
            .await
            .unwrap();
        repo.set_index_location(&rec, "local:///data/alice/idx.cdxj")
            .await
            .unwrap();

        let recording = repo.get(&rec).await.unwrap().unwrap();
        assert_eq!(recording.title(), Some("My session"));
        assert_eq!(recording.size(), 500);
        assert!(!recording.open);
        let names: Vec<_> = recording.files(true).map(|f| f.name.clone()).collect();
        assert_eq!(names, vec!["idx.cdxj", "rec-001.warc"]);
    }

    #[tokio::test]
    async fn missing_recording_is_none() {
        let repo = repo();
        let rec = RecordingRef::new("alice", "coll1", "nope");
        assert!(repo.get(&rec).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn scan_finds_tracked_recordings() {
        let repo = repo();
        let rec = RecordingRef::new("alice", "coll1", "session1");
        repo.add_index_fragment(&rec, 0.0, "com,example)/ 2026 {}\n")
            .await
            .unwrap();

        assert_eq!(repo.scan_uncommitted().await.unwrap(), vec![rec.clone()]);
        assert!(!repo.is_fully_committed(&rec).await.unwrap());

        repo.delete_tracking(&rec).await.unwrap();
        assert!(repo.scan_uncommitted().await.unwrap().is_empty());
        assert!(repo.is_fully_committed(&rec).await.unwrap());
    }

    #[tokio::test]
    async fn open_recording_is_not_fully_committed() {
        let repo = repo();
        let rec = RecordingRef::new("alice", "coll1", "session1");
        repo.set_open(&rec, true).await.unwrap();
        assert!(!repo.is_fully_committed(&rec).await.unwrap());
        repo.set_open(&rec, false).await.unwrap();
        assert!(repo.is_fully_committed(&rec).await.unwrap());
    }
}
