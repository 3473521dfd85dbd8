//! Periodic driver for the storage committer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use warcvault_db::KvStore;

use crate::committer::{CycleSummary, StorageCommitter};

/// Channel the recorder listens on to close idle recordings
pub const CLOSE_IDLE_CHANNEL: &str = "close_idle";

#[derive(Clone)]
pub struct CommitterServiceConfig {
    pub scan_interval_seconds: u64,
}

impl Default for CommitterServiceConfig {
    fn default() -> Self {
        Self {
            scan_interval_seconds: 30,
        }
    }
}

/// Background service running one commit cycle per tick. A failed cycle is
/// logged and the loop carries on; only a shutdown signal stops it.
pub struct CommitterService {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl CommitterService {
    pub fn start(
        committer: StorageCommitter,
        store: Arc<dyn KvStore>,
        config: CommitterServiceConfig,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let handle = tokio::spawn(async move {
            Self::worker_loop(committer, store, config, shutdown_rx).await;
        });
        Self {
            shutdown_tx,
            handle,
        }
    }

    async fn worker_loop(
        committer: StorageCommitter,
        store: Arc<dyn KvStore>,
        config: CommitterServiceConfig,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let mut ticker = interval(Duration::from_secs(config.scan_interval_seconds.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            scan_interval_seconds = config.scan_interval_seconds,
            "Storage committer started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tick(&committer, store.as_ref()).await;
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Storage committer shutting down");
                    break;
                }
            }
        }
    }

    /// Stop the loop after the current cycle and wait for it to exit.
    pub async fn shutdown(self) {
        if let Err(e) = self.shutdown_tx.send(()).await {
            tracing::warn!(error = %e, "Failed to send shutdown signal to storage committer");
        }
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Storage committer task failed");
        }
    }
}

/// One cycle followed by the `close_idle` nudge to the recorder.
pub async fn tick(committer: &StorageCommitter, store: &dyn KvStore) -> Option<CycleSummary> {
    let summary = match committer.run_cycle().await {
        Ok(summary) => Some(summary),
        Err(e) => {
            tracing::error!(error = %e, "Error running commit cycle");
            None
        }
    };

    if let Err(e) = store.publish(CLOSE_IDLE_CHANNEL, "").await {
        tracing::error!(error = %e, "Failed to publish close_idle");
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index_writer::IndexWriter;
    use tempfile::tempdir;
    use warcvault_core::models::RecordingRef;
    use warcvault_core::{Config, KeyTemplates};
    use warcvault_db::{CollectionRepository, CommitTracker, MemoryStore, ProfileRepository, RecordingRepository};
    use warcvault_services::StorageResolver;
    use warcvault_storage::StorageRegistry;

    fn committer(store: Arc<dyn KvStore>, root: &std::path::Path) -> StorageCommitter {
        let keys = KeyTemplates::default();
        let recordings = RecordingRepository::new(store.clone(), keys.clone(), "index_file");
        let resolver = StorageResolver::new(
            CollectionRepository::new(store.clone(), keys.clone()),
            ProfileRepository::new(store.clone(), keys.clone()),
            Arc::new(StorageRegistry::with_defaults()),
            &Config::default(),
        );
        StorageCommitter::new(
            recordings.clone(),
            CommitTracker::new(store, keys, 30),
            resolver,
            IndexWriter::new(recordings, root, "{timestamp}-{random}.cdxj"),
            root,
            "temp-",
        )
    }

    #[test]
    fn test_config_defaults() {
        let config = CommitterServiceConfig::default();
        assert_eq!(config.scan_interval_seconds, 30);
    }

    #[tokio::test]
    async fn tick_publishes_close_idle() {
        let dir = tempdir().unwrap();
        let memory = Arc::new(MemoryStore::new());
        let store: Arc<dyn KvStore> = memory.clone();
        let committer = committer(store.clone(), dir.path());

        let rec = RecordingRef::new("alice", "coll1", "session1");
        let recordings = RecordingRepository::new(store.clone(), KeyTemplates::default(), "index_file");
        recordings.add_index_fragment(&rec, 1.0, "a 1 {}\n").await.unwrap();

        let summary = tick(&committer, store.as_ref()).await.unwrap();
        assert_eq!(summary.committed, 1);
        assert_eq!(
            memory.published().await,
            vec![(CLOSE_IDLE_CHANNEL.to_string(), String::new())]
        );
    }

    #[tokio::test]
    async fn service_stops_on_shutdown() {
        let dir = tempdir().unwrap();
        let memory = Arc::new(MemoryStore::new());
        let store: Arc<dyn KvStore> = memory.clone();
        let service = CommitterService::start(
            committer(store.clone(), dir.path()),
            store,
            CommitterServiceConfig::default(),
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        service.shutdown().await;
        assert!(!memory.published().await.is_empty());
    }
}
