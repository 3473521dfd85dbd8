//! Storage committer
//!
//! Migrates closed recordings from local disk to their durable backend. Each
//! cycle re-derives everything from the fast store and the filesystem, so a
//! cycle can be interrupted at any point and simply run again.
//!
//! Per file the protocol is: upload unless a commit-wait marker says an
//! upload was already attempted, then ask the backend for a durable
//! reference, and only once one is returned record it and delete the local
//! copy. A recording stops being tracked only when every one of its files
//! reports committed in the same cycle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use warcvault_core::models::{FileEntry, FileLocation, RecordingRef};
use warcvault_db::{CommitTracker, RecordingRepository};
use warcvault_services::StorageResolver;
use warcvault_storage::{ObjectTarget, Storage};

use crate::index_writer::IndexWriter;

/// Where a committed file's durable reference is recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Index,
    Warc,
}

/// Result of processing one recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingOutcome {
    /// Still being written; left alone
    Open,
    /// Temporary owner; never migrated
    Temporary,
    /// At least one file is not committed yet
    Pending,
    /// Every file committed and tracking removed
    Committed,
}

/// Counts for one cycle
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    pub scanned: usize,
    pub open: usize,
    pub temporary: usize,
    pub pending: usize,
    pub committed: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct StorageCommitter {
    recordings: RecordingRepository,
    tracker: CommitTracker,
    resolver: StorageResolver,
    index_writer: IndexWriter,
    record_root: PathBuf,
    temp_prefix: String,
}

impl StorageCommitter {
    pub fn new(
        recordings: RecordingRepository,
        tracker: CommitTracker,
        resolver: StorageResolver,
        index_writer: IndexWriter,
        record_root: impl Into<PathBuf>,
        temp_prefix: impl Into<String>,
    ) -> Self {
        Self {
            recordings,
            tracker,
            resolver,
            index_writer,
            record_root: record_root.into(),
            temp_prefix: temp_prefix.into(),
        }
    }

    /// Process every recording that still has index fragments tracked.
    pub async fn run_cycle(&self) -> Result<CycleSummary> {
        let mut summary = CycleSummary::default();

        for rec in self.recordings.scan_uncommitted().await? {
            summary.scanned += 1;
            match self.process_recording(&rec).await {
                Ok(RecordingOutcome::Open) => summary.open += 1,
                Ok(RecordingOutcome::Temporary) => summary.temporary += 1,
                Ok(RecordingOutcome::Pending) => summary.pending += 1,
                Ok(RecordingOutcome::Committed) => summary.committed += 1,
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!(recording = %rec, error = %e, "Failed to process recording");
                }
            }
        }

        if summary.scanned > 0 {
            tracing::info!(
                scanned = summary.scanned,
                open = summary.open,
                pending = summary.pending,
                committed = summary.committed,
                failed = summary.failed,
                "Commit cycle finished"
            );
        }

        Ok(summary)
    }

    pub async fn process_recording(&self, rec: &RecordingRef) -> Result<RecordingOutcome> {
        if self.recordings.is_open(rec).await? {
            return Ok(RecordingOutcome::Open);
        }
        if !self.temp_prefix.is_empty() && rec.owner.starts_with(&self.temp_prefix) {
            return Ok(RecordingOutcome::Temporary);
        }

        let index = self.index_writer.ensure_index(rec).await?;
        let warcs = self.recordings.warc_files(rec).await?;
        let storage = self.resolver.resolve(&rec.owner, &rec.collection).await?;
        let owner_dir = self.record_root.join(&rec.owner);

        let files = std::iter::once((FileKind::Index, index))
            .chain(warcs.into_iter().map(|warc| (FileKind::Warc, warc)));

        let mut all_done = true;
        for (kind, file) in files {
            let done = self
                .commit_file(rec, storage.as_ref(), kind, &owner_dir, &file)
                .await;
            all_done = all_done && done;
        }

        if !all_done {
            return Ok(RecordingOutcome::Pending);
        }

        tracing::info!(recording = %rec, "All files committed, removing tracking key");
        self.recordings.delete_tracking(rec).await?;
        remove_if_empty(&owner_dir).await;

        Ok(RecordingOutcome::Committed)
    }

    /// Commit one file. Returns true once the file needs no further work.
    async fn commit_file(
        &self,
        rec: &RecordingRef,
        storage: Option<&Arc<dyn Storage>>,
        kind: FileKind,
        owner_dir: &Path,
        file: &FileEntry,
    ) -> bool {
        let storage = match storage {
            Some(storage) if !storage.is_local() => storage,
            _ => return true,
        };

        let full_path = match &file.location {
            // A crash between recording the reference and deleting the local
            // copy leaves the copy behind; finish the delete.
            FileLocation::Durable(_) => {
                return delete_committed(&owner_dir.join(&file.name)).await;
            }
            FileLocation::Local(path) => path.clone(),
        };
        let marker = full_path.to_string_lossy().to_string();
        let target = ObjectTarget::new(rec.clone(), file.name.clone());

        match self.tracker.is_upload_pending(&marker).await {
            Ok(true) => {}
            Ok(false) => {
                if let Err(e) = storage.upload(&target, &full_path).await {
                    tracing::warn!(
                        recording = %rec,
                        file = %file.name,
                        error = %e,
                        "Upload failed, will retry"
                    );
                    return false;
                }
                if let Err(e) = self.tracker.mark_uploaded(&marker).await {
                    tracing::warn!(file = %marker, error = %e, "Failed to set commit-wait marker");
                }
            }
            Err(e) => {
                tracing::warn!(file = %marker, error = %e, "Failed to read commit-wait marker");
                return false;
            }
        }

        let reference = match storage.durable_reference(&target).await {
            Ok(Some(reference)) => reference,
            Ok(None) => {
                tracing::debug!(file = %marker, "Not yet available");
                return false;
            }
            Err(e) => {
                tracing::warn!(file = %marker, error = %e, "Availability check failed");
                return false;
            }
        };

        let recorded = match kind {
            FileKind::Index => self.recordings.set_index_location(rec, &reference).await,
            FileKind::Warc => {
                self.recordings
                    .set_warc_location(rec, &file.name, &reference)
                    .await
            }
        };
        if let Err(e) = recorded {
            tracing::error!(file = %marker, error = %e, "Failed to record durable reference");
            return false;
        }

        delete_committed(&full_path).await
    }
}

async fn delete_committed(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::info!(path = %path.display(), "Commit verified, deleted local copy");
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Failed to delete committed file");
            false
        }
    }
}

async fn remove_if_empty(dir: &Path) {
    if tokio::fs::remove_dir(dir).await.is_ok() {
        tracing::info!(dir = %dir.display(), "Removed empty directory");
    }
}
