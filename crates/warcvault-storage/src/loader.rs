//! Retrieval of recorded files by location.
//!
//! Uncommitted files are read straight from disk; committed files are
//! fetched through the backend that holds them.

use std::sync::Arc;

use warcvault_core::models::FileLocation;

use crate::local::{file_length, file_stream};
use crate::traits::{ByteStream, Storage, StorageError, StorageResult};

/// Loads file bytes for a collection, given the collection's backend (if any).
#[derive(Clone, Default)]
pub struct FileLoader {
    storage: Option<Arc<dyn Storage>>,
}

impl FileLoader {
    pub fn new(storage: Option<Arc<dyn Storage>>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> Option<&Arc<dyn Storage>> {
        self.storage.as_ref()
    }

    fn remote(&self, reference: &str) -> StorageResult<&Arc<dyn Storage>> {
        self.storage.as_ref().ok_or_else(|| {
            StorageError::ConfigError(format!("No storage backend to load {}", reference))
        })
    }

    pub async fn content_length(&self, location: &FileLocation) -> StorageResult<u64> {
        match location {
            FileLocation::Local(path) => file_length(path).await,
            FileLocation::Durable(reference) => {
                self.remote(reference)?.content_length(reference).await
            }
        }
    }

    /// Open a file as a byte stream. The underlying handle lives exactly as
    /// long as the returned stream.
    pub async fn open(&self, location: &FileLocation) -> StorageResult<ByteStream> {
        match location {
            FileLocation::Local(path) => file_stream(path).await,
            FileLocation::Durable(reference) => {
                self.remote(reference)?.download_stream(reference).await
            }
        }
    }
}
