//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use warcvault_core::models::RecordingRef;
use warcvault_core::AppError;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage reference: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(reference) => AppError::NotFound(reference),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Byte stream of a stored file
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// The file a backend is asked to store or locate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectTarget {
    pub recording: RecordingRef,
    pub file_name: String,
}

impl ObjectTarget {
    pub fn new(recording: RecordingRef, file_name: impl Into<String>) -> Self {
        Self {
            recording,
            file_name: file_name.into(),
        }
    }
}

/// Storage abstraction trait
///
/// The committer and the catalog depend only on this trait. A backend must
/// tolerate repeated `upload` calls for the same target; uploads are retried
/// whenever durability has not yet been confirmed.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;

    /// Local backends keep files where the recorder wrote them; there is
    /// nothing to migrate and downloads are served by this service.
    fn is_local(&self) -> bool {
        self.backend_type() == StorageBackend::Local
    }

    /// Copy a local file to the backend
    async fn upload(&self, target: &ObjectTarget, local_path: &Path) -> StorageResult<()>;

    /// Durable reference of an uploaded file, or `None` while it is not yet
    /// retrievable
    async fn durable_reference(&self, target: &ObjectTarget) -> StorageResult<Option<String>>;

    /// Content checksum of a stored file
    async fn checksum(&self, reference: &str) -> StorageResult<String>;

    /// Time-limited URL for direct client access. Only remote backends
    /// support this.
    async fn presigned_url(&self, reference: &str, expires_in: Duration) -> StorageResult<String>;

    /// Get the size in bytes of a stored file
    async fn content_length(&self, reference: &str) -> StorageResult<u64>;

    /// Download a file as a stream
    async fn download_stream(&self, reference: &str) -> StorageResult<ByteStream>;
}
