use crate::traits::{ByteStream, ObjectTarget, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncReadExt;
use warcvault_core::models::FileLocation;

/// Local filesystem passthrough
///
/// Files stay where the recorder wrote them. Nothing is ever uploaded, so a
/// file never gains a durable reference; downloads read the local copy.
#[derive(Clone, Debug, Default)]
pub struct LocalStorage;

impl LocalStorage {
    pub fn new() -> Self {
        Self
    }
}

/// Filesystem path named by a `local://` reference or a bare absolute path.
pub(crate) fn reference_to_path(reference: &str) -> StorageResult<PathBuf> {
    match FileLocation::parse(reference) {
        FileLocation::Local(path) => Ok(path),
        FileLocation::Durable(other) => Err(StorageError::InvalidKey(other)),
    }
}

pub(crate) async fn file_length(path: &Path) -> StorageResult<u64> {
    let meta = fs::metadata(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => StorageError::NotFound(path.display().to_string()),
        _ => StorageError::IoError(e),
    })?;
    Ok(meta.len())
}

/// Open a local file as a byte stream. The handle is owned by the stream and
/// closed when the stream finishes or is dropped.
pub(crate) async fn file_stream(path: &Path) -> StorageResult<ByteStream> {
    let start = std::time::Instant::now();

    let file = fs::File::open(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => StorageError::NotFound(path.display().to_string()),
        _ => StorageError::DownloadFailed(format!(
            "Failed to open file {}: {}",
            path.display(),
            e
        )),
    })?;

    let path_display = path.display().to_string();
    let stream = tokio_util::io::ReaderStream::new(file).map(move |result| {
        result.map_err(|e| {
            tracing::error!(
                path = %path_display,
                error = %e,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Local file stream read error"
            );
            StorageError::DownloadFailed(format!("Failed to read chunk: {}", e))
        })
    });

    Ok(Box::pin(stream))
}

pub(crate) async fn file_sha256(path: &Path) -> StorageResult<String> {
    let mut file = fs::File::open(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => StorageError::NotFound(path.display().to_string()),
        _ => StorageError::IoError(e),
    })?;

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }

    Ok(format!("sha256:{}", hex::encode(hasher.finalize())))
}

#[async_trait]
impl Storage for LocalStorage {
    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }

    async fn upload(&self, target: &ObjectTarget, local_path: &Path) -> StorageResult<()> {
        tracing::debug!(
            recording = %target.recording,
            file = %target.file_name,
            path = %local_path.display(),
            "Local storage keeps file in place"
        );
        Ok(())
    }

    async fn durable_reference(&self, _target: &ObjectTarget) -> StorageResult<Option<String>> {
        Ok(None)
    }

    async fn checksum(&self, reference: &str) -> StorageResult<String> {
        let path = reference_to_path(reference)?;
        file_sha256(&path).await
    }

    async fn presigned_url(&self, _reference: &str, _expires_in: Duration) -> StorageResult<String> {
        Err(StorageError::ConfigError(
            "Presigned URLs are not supported by local storage".to_string(),
        ))
    }

    async fn content_length(&self, reference: &str) -> StorageResult<u64> {
        let path = reference_to_path(reference)?;
        file_length(&path).await
    }

    async fn download_stream(&self, reference: &str) -> StorageResult<ByteStream> {
        let path = reference_to_path(reference)?;
        file_stream(&path).await
    }
}
