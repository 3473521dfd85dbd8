use crate::keys::RemoteUrlTemplate;
use crate::traits::{ByteStream, ObjectTarget, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use futures::StreamExt;
use http::Method;
use object_store::aws::AmazonS3Builder;
use object_store::buffered::BufWriter;
use object_store::path::Path as ObjectPath;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStore, ObjectStoreExt, Result as ObjectResult};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use warcvault_core::models::StorageProfile;

const DEFAULT_REGION: &str = "us-east-1";

/// Buffer size before an upload switches to multipart
const UPLOAD_PART_SIZE: usize = 10 * 1024 * 1024;

/// S3 storage implementation
///
/// Profile parameters:
/// * `remote_url_templ` - `s3://{bucket}/{prefix}` where the prefix may use
///   `{user}`, `{coll}` and `{rec}` (required)
/// * `region` - AWS region (defaults to `us-east-1`)
/// * `endpoint` - custom endpoint for S3-compatible providers
///   (e.g., "http://localhost:9000" for MinIO)
#[derive(Clone)]
pub struct S3Storage {
    store: Arc<dyn ObjectStore>,
    signer: Option<Arc<dyn Signer>>,
    remote: RemoteUrlTemplate,
}

impl S3Storage {
    /// Build an S3 backend from a storage profile. Credentials come from the
    /// standard AWS environment variables.
    pub fn from_profile(profile: &StorageProfile) -> StorageResult<Self> {
        let templ = profile.param("remote_url_templ").ok_or_else(|| {
            StorageError::ConfigError("S3 profile is missing remote_url_templ".to_string())
        })?;
        let remote = RemoteUrlTemplate::parse(templ)?;
        let region = profile.param("region").unwrap_or(DEFAULT_REGION);

        let mut builder = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(remote.bucket());

        if let Some(endpoint) = profile.param("endpoint") {
            let allow_http = endpoint.starts_with("http://");
            builder = builder.with_endpoint(endpoint).with_allow_http(allow_http);
        }

        let store = Arc::new(
            builder
                .build()
                .map_err(|e| StorageError::ConfigError(e.to_string()))?,
        );

        Ok(S3Storage {
            store: store.clone(),
            signer: Some(store),
            remote,
        })
    }

    /// Use an existing object store for the bucket named by `remote_url_templ`.
    /// Presigned URLs are unavailable on a backend built this way.
    pub fn with_store(remote_url_templ: &str, store: Arc<dyn ObjectStore>) -> StorageResult<Self> {
        Ok(S3Storage {
            store,
            signer: None,
            remote: RemoteUrlTemplate::parse(remote_url_templ)?,
        })
    }

    fn location(&self, reference: &str) -> StorageResult<ObjectPath> {
        let key = self.remote.key_from_reference(reference)?;
        Ok(ObjectPath::from(key))
    }
}

fn map_not_found(err: ObjectStoreError, reference: &str) -> StorageError {
    match err {
        ObjectStoreError::NotFound { .. } => StorageError::NotFound(reference.to_string()),
        other => StorageError::BackendError(other.to_string()),
    }
}

#[async_trait]
impl Storage for S3Storage {
    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }

    async fn upload(&self, target: &ObjectTarget, local_path: &Path) -> StorageResult<()> {
        let key = self.remote.object_key(target)?;
        let start = std::time::Instant::now();

        let mut file = tokio::fs::File::open(local_path).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to open {}: {}",
                local_path.display(),
                e
            ))
        })?;
        let location = ObjectPath::from(key.clone());

        // Small files go up in a single put; larger ones as multipart parts,
        // so at most one part is held in memory.
        let mut writer = BufWriter::with_capacity(self.store.clone(), location, UPLOAD_PART_SIZE);
        let copied = match tokio::io::copy(&mut file, &mut writer).await {
            Ok(size) => writer.shutdown().await.map(|_| size),
            Err(e) => Err(e),
        };

        let size = match copied {
            Ok(size) => size,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.remote.bucket(),
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                if let Err(abort_err) = writer.abort().await {
                    tracing::warn!(key = %key, error = %abort_err, "Failed to abort multipart upload");
                }
                return Err(StorageError::UploadFailed(e.to_string()));
            }
        };

        tracing::info!(
            bucket = %self.remote.bucket(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(())
    }

    async fn durable_reference(&self, target: &ObjectTarget) -> StorageResult<Option<String>> {
        let key = self.remote.object_key(target)?;
        let location = ObjectPath::from(key.clone());

        match self.store.head(&location).await {
            Ok(_) => Ok(Some(self.remote.reference(&key))),
            Err(ObjectStoreError::NotFound { .. }) => {
                tracing::debug!(
                    bucket = %self.remote.bucket(),
                    key = %key,
                    "S3 object not yet retrievable"
                );
                Ok(None)
            }
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn checksum(&self, reference: &str) -> StorageResult<String> {
        let location = self.location(reference)?;
        let meta = self
            .store
            .head(&location)
            .await
            .map_err(|e| map_not_found(e, reference))?;

        meta.e_tag
            .map(|tag| format!("etag:{}", tag.trim_matches('"')))
            .ok_or_else(|| StorageError::BackendError(format!("No ETag for {}", reference)))
    }

    async fn presigned_url(&self, reference: &str, expires_in: Duration) -> StorageResult<String> {
        let signer = self.signer.as_ref().ok_or_else(|| {
            StorageError::ConfigError("Object store does not support presigned URLs".to_string())
        })?;
        let location = self.location(reference)?;

        let url_result: ObjectResult<_> = signer
            .signed_url(Method::GET, &location, expires_in)
            .await;

        let url = url_result
            .map_err(|e| StorageError::BackendError(e.to_string()))?
            .to_string();

        Ok(url)
    }

    async fn content_length(&self, reference: &str) -> StorageResult<u64> {
        let location = self.location(reference)?;
        let meta = self
            .store
            .head(&location)
            .await
            .map_err(|e| map_not_found(e, reference))?;
        Ok(meta.size)
    }

    async fn download_stream(&self, reference: &str) -> StorageResult<ByteStream> {
        let start = std::time::Instant::now();
        let location = self.location(reference)?;

        let result: ObjectResult<_> = self.store.get(&location).await;

        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(reference.to_string()),
            other => StorageError::DownloadFailed(other.to_string()),
        })?;

        let bucket = self.remote.bucket().to_string();
        let key = location.to_string();

        let stream = result.into_stream().map(move |res| match res {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                tracing::error!(
                    bucket = %bucket,
                    key = %key,
                    error = %e,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 stream download error"
                );
                Err(StorageError::DownloadFailed(e.to_string()))
            }
        });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;
    use tempfile::tempdir;
    use warcvault_core::models::RecordingRef;

    fn storage() -> S3Storage {
        S3Storage::with_store("s3://archive/{user}/{coll}/", Arc::new(InMemory::new())).unwrap()
    }

    fn target() -> ObjectTarget {
        ObjectTarget::new(RecordingRef::new("alice", "coll1", "session1"), "rec-001.warc")
    }

    #[tokio::test]
    async fn test_upload_then_reference() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rec-001.warc");
        tokio::fs::write(&path, vec![7u8; 500]).await.unwrap();

        let storage = storage();
        assert_eq!(storage.durable_reference(&target()).await.unwrap(), None);

        storage.upload(&target(), &path).await.unwrap();
        let reference = storage.durable_reference(&target()).await.unwrap().unwrap();
        assert_eq!(reference, "s3://archive/alice/coll1/rec-001.warc");

        assert_eq!(storage.content_length(&reference).await.unwrap(), 500);
        assert!(storage.checksum(&reference).await.unwrap().starts_with("etag:"));

        let mut stream = storage.download_stream(&reference).await.unwrap();
        let mut data = Vec::new();
        while let Some(chunk) = stream.next().await {
            data.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(data.len(), 500);
    }

    #[tokio::test]
    async fn test_large_upload_goes_multipart() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rec-002.warc");
        let size = UPLOAD_PART_SIZE * 2 + 1234;
        let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        tokio::fs::write(&path, &data).await.unwrap();

        let storage = storage();
        let target = ObjectTarget::new(RecordingRef::new("alice", "coll1", "session1"), "rec-002.warc");
        storage.upload(&target, &path).await.unwrap();

        let reference = storage.durable_reference(&target).await.unwrap().unwrap();
        assert_eq!(storage.content_length(&reference).await.unwrap(), size as u64);

        let mut stream = storage.download_stream(&reference).await.unwrap();
        let mut downloaded = Vec::with_capacity(size);
        while let Some(chunk) = stream.next().await {
            downloaded.extend_from_slice(&chunk.unwrap());
        }
        assert!(downloaded == data);
    }

    #[tokio::test]
    async fn test_upload_missing_local_file_fails() {
        let dir = tempdir().unwrap();
        let result = storage()
            .upload(&target(), &dir.path().join("missing.warc"))
            .await;
        assert!(matches!(result, Err(StorageError::UploadFailed(_))));
    }

    #[tokio::test]
    async fn test_missing_object_and_foreign_reference() {
        let storage = storage();
        assert!(matches!(
            storage.content_length("s3://archive/alice/coll1/nope.warc").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            storage.content_length("s3://elsewhere/alice/coll1/a.warc").await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_presign_requires_signer() {
        let result = storage()
            .presigned_url("s3://archive/alice/coll1/a.warc", Duration::from_secs(60))
            .await;
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }

    #[test]
    fn test_profile_requires_remote_template() {
        let profile = StorageProfile::new("s3");
        assert!(matches!(
            S3Storage::from_profile(&profile),
            Err(StorageError::ConfigError(_))
        ));
    }
}
