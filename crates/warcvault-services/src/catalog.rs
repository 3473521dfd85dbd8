//! Listing and single-file download of committed WARC files for
//! bulk-transfer (WASAPI-style) tooling.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde::Serialize;
use warcvault_core::models::{Collection, FileEntry, FileLocation};
use warcvault_core::AppError;
use warcvault_db::{CollectionRepository, RecordingRepository};
use warcvault_storage::{FileLoader, LocalStorage, Storage};

use crate::archive::ArchiveStream;
use crate::resolver::StorageResolver;
use crate::warcinfo::quote;

const WARC_CONTENT_TYPE: &str = "application/warc";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CatalogEntry {
    #[serde(rename = "content-type")]
    pub content_type: String,
    pub filename: String,
    pub rec_id: String,
    pub coll_name: String,
    pub checksum: String,
    pub locations: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogListing {
    pub files: Vec<CatalogEntry>,
    #[serde(rename = "include-extra")]
    pub include_extra: bool,
}

#[derive(Clone)]
pub struct CatalogLister {
    collections: CollectionRepository,
    recordings: RecordingRepository,
    resolver: StorageResolver,
    public_origin: String,
    presign_expiry: Duration,
}

impl CatalogLister {
    pub fn new(
        collections: CollectionRepository,
        recordings: RecordingRepository,
        resolver: StorageResolver,
        public_origin: impl Into<String>,
        presign_expiry: Duration,
    ) -> Self {
        Self {
            collections,
            recordings,
            resolver,
            public_origin: public_origin.into().trim_end_matches('/').to_string(),
            presign_expiry,
        }
    }

    /// Same-service URL serving one committed file.
    pub fn download_url(&self, user: &str, coll: &str, filename: &str) -> String {
        format!(
            "{}/api/v1/download/{}/{}/{}",
            self.public_origin,
            quote(user),
            quote(coll),
            quote(filename)
        )
    }

    /// Every WARC file of every fully committed recording in one or all of a
    /// user's collections.
    pub async fn list(&self, user: &str, coll: Option<&str>) -> Result<CatalogListing, AppError> {
        if !self.collections.user_exists(user).await? {
            return Err(AppError::NotFound("no_such_user".to_string()));
        }

        let collections = match coll {
            Some(name) => vec![self
                .collections
                .get(user, name)
                .await?
                .ok_or_else(|| AppError::NotFound("no_such_collection".to_string()))?],
            None => {
                let mut all = Vec::new();
                for name in self.collections.list_names(user).await? {
                    if let Some(collection) = self.collections.get(user, &name).await? {
                        all.push(collection);
                    }
                }
                all
            }
        };

        let mut files = Vec::new();
        for collection in &collections {
            self.list_collection(collection, &mut files).await?;
        }

        tracing::debug!(user = %user, files = files.len(), "Catalog listed");

        Ok(CatalogListing {
            files,
            include_extra: true,
        })
    }

    async fn list_collection(
        &self,
        collection: &Collection,
        files: &mut Vec<CatalogEntry>,
    ) -> Result<(), AppError> {
        let storage = self.resolver.for_collection(collection).await?;

        for recording in self
            .recordings
            .list(&collection.owner, &collection.name)
            .await?
        {
            if !self.recordings.is_fully_committed(&recording.id).await? {
                continue;
            }

            for file in recording.files(false) {
                match self.entry(collection, storage.as_ref(), file).await {
                    Ok((checksum, location)) => files.push(CatalogEntry {
                        content_type: WARC_CONTENT_TYPE.to_string(),
                        filename: file.name.clone(),
                        rec_id: recording.id.recording.clone(),
                        coll_name: collection.name.clone(),
                        checksum,
                        locations: vec![location],
                    }),
                    Err(e) => tracing::warn!(
                        recording = %recording.id,
                        file = %file.name,
                        error = %e,
                        "Leaving file out of catalog"
                    ),
                }
            }
        }
        Ok(())
    }

    /// Checksum and retrieval location of one file.
    async fn entry(
        &self,
        collection: &Collection,
        storage: Option<&Arc<dyn Storage>>,
        file: &FileEntry,
    ) -> Result<(String, String), AppError> {
        let reference = file.location.to_reference();
        match &file.location {
            FileLocation::Local(_) => {
                let checksum = LocalStorage::new().checksum(&reference).await?;
                let url = self.download_url(&collection.owner, &collection.name, &file.name);
                Ok((checksum, url))
            }
            FileLocation::Durable(_) => {
                let storage = storage.ok_or_else(|| {
                    AppError::Storage(format!("No storage backend for {}", reference))
                })?;
                let checksum = storage.checksum(&reference).await?;
                let url = storage.presigned_url(&reference, self.presign_expiry).await?;
                Ok((checksum, url))
            }
        }
    }

    /// Stream one WARC file of a collection by name.
    pub async fn download_file(
        &self,
        user: &str,
        coll: &str,
        filename: &str,
    ) -> Result<ArchiveStream, AppError> {
        if !self.collections.user_exists(user).await? {
            return Err(AppError::NotFound("no_such_user".to_string()));
        }
        let collection = self
            .collections
            .get(user, coll)
            .await?
            .ok_or_else(|| AppError::NotFound("no_such_collection".to_string()))?;

        let mut found = None;
        for recording in self.recordings.list(user, coll).await? {
            if let Some(file) = recording.warcs.into_iter().find(|f| f.name == filename) {
                found = Some(file);
                break;
            }
        }
        let file = found.ok_or_else(|| AppError::NotFound("file_not_found".to_string()))?;

        let storage = self.resolver.for_collection(&collection).await?;
        let body = FileLoader::new(storage)
            .open(&file.location)
            .await
            .map_err(|e| {
                tracing::warn!(file = %filename, error = %e, "File could not be loaded");
                AppError::BadRequest("file_load_error".to_string())
            })?;

        Ok(ArchiveStream {
            filename: quote(filename),
            content_length: None,
            body: Box::pin(body.map(|chunk| chunk.map_err(std::io::Error::other))),
        })
    }
}
