//! On-demand WARC archive assembly.
//!
//! A download is one collection `warcinfo` record followed, per recording,
//! by a recording `warcinfo` record and the bytes of the recording's files
//! (index first, then WARC files). Files are opened one at a time as the
//! consumer reads; each file handle is dropped when its bytes are exhausted,
//! when reading fails, or when the consumer drops the stream.

use std::pin::Pin;

use bytes::Bytes;
use chrono::Utc;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use warcvault_core::models::{
    ArchiveRequest, ArchiveTarget, Collection, DeliveryMode, FileEntry, RecordingRef,
};
use warcvault_core::AppError;
use warcvault_db::{CollectionRepository, RecordingRepository};
use warcvault_storage::FileLoader;

use crate::resolver::StorageResolver;
use crate::warcinfo::{quote, WarcinfoWriter};

/// Response body of a download
pub type ArchiveBody = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// A ready-to-send download
pub struct ArchiveStream {
    pub filename: String,
    /// Exact byte count in length-known mode; `None` for chunked delivery
    pub content_length: Option<u64>,
    pub body: ArchiveBody,
}

impl std::fmt::Debug for ArchiveStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveStream")
            .field("filename", &self.filename)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// One recording's share of a download
struct RecordingPlan {
    id: RecordingRef,
    warcinfo: Bytes,
    files: Vec<FileEntry>,
}

#[derive(Clone)]
pub struct ArchiveAssembler {
    collections: CollectionRepository,
    recordings: RecordingRepository,
    resolver: StorageResolver,
    warcinfo: WarcinfoWriter,
    filename_templ: String,
}

impl ArchiveAssembler {
    pub fn new(
        collections: CollectionRepository,
        recordings: RecordingRepository,
        resolver: StorageResolver,
        warcinfo: WarcinfoWriter,
        filename_templ: impl Into<String>,
    ) -> Self {
        Self {
            collections,
            recordings,
            resolver,
            warcinfo,
            filename_templ: filename_templ.into(),
        }
    }

    /// Download file name for a base name, e.g. `coll1-20260101120000.warc.gz`.
    pub fn download_filename(&self, name: &str, timestamp: &str) -> String {
        self.filename_templ
            .replace("{title}", &quote(name))
            .replace("{timestamp}", timestamp)
    }

    /// Build the download for a request. Counts the download against the
    /// collection.
    pub async fn assemble(&self, request: &ArchiveRequest) -> Result<ArchiveStream, AppError> {
        let collection = self
            .collections
            .get(&request.owner, &request.collection)
            .await?
            .ok_or_else(|| AppError::NotFound("no_such_collection".to_string()))?;

        self.collections
            .incr_download_count(&request.owner, &request.collection)
            .await?;

        let timestamp = Utc::now().format("%Y%m%d%H%M%S").to_string();
        let filename = self.download_filename(
            &request.target.download_name(&request.collection),
            &timestamp,
        );

        let storage = self.resolver.for_collection(&collection).await?;
        let loader = FileLoader::new(storage);

        let coll_record = self.warcinfo.collection_record(&collection, &filename)?;
        let ids = self
            .recording_ids(&request.owner, &request.collection, &request.target)
            .await?;

        tracing::info!(
            user = %request.owner,
            coll = %request.collection,
            recordings = ids.len(),
            mode = ?request.mode,
            filename = %filename,
            "Assembling archive download"
        );

        let download_name = filename.clone();
        let (content_length, body) = match request.mode {
            DeliveryMode::LengthKnown => {
                let mut plans = Vec::with_capacity(ids.len());
                let mut total = coll_record.len() as u64;
                for id in ids {
                    let Some(plan) = self.plan(&collection, &id, &filename).await? else {
                        continue;
                    };
                    let (plan, size) = sized_plan(plan, &loader).await;
                    total += size;
                    plans.push(plan);
                }

                let recordings = stream::iter(plans)
                    .map(move |plan| plan_stream(plan, loader.clone()))
                    .flatten();
                (Some(total), body_stream(coll_record, recordings.boxed()))
            }
            DeliveryMode::Chunked => {
                let this = self.clone();
                let recordings = stream::iter(ids)
                    .then(move |id| {
                        let this = this.clone();
                        let collection = collection.clone();
                        let filename = filename.clone();
                        async move {
                            match this.plan(&collection, &id, &filename).await {
                                Ok(plan) => plan,
                                Err(e) => {
                                    tracing::warn!(
                                        recording = %id,
                                        error = %e,
                                        "Skipping recording that could not be loaded"
                                    );
                                    None
                                }
                            }
                        }
                    })
                    .filter_map(futures::future::ready)
                    .map(move |plan| plan_stream(plan, loader.clone()))
                    .flatten();
                (None, body_stream(coll_record, recordings.boxed()))
            }
        };

        Ok(ArchiveStream {
            filename: download_name,
            content_length,
            body,
        })
    }

    /// Target recording ids in collection order.
    async fn recording_ids(
        &self,
        owner: &str,
        coll: &str,
        target: &ArchiveTarget,
    ) -> Result<Vec<RecordingRef>, AppError> {
        Ok(self
            .recordings
            .list_ids(owner, coll)
            .await?
            .into_iter()
            .filter(|id| target.includes(id))
            .map(|id| RecordingRef::new(owner, coll, id))
            .collect())
    }

    async fn plan(
        &self,
        collection: &Collection,
        id: &RecordingRef,
        filename: &str,
    ) -> Result<Option<RecordingPlan>, AppError> {
        let Some(recording) = self.recordings.get(id).await? else {
            tracing::debug!(recording = %id, "Listed recording has no data, skipping");
            return Ok(None);
        };
        let warcinfo = self
            .warcinfo
            .recording_record(collection, &recording, filename)?;
        let files = recording.files(true).cloned().collect();
        Ok(Some(RecordingPlan {
            id: id.clone(),
            warcinfo,
            files,
        }))
    }
}

/// Determine file sizes; files whose size is unknown are left out.
async fn sized_plan(mut plan: RecordingPlan, loader: &FileLoader) -> (RecordingPlan, u64) {
    let mut size = plan.warcinfo.len() as u64;
    let mut files = Vec::with_capacity(plan.files.len());
    for file in plan.files {
        match loader.content_length(&file.location).await {
            Ok(len) => {
                size += len;
                files.push(file);
            }
            Err(e) => tracing::warn!(
                recording = %plan.id,
                file = %file.name,
                error = %e,
                "Skipping file with unknown size"
            ),
        }
    }
    plan.files = files;
    (plan, size)
}

fn body_stream(coll_record: Bytes, recordings: BoxStream<'static, Bytes>) -> ArchiveBody {
    Box::pin(
        stream::once(futures::future::ready(coll_record))
            .chain(recordings)
            .map(Ok),
    )
}

fn plan_stream(plan: RecordingPlan, loader: FileLoader) -> BoxStream<'static, Bytes> {
    let RecordingPlan { id, warcinfo, files } = plan;
    let files = stream::iter(files)
        .map(move |file| file_stream(id.clone(), file, loader.clone()))
        .flatten();
    stream::once(futures::future::ready(warcinfo))
        .chain(files)
        .boxed()
}

/// Bytes of one file. An unreadable file yields nothing; a read error ends
/// the file early.
fn file_stream(id: RecordingRef, file: FileEntry, loader: FileLoader) -> BoxStream<'static, Bytes> {
    stream::once(async move {
        match loader.open(&file.location).await {
            Ok(body) => body
                .scan((id, file.name), |state, chunk| {
                    let (id, name) = &*state;
                    let chunk = match chunk {
                        Ok(bytes) => Some(bytes),
                        Err(e) => {
                            tracing::warn!(
                                recording = %id,
                                file = %name,
                                error = %e,
                                "File read failed, truncating"
                            );
                            None
                        }
                    };
                    futures::future::ready(chunk)
                })
                .boxed(),
            Err(e) => {
                tracing::warn!(
                    recording = %id,
                    file = %file.name,
                    error = %e,
                    "Skipping file that could not be loaded"
                );
                stream::empty().boxed()
            }
        }
    })
    .flatten()
    .boxed()
}
