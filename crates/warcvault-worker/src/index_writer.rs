//! Consolidation of a recording's index fragments into one CDXJ file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::io::AsyncWriteExt;
use warcvault_core::models::{FileEntry, FileLocation, RecordingRef};
use warcvault_db::RecordingRepository;

const BASE32_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

#[derive(Clone)]
pub struct IndexWriter {
    recordings: RecordingRepository,
    record_root: PathBuf,
    name_templ: String,
}

impl IndexWriter {
    pub fn new(recordings: RecordingRepository, record_root: impl Into<PathBuf>, name_templ: impl Into<String>) -> Self {
        Self {
            recordings,
            record_root: record_root.into(),
            name_templ: name_templ.into(),
        }
    }

    /// The recording's consolidated index, written from its fragments if no
    /// index location has been recorded yet.
    pub async fn ensure_index(&self, rec: &RecordingRef) -> Result<FileEntry> {
        if let Some(existing) = self.recordings.index_location(rec).await? {
            return Ok(FileEntry::from_reference(&existing));
        }

        let info = self.recordings.info(rec).await?;
        let updated_at = warcvault_core::models::timestamp_field(&info, "updated_at")
            .unwrap_or_else(Utc::now);
        let name = self.index_name(updated_at);

        let dir = self.record_root.join(&rec.owner);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join(&name);

        let fragments = self.recordings.index_fragments(rec).await?;
        let mut file = tokio::fs::File::create(&path)
            .await
            .with_context(|| format!("Failed to create {}", path.display()))?;
        for fragment in &fragments {
            file.write_all(fragment.as_bytes()).await?;
        }
        file.sync_all()
            .await
            .with_context(|| format!("Failed to sync {}", path.display()))?;

        let location = FileLocation::local(&path);
        self.recordings
            .set_index_location(rec, &location.to_reference())
            .await?;

        tracing::info!(
            recording = %rec,
            path = %path.display(),
            fragments = fragments.len(),
            "Index file written"
        );

        Ok(FileEntry::new(name, location))
    }

    fn index_name(&self, updated_at: DateTime<Utc>) -> String {
        let mut rng = rand::rng();
        let random: String = (0..8)
            .map(|_| BASE32_ALPHABET[rng.random_range(0..BASE32_ALPHABET.len())] as char)
            .collect();
        self.name_templ
            .replace("{timestamp}", &updated_at.format("%Y%m%d%H%M%S").to_string())
            .replace("{random}", &random)
    }
}
