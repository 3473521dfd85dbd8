use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// Prefix marking a file entry whose authoritative copy is still on local disk.
pub const LOCAL_PREFIX: &str = "local://";

/// Info map of a recording or collection, as stored in the fast store.
pub type InfoMap = BTreeMap<String, String>;

/// Identity of a recording: (owner, collection, recording id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordingRef {
    pub owner: String,
    pub collection: String,
    pub recording: String,
}

impl RecordingRef {
    pub fn new(
        owner: impl Into<String>,
        collection: impl Into<String>,
        recording: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            collection: collection.into(),
            recording: recording.into(),
        }
    }

    /// Template fields for key rendering.
    pub fn fields(&self) -> [(&str, &str); 3] {
        [
            ("user", self.owner.as_str()),
            ("coll", self.collection.as_str()),
            ("rec", self.recording.as_str()),
        ]
    }
}

impl fmt::Display for RecordingRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.owner, self.collection, self.recording)
    }
}

/// Where the bytes of a file entry currently live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileLocation {
    /// Not yet committed; the local copy is authoritative.
    Local(PathBuf),
    /// Committed; a backend-specific durable reference such as `s3://bucket/key`.
    Durable(String),
}

impl FileLocation {
    pub fn parse(value: &str) -> Self {
        match value.strip_prefix(LOCAL_PREFIX) {
            Some(path) => FileLocation::Local(PathBuf::from(path)),
            None if value.starts_with('/') => FileLocation::Local(PathBuf::from(value)),
            None => FileLocation::Durable(value.to_string()),
        }
    }

    pub fn local(path: &Path) -> Self {
        FileLocation::Local(path.to_path_buf())
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, FileLocation::Durable(_))
    }

    /// Serialized form stored in the fast store.
    pub fn to_reference(&self) -> String {
        match self {
            FileLocation::Local(path) => {
                format!("{}{}", LOCAL_PREFIX, path.to_string_lossy().replace('\\', "/"))
            }
            FileLocation::Durable(reference) => reference.clone(),
        }
    }
}

impl fmt::Display for FileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_reference())
    }
}

/// One physical file of a recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub location: FileLocation,
}

impl FileEntry {
    pub fn new(name: impl Into<String>, location: FileLocation) -> Self {
        Self {
            name: name.into(),
            location,
        }
    }

    /// Build an entry from a stored location; the name is the last path segment.
    pub fn from_reference(reference: &str) -> Self {
        let name = reference
            .rsplit('/')
            .next()
            .unwrap_or(reference)
            .to_string();
        Self {
            name,
            location: FileLocation::parse(reference),
        }
    }
}

/// A recording with its info map and file entries.
#[derive(Debug, Clone)]
pub struct Recording {
    pub id: RecordingRef,
    pub info: InfoMap,
    pub open: bool,
    pub index_file: Option<FileEntry>,
    pub warcs: Vec<FileEntry>,
}

impl Recording {
    /// Index file first, then WARC files in store order.
    pub fn files(&self, include_index: bool) -> impl Iterator<Item = &FileEntry> + '_ {
        self.index_file
            .iter()
            .filter(move |_| include_index)
            .chain(self.warcs.iter())
    }

    pub fn title(&self) -> Option<&str> {
        self.info
            .get("title")
            .map(String::as_str)
            .filter(|t| !t.is_empty())
    }

    pub fn size(&self) -> u64 {
        self.info
            .get("size")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        timestamp_field(&self.info, "created_at")
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        timestamp_field(&self.info, "updated_at")
    }

    pub fn rec_type(&self) -> Option<&str> {
        self.info.get("rec_type").map(String::as_str)
    }
}

/// Parse a unix-seconds field of an info map.
pub fn timestamp_field(info: &InfoMap, field: &str) -> Option<DateTime<Utc>> {
    info.get(field)
        .and_then(|v| v.parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_and_durable_locations() {
        let local = FileLocation::parse("local:///data/alice/rec-001.warc");
        assert_eq!(local, FileLocation::Local(PathBuf::from("/data/alice/rec-001.warc")));
        assert!(!local.is_committed());
        assert_eq!(local.to_reference(), "local:///data/alice/rec-001.warc");

        let durable = FileLocation::parse("s3://bucket/alice/coll1/rec-001.warc");
        assert!(durable.is_committed());
    }

    #[test]
    fn bare_absolute_path_is_local() {
        assert!(!FileLocation::parse("/data/x.warc").is_committed());
    }

    #[test]
    fn files_yield_index_first() {
        let rec = Recording {
            id: RecordingRef::new("alice", "coll1", "s1"),
            info: InfoMap::new(),
            open: false,
            index_file: Some(FileEntry::from_reference("local:///d/idx.cdxj")),
            warcs: vec![FileEntry::from_reference("local:///d/a.warc")],
        };
        let names: Vec<_> = rec.files(true).map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["idx.cdxj", "a.warc"]);
        let names: Vec<_> = rec.files(false).map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.warc"]);
    }
}
