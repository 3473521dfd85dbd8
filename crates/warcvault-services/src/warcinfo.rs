//! `warcinfo` records describing a collection or a recording.
//!
//! Each record is written as its own gzip member so records can be
//! concatenated with the (already gzipped) WARC files of a download.

use std::io::Write;

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use warcvault_core::models::{Collection, InfoMap, Recording};

const WARC_FORMAT: &str = "WARC File Format 1.0";

/// Descriptive fields copied from an info map into `json-metadata`
const COPY_FIELDS: &[&str] = &[
    "title",
    "desc",
    "size",
    "updated_at",
    "created_at",
    "recorded_at",
    "pages",
    "lists",
    "public",
    "public_index",
];

/// Fields always emitted as JSON strings
const TEXT_FIELDS: &[&str] = &["title", "desc"];

/// Everything except unreserved characters is percent-encoded
pub(crate) const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~');

pub(crate) fn quote(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

#[derive(Debug, Clone)]
pub struct WarcinfoWriter {
    software: String,
}

impl WarcinfoWriter {
    pub fn new(software: impl Into<String>) -> Self {
        Self {
            software: software.into(),
        }
    }

    /// Record for a whole collection.
    pub fn collection_record(&self, collection: &Collection, filename: &str) -> std::io::Result<Bytes> {
        let mut metadata = Map::new();
        metadata.insert("type".to_string(), Value::from("collection"));

        self.write(
            &collection.owner,
            &quote(&collection.name),
            metadata,
            &collection.info,
            filename,
        )
    }

    /// Record for one recording of a collection.
    pub fn recording_record(
        &self,
        collection: &Collection,
        recording: &Recording,
        filename: &str,
    ) -> std::io::Result<Bytes> {
        let mut metadata = Map::new();
        metadata.insert("type".to_string(), Value::from("recording"));
        if let Some(rec_type) = recording.rec_type().filter(|t| !t.is_empty()) {
            metadata.insert("rec_type".to_string(), Value::from(rec_type));
        }

        let is_part_of = format!(
            "{}/{}",
            quote(&collection.name),
            quote(&recording.id.recording)
        );
        self.write(
            &collection.owner,
            &is_part_of,
            metadata,
            &recording.info,
            filename,
        )
    }

    fn write(
        &self,
        creator: &str,
        is_part_of: &str,
        mut metadata: Map<String, Value>,
        info: &InfoMap,
        filename: &str,
    ) -> std::io::Result<Bytes> {
        for field in COPY_FIELDS {
            if let Some(value) = info.get(*field) {
                metadata.insert(field.to_string(), field_value(field, value));
            }
        }

        let has_title = metadata
            .get("title")
            .and_then(Value::as_str)
            .is_some_and(|t| !t.is_empty());
        if !has_title {
            let created = info
                .get("created_at")
                .and_then(|v| v.parse::<i64>().ok())
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .unwrap_or_else(Utc::now);
            metadata.insert(
                "title".to_string(),
                Value::from(format!("Session from {}", created.format("%Y-%m-%d %H:%M:%S"))),
            );
            metadata.insert("auto_title".to_string(), Value::Bool(true));
        }

        let json = Value::Object(metadata).to_string();
        let fields = [
            ("software", self.software.as_str()),
            ("format", WARC_FORMAT),
            ("creator", creator),
            ("isPartOf", is_part_of),
            ("json-metadata", json.as_str()),
        ];

        let mut block = String::new();
        for (name, value) in fields {
            block.push_str(name);
            block.push_str(": ");
            block.push_str(value);
            block.push_str("\r\n");
        }

        gzip_member(&warcinfo_record(filename, block.as_bytes(), Utc::now()))
    }
}

/// Text fields stay strings; everything else is JSON when it parses as JSON.
fn field_value(field: &str, value: &str) -> Value {
    if TEXT_FIELDS.contains(&field) {
        return Value::from(value);
    }
    serde_json::from_str(value).unwrap_or_else(|_| Value::from(value))
}

fn warcinfo_record(filename: &str, block: &[u8], date: DateTime<Utc>) -> Vec<u8> {
    let digest = hex::encode(Sha256::digest(block));

    let mut record = Vec::with_capacity(block.len() + 512);
    record.extend_from_slice(b"WARC/1.0\r\n");
    record.extend_from_slice(b"WARC-Type: warcinfo\r\n");
    record.extend_from_slice(
        format!("WARC-Record-ID: <urn:uuid:{}>\r\n", uuid::Uuid::new_v4()).as_bytes(),
    );
    if !filename.is_empty() {
        record.extend_from_slice(format!("WARC-Filename: {}\r\n", filename).as_bytes());
    }
    record.extend_from_slice(
        format!(
            "WARC-Date: {}\r\n",
            date.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
        .as_bytes(),
    );
    record.extend_from_slice(b"Content-Type: application/warc-fields\r\n");
    record.extend_from_slice(format!("WARC-Block-Digest: sha256:{}\r\n", digest).as_bytes());
    record.extend_from_slice(format!("Content-Length: {}\r\n", block.len()).as_bytes());
    record.extend_from_slice(b"\r\n");
    record.extend_from_slice(block);
    record.extend_from_slice(b"\r\n\r\n");
    record
}

fn gzip_member(data: &[u8]) -> std::io::Result<Bytes> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(Bytes::from(encoder.finish()?))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use warcvault_core::models::RecordingRef;

    pub(crate) fn gunzip(data: &[u8]) -> String {
        let mut out = String::new();
        GzDecoder::new(data).read_to_string(&mut out).unwrap();
        out
    }

    /// `json-metadata` of a decompressed warcinfo record
    pub(crate) fn json_metadata(record: &str) -> Value {
        let line = record
            .lines()
            .find_map(|l| l.strip_prefix("json-metadata: "))
            .unwrap();
        serde_json::from_str(line).unwrap()
    }

    fn collection(info: &[(&str, &str)]) -> Collection {
        Collection {
            owner: "alice".to_string(),
            name: "my coll".to_string(),
            info: info
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn collection_record_fields() {
        let writer = WarcinfoWriter::new("Warcvault v0.1.0");
        let record = writer
            .collection_record(
                &collection(&[("title", "Research"), ("size", "1024"), ("public", "true")]),
                "my%20coll-20260101000000.warc.gz",
            )
            .unwrap();
        let text = gunzip(&record);

        assert!(text.starts_with("WARC/1.0\r\nWARC-Type: warcinfo\r\n"));
        assert!(text.contains("software: Warcvault v0.1.0\r\n"));
        assert!(text.contains("format: WARC File Format 1.0\r\n"));
        assert!(text.contains("creator: alice\r\n"));
        assert!(text.contains("isPartOf: my%20coll\r\n"));
        assert!(text.contains("WARC-Block-Digest: sha256:"));

        let meta = json_metadata(&text);
        assert_eq!(meta["type"], "collection");
        assert_eq!(meta["title"], "Research");
        assert_eq!(meta["size"], 1024);
        assert_eq!(meta["public"], true);
        assert!(meta.get("auto_title").is_none());
    }

    #[test]
    fn recording_record_generates_title() {
        let writer = WarcinfoWriter::new("Warcvault v0.1.0");
        let recording = Recording {
            id: RecordingRef::new("alice", "my coll", "session1"),
            info: [
                ("created_at".to_string(), "1767225600".to_string()),
                ("rec_type".to_string(), "patch".to_string()),
            ]
            .into_iter()
            .collect(),
            open: false,
            index_file: None,
            warcs: Vec::new(),
        };

        let record = writer
            .recording_record(&collection(&[]), &recording, "")
            .unwrap();
        let text = gunzip(&record);

        assert!(text.contains("isPartOf: my%20coll/session1\r\n"));
        assert!(!text.contains("WARC-Filename"));
        let meta = json_metadata(&text);
        assert_eq!(meta["type"], "recording");
        assert_eq!(meta["rec_type"], "patch");
        assert_eq!(meta["title"], "Session from 2026-01-01 00:00:00");
        assert_eq!(meta["auto_title"], true);
        assert_eq!(meta["created_at"], 1767225600);
    }

    #[test]
    fn content_length_matches_block() {
        let record = warcinfo_record("f.warc.gz", b"software: x\r\n", Utc::now());
        let text = String::from_utf8(record).unwrap();
        assert!(text.contains("Content-Length: 13\r\n"));
        assert!(text.ends_with("\r\n\r\nsoftware: x\r\n\r\n\r\n"));
    }
}
