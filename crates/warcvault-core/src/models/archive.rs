/// Which recordings of a collection an archive download covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveTarget {
    /// Every recording in the collection
    All,
    /// The named recordings, in collection order
    Recordings(Vec<String>),
}

impl ArchiveTarget {
    /// Parse `*` or a comma-separated list of recording ids.
    pub fn parse(recs: &str) -> Self {
        if recs == "*" {
            return ArchiveTarget::All;
        }
        ArchiveTarget::Recordings(
            recs.split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    pub fn includes(&self, recording: &str) -> bool {
        match self {
            ArchiveTarget::All => true,
            ArchiveTarget::Recordings(list) => list.iter().any(|r| r == recording),
        }
    }

    /// Base name of the downloaded file, before the timestamp is appended.
    pub fn download_name(&self, collection: &str) -> String {
        match self {
            ArchiveTarget::All => collection.to_string(),
            ArchiveTarget::Recordings(list) if list.len() == 1 => list[0].clone(),
            ArchiveTarget::Recordings(list) => format!("{}-{}", collection, list.join(",")),
        }
    }
}

/// How an archive stream is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Total size computed up front and sent as Content-Length
    LengthKnown,
    /// Size never computed; bytes sent with chunked transfer encoding
    Chunked,
}

impl DeliveryMode {
    pub fn from_chunked_flag(chunked: bool) -> Self {
        if chunked {
            DeliveryMode::Chunked
        } else {
            DeliveryMode::LengthKnown
        }
    }
}

/// A request for an archive stream.
#[derive(Debug, Clone)]
pub struct ArchiveRequest {
    pub owner: String,
    pub collection: String,
    pub target: ArchiveTarget,
    pub mode: DeliveryMode,
}
