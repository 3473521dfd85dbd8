//! Domain models
//!
//! Recordings, collections, storage profiles and archive requests as they are
//! read from the fast store.

pub mod archive;
pub mod collection;
pub mod profile;
pub mod recording;

pub use archive::{ArchiveRequest, ArchiveTarget, DeliveryMode};
pub use collection::Collection;
pub use profile::StorageProfile;
pub use recording::{timestamp_field, FileEntry, FileLocation, InfoMap, Recording, RecordingRef, LOCAL_PREFIX};
