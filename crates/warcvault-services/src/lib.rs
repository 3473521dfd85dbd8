//! Warcvault Services Layer
//!
//! Read-side services over committed and uncommitted recordings: resolving a
//! collection's storage backend, assembling multi-recording WARC downloads
//! and listing committed files for bulk-transfer tooling. The HTTP layer in
//! `warcvault-api` stays thin and delegates here.

pub mod archive;
pub mod catalog;
pub mod resolver;
pub mod warcinfo;

pub use archive::{ArchiveAssembler, ArchiveBody, ArchiveStream};
pub use catalog::{CatalogEntry, CatalogLister, CatalogListing};
pub use resolver::StorageResolver;
pub use warcinfo::WarcinfoWriter;
pub use warcvault_storage::{
    FileLoader, LocalStorage, ObjectTarget, Storage, StorageBackend, StorageError,
    StorageRegistry, StorageResult,
};
