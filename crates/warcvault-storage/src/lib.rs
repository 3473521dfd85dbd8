//! Warcvault Storage Library
//!
//! Durable storage backends for recorded files. A backend receives a local
//! file, reports when the uploaded copy is retrievable and hands back a
//! durable reference for it. Backends are selected at runtime through the
//! [`StorageRegistry`] by the `type` of a storage profile.
//!
//! # Reference format
//!
//! - Uncommitted files: `local://<absolute path>` (a bare absolute path is
//!   accepted too).
//! - S3 objects: `s3://{bucket}/{key}`, where the key is the profile's
//!   `remote_url_templ` rendered for the recording plus the file name.

pub(crate) mod keys;
pub mod loader;
pub mod local;
pub mod registry;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use loader::FileLoader;
pub use local::LocalStorage;
pub use registry::StorageRegistry;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ByteStream, ObjectTarget, Storage, StorageError, StorageResult};
pub use warcvault_core::StorageBackend;
