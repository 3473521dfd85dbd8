//! Warcvault Core Library
//!
//! Configuration, error types, key templates and domain models shared by the
//! storage committer, the archive services and the HTTP layer.

pub mod config;
pub mod error;
pub mod keys;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use keys::{KeyTemplate, KeyTemplates};
pub use storage_types::StorageBackend;
