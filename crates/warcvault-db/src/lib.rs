//! Warcvault DB Library
//!
//! Access to the fast key-value store that holds all recording, collection and
//! commit state, plus typed repositories on top of it. The store is the single
//! source of truth for commit progress; nothing here caches state in memory.

pub mod repository;
pub mod store;

pub use repository::{CollectionRepository, CommitTracker, ProfileRepository, RecordingRepository};
pub use store::{connect, KvStore, MemoryStore, StoreError, StoreResult};
#[cfg(feature = "redis")]
pub use store::RedisStore;
