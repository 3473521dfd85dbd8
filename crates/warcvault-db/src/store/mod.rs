//! Fast key-value store abstraction
//!
//! The operations the committer and the download services need from the fast
//! store: string keys with optional TTL, hash maps, an ordered set of index
//! fragments, key scanning and pub/sub publication. Iteration order of hashes
//! and scans is stable for a given store but otherwise unspecified.

mod memory;
#[cfg(feature = "redis")]
mod redis_store;

pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use warcvault_core::AppError;

/// Fast store operation errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Wrong value type for key {0}")]
    WrongType(String),

    #[error("Invalid store URL: {0}")]
    InvalidUrl(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Result type for fast store operations
pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err.to_string())
    }
}

#[async_trait]
pub trait KvStore: Send + Sync {
    /// Keys matching a glob pattern (`*` and `?` wildcards)
    async fn scan(&self, pattern: &str) -> StoreResult<Vec<String>>;

    async fn exists(&self, key: &str) -> StoreResult<bool>;

    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Set a value that expires after `ttl_secs` seconds
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> StoreResult<()>;

    async fn delete(&self, key: &str) -> StoreResult<()>;

    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>>;

    async fn hset(&self, key: &str, field: &str, value: &str) -> StoreResult<()>;

    async fn hdel(&self, key: &str, field: &str) -> StoreResult<()>;

    /// All fields of a hash; empty when the key does not exist
    async fn hgetall(&self, key: &str) -> StoreResult<Vec<(String, String)>>;

    async fn hincr(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64>;

    /// Add a member to a sorted set
    async fn zadd(&self, key: &str, score: f64, member: &str) -> StoreResult<()>;

    /// All members of a sorted set, lowest score first
    async fn zrange_all(&self, key: &str) -> StoreResult<Vec<String>>;

    async fn publish(&self, channel: &str, message: &str) -> StoreResult<()>;
}

/// Open the fast store named by `url`: `memory://` or `redis://host:port/db`.
pub async fn connect(url: &str) -> StoreResult<Arc<dyn KvStore>> {
    if url.starts_with("memory://") {
        tracing::warn!("Using in-process memory store; state is not shared between processes");
        return Ok(Arc::new(MemoryStore::new()));
    }

    #[cfg(feature = "redis")]
    if url.starts_with("redis://") || url.starts_with("rediss://") {
        let store = RedisStore::connect(url).await?;
        return Ok(Arc::new(store));
    }

    Err(StoreError::InvalidUrl(url.to_string()))
}

/// Redis-style glob match supporting `*` and `?`.
pub(crate) fn glob_match(pattern: &str, key: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let k: Vec<char> = key.chars().collect();

    let (mut pi, mut ki) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ki < k.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == k[ki]) {
            pi += 1;
            ki += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ki));
            pi += 1;
        } else if let Some((sp, sk)) = star {
            pi = sp + 1;
            ki = sk + 1;
            star = Some((sp, sk + 1));
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}
