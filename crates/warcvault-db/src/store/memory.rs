use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use super::{glob_match, KvStore, StoreError, StoreResult};

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    /// Fields in insertion order
    Hash(Vec<(String, String)>),
    /// Members ordered by (score, member)
    SortedSet(Vec<(f64, String)>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-process fast store.
///
/// Used for single-process deployments and tests. Expiry uses the tokio clock,
/// so paused-time tests can advance past a TTL without sleeping.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
    published: Mutex<Vec<(String, String)>>,
    /// Keys in creation order, so scans are stable
    order: RwLock<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages published so far, oldest first
    pub async fn published(&self) -> Vec<(String, String)> {
        self.published.lock().await.clone()
    }

    async fn insert(&self, key: &str, entry: Entry) {
        let mut entries = self.entries.write().await;
        if entries.insert(key.to_string(), entry).is_none() {
            self.order.write().await.push(key.to_string());
        }
    }

    /// Live entry for `key`, dropping it first if it has expired.
    async fn live(&self, key: &str) -> Option<Entry> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let expired = entries.get(key)?.is_expired(now);
        if expired {
            entries.remove(key);
            self.order.write().await.retain(|k| k != key);
            return None;
        }
        entries.get(key).cloned()
    }

    async fn hash(&self, key: &str) -> StoreResult<Vec<(String, String)>> {
        match self.live(key).await.map(|e| e.value) {
            None => Ok(Vec::new()),
            Some(Value::Hash(fields)) => Ok(fields),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn scan(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        let order = self.order.read().await;
        Ok(order
            .iter()
            .filter(|key| glob_match(pattern, key))
            .filter(|key| entries.get(*key).is_some_and(|e| !e.is_expired(now)))
            .cloned()
            .collect())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.live(key).await.is_some())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match self.live(key).await.map(|e| e.value) {
            None => Ok(None),
            Some(Value::Str(s)) => Ok(Some(s)),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.insert(key, Entry::new(Value::Str(value.to_string())))
            .await;
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> StoreResult<()> {
        let entry = Entry {
            value: Value::Str(value.to_string()),
            expires_at: Some(Instant::now() + Duration::from_secs(ttl_secs)),
        };
        self.insert(key, entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        if self.entries.write().await.remove(key).is_some() {
            self.order.write().await.retain(|k| k != key);
        }
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        Ok(self
            .hash(key)
            .await?
            .into_iter()
            .find(|(f, _)| f == field)
            .map(|(_, v)| v))
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        let mut fields = self.hash(key).await?;
        match fields.iter_mut().find(|(f, _)| f == field) {
            Some((_, v)) => *v = value.to_string(),
            None => fields.push((field.to_string(), value.to_string())),
        }
        self.insert(key, Entry::new(Value::Hash(fields))).await;
        Ok(())
    }

    async fn hdel(&self, key: &str, field: &str) -> StoreResult<()> {
        let mut fields = self.hash(key).await?;
        fields.retain(|(f, _)| f != field);
        if fields.is_empty() {
            self.delete(key).await
        } else {
            self.insert(key, Entry::new(Value::Hash(fields))).await;
            Ok(())
        }
    }

    async fn hgetall(&self, key: &str) -> StoreResult<Vec<(String, String)>> {
        self.hash(key).await
    }

    async fn hincr(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64> {
        let current = match self.hget(key, field).await? {
            Some(v) => v
                .parse::<i64>()
                .map_err(|_| StoreError::WrongType(format!("{}.{}", key, field)))?,
            None => 0,
        };
        let next = current + delta;
        self.hset(key, field, &next.to_string()).await?;
        Ok(next)
    }

    async fn zadd(&self, key: &str, score: f64, member: &str) -> StoreResult<()> {
        let mut members = match self.live(key).await.map(|e| e.value) {
            None => Vec::new(),
            Some(Value::SortedSet(members)) => members,
            Some(_) => return Err(StoreError::WrongType(key.to_string())),
        };
        members.retain(|(_, m)| m != member);
        members.push((score, member.to_string()));
        members.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        self.insert(key, Entry::new(Value::SortedSet(members)))
            .await;
        Ok(())
    }

    async fn zrange_all(&self, key: &str) -> StoreResult<Vec<String>> {
        match self.live(key).await.map(|e| e.value) {
            None => Ok(Vec::new()),
            Some(Value::SortedSet(members)) => Ok(members.into_iter().map(|(_, m)| m).collect()),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    async fn publish(&self, channel: &str, message: &str) -> StoreResult<()> {
        self.published
            .lock()
            .await
            .push((channel.to_string(), message.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_keeps_insertion_order() {
        let store = MemoryStore::new();
        store.hset("h", "b", "2").await.unwrap();
        store.hset("h", "a", "1").await.unwrap();
        store.hset("h", "b", "3").await.unwrap();

        let all = store.hgetall("h").await.unwrap();
        assert_eq!(
            all,
            vec![("b".to_string(), "3".to_string()), ("a".to_string(), "1".to_string())]
        );
        assert_eq!(store.hget("h", "a").await.unwrap(), Some("1".to_string()));
        assert!(store.hgetall("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sorted_set_orders_by_score() {
        let store = MemoryStore::new();
        store.zadd("z", 2.0, "second").await.unwrap();
        store.zadd("z", 1.0, "first").await.unwrap();
        store.zadd("z", 3.0, "third").await.unwrap();
        assert_eq!(
            store.zrange_all("z").await.unwrap(),
            vec!["first", "second", "third"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn set_ex_expires() {
        let store = MemoryStore::new();
        store.set_ex("w:file", "1", 30).await.unwrap();
        assert!(store.exists("w:file").await.unwrap());

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(!store.exists("w:file").await.unwrap());
        assert!(store.scan("w:*").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn scan_matches_pattern_in_creation_order() {
        let store = MemoryStore::new();
        store.zadd("r:a:c:s2:cdxj", 0.0, "x").await.unwrap();
        store.zadd("r:a:c:s1:cdxj", 0.0, "x").await.unwrap();
        store.hset("r:a:c:s1:info", "size", "1").await.unwrap();

        let keys = store.scan("r:*:*:*:cdxj").await.unwrap();
        assert_eq!(keys, vec!["r:a:c:s2:cdxj", "r:a:c:s1:cdxj"]);
    }

    #[tokio::test]
    async fn wrong_type_is_reported() {
        let store = MemoryStore::new();
        store.set("k", "v").await.unwrap();
        assert!(matches!(
            store.hget("k", "f").await,
            Err(StoreError::WrongType(_))
        ));
    }

    #[tokio::test]
    async fn hincr_counts() {
        let store = MemoryStore::new();
        assert_eq!(store.hincr("c", "download_count", 1).await.unwrap(), 1);
        assert_eq!(store.hincr("c", "download_count", 2).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn publish_is_recorded() {
        let store = MemoryStore::new();
        store.publish("close_idle", "").await.unwrap();
        assert_eq!(
            store.published().await,
            vec![("close_idle".to_string(), String::new())]
        );
    }
}
