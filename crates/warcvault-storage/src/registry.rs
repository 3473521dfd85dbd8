//! Storage variant registry
//!
//! Maps a storage profile `type` to a constructor. Built-in variants are
//! `local` and (with the `storage-s3` feature) `s3`; further variants are
//! added with [`StorageRegistry::register`] at startup. Backends are cached
//! per profile so repeated lookups in a commit cycle reuse one client.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use warcvault_core::models::StorageProfile;

#[cfg(feature = "storage-s3")]
use crate::S3Storage;
use crate::{LocalStorage, Storage, StorageBackend, StorageResult};

/// Builds a backend from a profile
pub type StorageConstructor =
    Arc<dyn Fn(&StorageProfile) -> StorageResult<Arc<dyn Storage>> + Send + Sync>;

pub struct StorageRegistry {
    constructors: HashMap<String, StorageConstructor>,
    cache: Mutex<Vec<(StorageProfile, Arc<dyn Storage>)>>,
}

impl StorageRegistry {
    /// Registry without any variants
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
            cache: Mutex::new(Vec::new()),
        }
    }

    /// Registry with the built-in variants
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(StorageBackend::Local.as_str(), |_| {
            Ok(Arc::new(LocalStorage::new()) as Arc<dyn Storage>)
        });
        #[cfg(feature = "storage-s3")]
        registry.register(StorageBackend::S3.as_str(), |profile| {
            Ok(Arc::new(S3Storage::from_profile(profile)?) as Arc<dyn Storage>)
        });
        registry
    }

    pub fn register<F>(&mut self, type_name: &str, constructor: F)
    where
        F: Fn(&StorageProfile) -> StorageResult<Arc<dyn Storage>> + Send + Sync + 'static,
    {
        self.constructors
            .insert(type_name.to_string(), Arc::new(constructor));
    }

    pub fn is_registered(&self, type_name: &str) -> bool {
        self.constructors.contains_key(type_name)
    }

    /// Backend for a profile. `Ok(None)` when no variant is registered for
    /// the profile's type.
    pub fn resolve(&self, profile: &StorageProfile) -> StorageResult<Option<Arc<dyn Storage>>> {
        let Some(constructor) = self.constructors.get(&profile.backend_type) else {
            return Ok(None);
        };

        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((_, storage)) = cache.iter().find(|(p, _)| p == profile) {
            return Ok(Some(storage.clone()));
        }

        let storage = constructor(profile)?;
        tracing::info!(
            storage_type = %profile.backend_type,
            "Storage backend initialized"
        );
        cache.push((profile.clone(), storage.clone()));
        Ok(Some(storage))
    }
}

impl Default for StorageRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
