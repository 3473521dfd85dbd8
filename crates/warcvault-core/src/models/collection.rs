use chrono::{DateTime, Utc};

use super::recording::{timestamp_field, InfoMap};

/// A collection and its info map.
#[derive(Debug, Clone)]
pub struct Collection {
    pub owner: String,
    pub name: String,
    pub info: InfoMap,
}

impl Collection {
    /// Name of the storage profile this collection uses, if it overrides the default.
    pub fn storage_type(&self) -> Option<&str> {
        self.info
            .get("storage_type")
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn title(&self) -> Option<&str> {
        self.info
            .get("title")
            .map(String::as_str)
            .filter(|t| !t.is_empty())
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        timestamp_field(&self.info, "created_at")
    }
}
