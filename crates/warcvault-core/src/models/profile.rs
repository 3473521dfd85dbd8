use std::collections::BTreeMap;

/// Named storage configuration: a backend type plus its connection parameters.
///
/// Stored in the fast store as a flat map whose `type` field selects the
/// backend variant; every other field is passed to the variant untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StorageProfile {
    pub backend_type: String,
    pub params: BTreeMap<String, String>,
}

impl StorageProfile {
    pub fn new(backend_type: impl Into<String>) -> Self {
        Self {
            backend_type: backend_type.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Build a profile from a stored map. Returns `None` when no `type` is set.
    pub fn from_map(mut map: BTreeMap<String, String>) -> Option<Self> {
        let backend_type = map.remove("type").filter(|t| !t.is_empty())?;
        Some(Self {
            backend_type,
            params: map,
        })
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}
