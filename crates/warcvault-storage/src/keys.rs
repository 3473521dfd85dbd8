//! Object keys derived from a profile's remote URL template.
//!
//! `remote_url_templ` looks like `s3://bucket/prefix/{user}/{coll}/`. The
//! bucket comes from the host part; the rest is rendered per recording and
//! the file name is appended.

use warcvault_core::KeyTemplate;

use crate::traits::{ObjectTarget, StorageError, StorageResult};

#[derive(Debug, Clone)]
pub(crate) struct RemoteUrlTemplate {
    scheme: String,
    bucket: String,
    prefix: KeyTemplate,
}

impl RemoteUrlTemplate {
    pub(crate) fn parse(templ: &str) -> StorageResult<Self> {
        let (scheme, rest) = templ
            .split_once("://")
            .ok_or_else(|| StorageError::ConfigError(format!("Invalid remote URL template: {}", templ)))?;
        let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() || bucket.contains('{') {
            return Err(StorageError::ConfigError(format!(
                "Remote URL template must name a fixed bucket: {}",
                templ
            )));
        }
        Ok(Self {
            scheme: scheme.to_string(),
            bucket: bucket.to_string(),
            prefix: KeyTemplate::new(prefix),
        })
    }

    pub(crate) fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Object key for a file of a recording.
    pub(crate) fn object_key(&self, target: &ObjectTarget) -> StorageResult<String> {
        if target.file_name.is_empty()
            || target.file_name.contains('/')
            || target.file_name.contains("..")
        {
            return Err(StorageError::InvalidKey(target.file_name.clone()));
        }
        let prefix = self.prefix.render(&target.recording.fields());
        let prefix = prefix.trim_start_matches('/');
        if prefix.is_empty() || prefix.ends_with('/') {
            Ok(format!("{}{}", prefix, target.file_name))
        } else {
            Ok(format!("{}/{}", prefix, target.file_name))
        }
    }

    pub(crate) fn reference(&self, key: &str) -> String {
        format!("{}://{}/{}", self.scheme, self.bucket, key)
    }

    /// Object key from a durable reference produced by [`Self::reference`].
    pub(crate) fn key_from_reference(&self, reference: &str) -> StorageResult<String> {
        let base = format!("{}://{}/", self.scheme, self.bucket);
        reference
            .strip_prefix(&base)
            .filter(|key| !key.is_empty())
            .map(String::from)
            .ok_or_else(|| StorageError::InvalidKey(reference.to_string()))
    }
}
