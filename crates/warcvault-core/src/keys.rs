//! Fast-store key templates.
//!
//! Keys are built from `{field}` templates such as `r:{user}:{coll}:{rec}:cdxj`.
//! The same template renders a concrete key, produces a glob for `SCAN`, and
//! parses a scanned key back into its fields. Adjacent fields must be separated
//! by a literal and field values must not contain the separator that follows
//! them.

use std::collections::HashMap;

use crate::models::RecordingRef;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Field(String),
}

/// A parsed `{field}` key template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTemplate {
    raw: String,
    parts: Vec<Part>,
}

impl KeyTemplate {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let mut parts = Vec::new();
        let mut rest = raw.as_str();

        while let Some(start) = rest.find('{') {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            if start > 0 {
                parts.push(Part::Literal(rest[..start].to_string()));
            }
            parts.push(Part::Field(rest[start + 1..start + len].to_string()));
            rest = &rest[start + len + 1..];
        }
        if !rest.is_empty() {
            parts.push(Part::Literal(rest.to_string()));
        }

        Self { raw, parts }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Render the template. Fields without a value render as `*`.
    pub fn render(&self, fields: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(self.raw.len() + 32);
        for part in &self.parts {
            match part {
                Part::Literal(lit) => out.push_str(lit),
                Part::Field(name) => {
                    let value = fields
                        .iter()
                        .find(|(k, _)| k == name)
                        .map(|(_, v)| *v)
                        .unwrap_or("*");
                    out.push_str(value);
                }
            }
        }
        out
    }

    /// Glob matching every key this template can produce.
    pub fn glob(&self) -> String {
        self.render(&[])
    }

    /// Extract field values from a concrete key, or `None` if it does not match.
    pub fn parse(&self, key: &str) -> Option<HashMap<String, String>> {
        let mut fields = HashMap::new();
        let mut pos = 0;
        let mut iter = self.parts.iter().peekable();

        while let Some(part) = iter.next() {
            match part {
                Part::Literal(lit) => {
                    if !key[pos..].starts_with(lit.as_str()) {
                        return None;
                    }
                    pos += lit.len();
                }
                Part::Field(name) => {
                    let end = match iter.peek() {
                        Some(Part::Literal(next)) => pos + key[pos..].find(next.as_str())?,
                        _ => key.len(),
                    };
                    if end == pos {
                        return None;
                    }
                    fields.insert(name.clone(), key[pos..end].to_string());
                    pos = end;
                }
            }
        }

        (pos == key.len()).then_some(fields)
    }
}

/// All key templates used by the fast store.
#[derive(Debug, Clone)]
pub struct KeyTemplates {
    pub user_info: KeyTemplate,
    pub user_colls: KeyTemplate,
    pub coll_info: KeyTemplate,
    pub coll_recs: KeyTemplate,
    pub rec_info: KeyTemplate,
    pub rec_warc: KeyTemplate,
    pub rec_open: KeyTemplate,
    pub rec_cdxj: KeyTemplate,
    pub commit_wait: KeyTemplate,
    pub storage_profile: KeyTemplate,
}

impl Default for KeyTemplates {
    fn default() -> Self {
        Self {
            user_info: KeyTemplate::new("u:{user}:info"),
            user_colls: KeyTemplate::new("u:{user}:colls"),
            coll_info: KeyTemplate::new("c:{user}:{coll}:info"),
            coll_recs: KeyTemplate::new("c:{user}:{coll}:recs"),
            rec_info: KeyTemplate::new("r:{user}:{coll}:{rec}:info"),
            rec_warc: KeyTemplate::new("r:{user}:{coll}:{rec}:warc"),
            rec_open: KeyTemplate::new("r:{user}:{coll}:{rec}:open"),
            rec_cdxj: KeyTemplate::new("r:{user}:{coll}:{rec}:cdxj"),
            commit_wait: KeyTemplate::new("w:{filename}"),
            storage_profile: KeyTemplate::new("s:{name}"),
        }
    }
}

impl KeyTemplates {
    pub fn user_info(&self, user: &str) -> String {
        self.user_info.render(&[("user", user)])
    }

    pub fn user_colls(&self, user: &str) -> String {
        self.user_colls.render(&[("user", user)])
    }

    pub fn coll_info(&self, user: &str, coll: &str) -> String {
        self.coll_info.render(&[("user", user), ("coll", coll)])
    }

    pub fn coll_recs(&self, user: &str, coll: &str) -> String {
        self.coll_recs.render(&[("user", user), ("coll", coll)])
    }

    pub fn rec_info(&self, rec: &RecordingRef) -> String {
        self.rec_info.render(&rec.fields())
    }

    pub fn rec_warc(&self, rec: &RecordingRef) -> String {
        self.rec_warc.render(&rec.fields())
    }

    pub fn rec_open(&self, rec: &RecordingRef) -> String {
        self.rec_open.render(&rec.fields())
    }

    pub fn rec_cdxj(&self, rec: &RecordingRef) -> String {
        self.rec_cdxj.render(&rec.fields())
    }

    /// Glob over the index-fragment keys of every recording.
    pub fn cdxj_scan_pattern(&self) -> String {
        self.rec_cdxj.glob()
    }

    /// Recover the recording a scanned index-fragment key belongs to.
    pub fn parse_cdxj_key(&self, key: &str) -> Option<RecordingRef> {
        let mut fields = self.rec_cdxj.parse(key)?;
        Some(RecordingRef {
            owner: fields.remove("user")?,
            collection: fields.remove("coll")?,
            recording: fields.remove("rec")?,
        })
    }

    pub fn commit_wait(&self, filename: &str) -> String {
        self.commit_wait.render(&[("filename", filename)])
    }

    pub fn storage_profile(&self, name: &str) -> String {
        self.storage_profile.render(&[("name", name)])
    }
}
