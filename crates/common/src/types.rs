// Core domain types shared across all boardpad crates.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata keys owned by the store; never taken from a patch.
pub const RESERVED_METADATA_KEYS: &[&str] = &["createdAt", "updatedAt"];

/// Timestamps and free-form annotations attached to a record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Milliseconds since the Unix epoch; set once at creation.
    pub created_at: i64,
    /// Milliseconds since the Unix epoch; refreshed on every mutation.
    pub updated_at: i64,
    /// Any additional keys merged in through `FilePatch::metadata`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Metadata {
    pub fn new(now_ms: i64) -> Self {
        Self { created_at: now_ms, updated_at: now_ms, extra: Map::new() }
    }

    /// Shallow-merge `patch` into the free-form keys. Reserved timestamp keys
    /// are skipped.
    pub fn merge(&mut self, patch: &Map<String, Value>) {
        for (key, value) in patch {
            if RESERVED_METADATA_KEYS.contains(&key.as_str()) {
                continue;
            }
            self.extra.insert(key.clone(), value.clone());
        }
    }
}

/// A persisted document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    pub content: String,
    /// Rendering-library version the content was authored against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_version: Option<String>,
    pub metadata: Metadata,
}

/// A record without its content, as returned by listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_version: Option<String>,
    pub metadata: Metadata,
}

impl From<FileRecord> for FileSummary {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            board_version: record.board_version,
            metadata: record.metadata,
        }
    }
}

/// Partial update for a record. Only `Some` fields are applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilePatch {
    pub content: Option<String>,
    pub board_version: Option<String>,
    pub name: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

impl FilePatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self { content: Some(content.into()), ..Self::default() }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), ..Self::default() }
    }

    pub fn with_board_version(mut self, version: impl Into<String>) -> Self {
        self.board_version = Some(version.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// True when the patch carries no recognized field.
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.board_version.is_none()
            && self.name.is_none()
            && self.metadata.is_none()
    }
}

/// Content and target version carried by a share link.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SharePayload {
    pub content: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_record() -> FileRecord {
        FileRecord {
            id: "1707314880000-3f9a1c2e".into(),
            name: "orbit.js".into(),
            content: "const board = 1;".into(),
            board_version: Some("0.3.1".into()),
            metadata: Metadata::new(1_707_314_880_000),
        }
    }

    #[test]
    fn record_serializes_with_camel_case_keys() {
        let value = serde_json::to_value(sample_record()).unwrap();
        assert_eq!(value["boardVersion"], "0.3.1");
        assert_eq!(value["metadata"]["createdAt"], 1_707_314_880_000_i64);
        assert_eq!(value["metadata"]["updatedAt"], 1_707_314_880_000_i64);
    }

    #[test]
    fn record_without_version_omits_key() {
        let record = FileRecord { board_version: None, ..sample_record() };
        let value = serde_json::to_value(record).unwrap();
        assert!(value.get("boardVersion").is_none());
    }

    #[test]
    fn record_missing_metadata_fails_to_decode() {
        let raw = json!({ "id": "a", "name": "x", "content": "" });
        assert!(serde_json::from_value::<FileRecord>(raw).is_err());
    }

    #[test]
    fn extra_metadata_keys_survive_decode() {
        let raw = json!({
            "id": "a",
            "name": "x",
            "content": "",
            "metadata": { "createdAt": 1, "updatedAt": 2, "pinned": true }
        });
        let record: FileRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(record.metadata.extra.get("pinned"), Some(&json!(true)));
    }

    #[test]
    fn metadata_merge_skips_reserved_keys() {
        let mut metadata = Metadata::new(10);
        let patch = json!({ "createdAt": 0, "updatedAt": 0, "tag": "demo" });
        metadata.merge(patch.as_object().unwrap());

        assert_eq!(metadata.created_at, 10);
        assert_eq!(metadata.updated_at, 10);
        assert_eq!(metadata.extra.get("tag"), Some(&json!("demo")));
    }

    #[test]
    fn metadata_merge_is_shallow() {
        let mut metadata = Metadata::new(10);
        metadata.merge(json!({ "a": 1, "b": { "c": 1 } }).as_object().unwrap());
        metadata.merge(json!({ "b": { "d": 2 } }).as_object().unwrap());

        assert_eq!(metadata.extra.get("a"), Some(&json!(1)));
        assert_eq!(metadata.extra.get("b"), Some(&json!({ "d": 2 })));
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(FilePatch::default().is_empty());
        assert!(!FilePatch::content("x").is_empty());
        assert!(!FilePatch::default().with_board_version("0.3.1").is_empty());
    }

    #[test]
    fn summary_drops_content() {
        let summary = FileSummary::from(sample_record());
        let value = serde_json::to_value(summary).unwrap();
        assert!(value.get("content").is_none());
        assert_eq!(value["name"], "orbit.js");
    }
}
