// Document store: namespaced record CRUD over a key-value storage backend.
//
// Every record lives under `prefix + id`. Enumeration (list, clear_all)
// only ever touches keys that start with this store's prefix.

pub mod clock;
pub mod handoff;

use std::sync::Arc;

use boardpad_common::download::{download_filename, DEFAULT_EXTENSION};
use boardpad_common::types::{FilePatch, FileRecord, FileSummary, Metadata};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::host::DownloadSink;
use crate::storage::{KeyValueStore, StorageError};

pub use clock::{Clock, ManualClock, SystemClock};

/// Default key prefix for document records.
pub const DEFAULT_PREFIX: &str = "boardpad:file:";
/// Default ceiling on a single document's content.
pub const DEFAULT_MAX_CONTENT_BYTES: usize = 1024 * 1024;
/// Default ceiling on the number of records in one namespace.
pub const DEFAULT_MAX_RECORDS: usize = 500;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("no document with id `{0}`")]
    NotFound(String),

    #[error("document `{id}` is corrupted: {reason}")]
    CorruptedRecord { id: String, reason: String },

    #[error("storage quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("failed to write document: {0}")]
    StorageWrite(String),

    #[error("failed to read storage: {0}")]
    StorageRead(String),

    #[error("failed to offer download: {0}")]
    Export(String),
}

impl StoreError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::CorruptedRecord { .. } => "CORRUPTED_RECORD",
            Self::QuotaExceeded(_) => "QUOTA_EXCEEDED",
            Self::StorageWrite(_) => "STORAGE_WRITE_ERROR",
            Self::StorageRead(_) => "STORAGE_READ_ERROR",
            Self::Export(_) => "EXPORT_FAILED",
        }
    }

    fn from_write(error: StorageError) -> Self {
        match error {
            StorageError::QuotaExceeded { limit } => {
                Self::QuotaExceeded(format!("storage is limited to {limit} bytes"))
            }
            StorageError::Backend(reason) => Self::StorageWrite(reason),
        }
    }

    fn from_read(error: StorageError) -> Self {
        Self::StorageRead(error.to_string())
    }
}

/// Explicit bounds enforced before anything reaches the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreLimits {
    pub max_content_bytes: Option<usize>,
    pub max_records: Option<usize>,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            max_content_bytes: Some(DEFAULT_MAX_CONTENT_BYTES),
            max_records: Some(DEFAULT_MAX_RECORDS),
        }
    }
}

impl StoreLimits {
    pub fn unlimited() -> Self {
        Self { max_content_bytes: None, max_records: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    pub prefix: String,
    pub limits: StoreLimits,
    /// Extension appended to export filenames that have none.
    pub default_extension: String,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            limits: StoreLimits::default(),
            default_extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

impl StoreOptions {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), ..Self::default() }
    }
}

pub struct DocumentStore<S> {
    storage: S,
    options: StoreOptions,
    clock: Arc<dyn Clock>,
}

impl<S: KeyValueStore> DocumentStore<S> {
    pub fn new(storage: S, options: StoreOptions) -> Self {
        Self::with_clock(storage, options, Arc::new(SystemClock))
    }

    pub fn with_clock(storage: S, options: StoreOptions, clock: Arc<dyn Clock>) -> Self {
        Self { storage, options, clock }
    }

    pub fn prefix(&self) -> &str {
        &self.options.prefix
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Create a record and return its new id.
    pub fn create(
        &mut self,
        name: &str,
        content: &str,
        board_version: Option<&str>,
    ) -> Result<String, StoreError> {
        validate_name(name)?;
        self.check_content(content)?;
        if let Some(max) = self.options.limits.max_records {
            let count = self.record_keys()?.len();
            if count >= max {
                return Err(StoreError::QuotaExceeded(format!(
                    "namespace already holds {count} of {max} documents"
                )));
            }
        }

        let now = self.clock.now_millis();
        let record = FileRecord {
            id: generate_id(now),
            name: name.to_string(),
            content: content.to_string(),
            board_version: board_version.map(str::to_string),
            metadata: Metadata::new(now),
        };
        self.write(&record)?;

        info!(id = %record.id, name, "created document");
        Ok(record.id)
    }

    /// Apply a partial update. Only fields present in `patch` change;
    /// `updatedAt` always moves forward.
    pub fn update(&mut self, id: &str, patch: FilePatch) -> Result<(), StoreError> {
        if let Some(name) = &patch.name {
            validate_name(name)?;
        }
        if let Some(content) = &patch.content {
            self.check_content(content)?;
        }

        let mut record = self.read(id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if patch.is_empty() {
            debug!(id, "empty patch, skipping write");
            return Ok(());
        }

        let FilePatch { content, board_version, name, metadata } = patch;
        if let Some(content) = content {
            record.content = content;
        }
        if let Some(version) = board_version {
            record.board_version = Some(version);
        }
        if let Some(name) = name {
            record.name = name;
        }
        if let Some(metadata) = metadata {
            record.metadata.merge(&metadata);
        }
        let previous = record.metadata.updated_at;
        record.metadata.updated_at = self.clock.now_millis().max(previous + 1);

        self.write(&record)?;
        debug!(id, updated_at = record.metadata.updated_at, "updated document");
        Ok(())
    }

    /// Load a record; `None` when no record exists for `id`.
    pub fn load(&self, id: &str) -> Result<Option<FileRecord>, StoreError> {
        self.read(id)
    }

    /// Remove a record. Removing an absent id is not an error.
    pub fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        self.storage.remove(&self.key(id)).map_err(StoreError::from_write)?;
        debug!(id, "deleted document");
        Ok(())
    }

    /// Summaries of every complete record, newest first. Entries that fail
    /// to decode, miss required fields or carry an id that differs from
    /// their key are skipped.
    pub fn list(&self) -> Result<Vec<FileSummary>, StoreError> {
        let mut summaries = Vec::new();
        for key in self.record_keys()? {
            let Some(raw) = self.storage.get(&key).map_err(StoreError::from_read)? else {
                continue;
            };
            let key_id = key.strip_prefix(self.options.prefix.as_str()).unwrap_or(&key);
            match serde_json::from_str::<FileRecord>(&raw) {
                Ok(record) if record.id != key_id => {
                    warn!(key, id = %record.id, "skipping document with mismatched id");
                }
                Ok(record) if record.name.trim().is_empty() => {
                    warn!(key, "skipping document with empty name");
                }
                Ok(record) => summaries.push(FileSummary::from(record)),
                Err(error) => warn!(key, %error, "skipping undecodable document"),
            }
        }

        summaries.sort_by(|a, b| {
            b.metadata
                .created_at
                .cmp(&a.metadata.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(summaries)
    }

    /// Remove every record under this store's prefix. Returns the count.
    pub fn clear_all(&mut self) -> Result<usize, StoreError> {
        let keys = self.record_keys()?;
        for key in &keys {
            self.storage.remove(key).map_err(StoreError::from_write)?;
        }
        info!(prefix = %self.options.prefix, removed = keys.len(), "cleared documents");
        Ok(keys.len())
    }

    /// Hand a record's content to `sink`. Returns the filename offered.
    pub fn export(&self, id: &str, sink: &mut dyn DownloadSink) -> Result<String, StoreError> {
        let record = self.read(id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let filename = download_filename(&record.name, &self.options.default_extension);
        sink.offer(&filename, &record.content)
            .map_err(|error| StoreError::Export(error.to_string()))?;
        info!(id, filename, "exported document");
        Ok(filename)
    }

    /// Ask the next session start to open `id`.
    pub fn request_open(&mut self, id: &str) -> Result<(), StoreError> {
        handoff::request_open(&mut self.storage, id).map_err(StoreError::from_write)
    }

    /// Consume the pending "open next" handoff, if any.
    pub fn take_pending_open(&mut self) -> Result<Option<String>, StoreError> {
        handoff::take_pending_open(&mut self.storage).map_err(StoreError::from_read)
    }

    fn key(&self, id: &str) -> String {
        format!("{}{}", self.options.prefix, id)
    }

    fn record_keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = self
            .storage
            .keys_with_prefix(&self.options.prefix)
            .map_err(StoreError::from_read)?;
        keys.retain(|key| key != handoff::HANDOFF_KEY);
        Ok(keys)
    }

    fn read(&self, id: &str) -> Result<Option<FileRecord>, StoreError> {
        let Some(raw) = self.storage.get(&self.key(id)).map_err(StoreError::from_read)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw).map(Some).map_err(|error| StoreError::CorruptedRecord {
            id: id.to_string(),
            reason: error.to_string(),
        })
    }

    fn write(&mut self, record: &FileRecord) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(record)
            .map_err(|error| StoreError::StorageWrite(error.to_string()))?;
        self.storage.set(&self.key(&record.id), &encoded).map_err(StoreError::from_write)
    }

    fn check_content(&self, content: &str) -> Result<(), StoreError> {
        match self.options.limits.max_content_bytes {
            Some(max) if content.len() > max => Err(StoreError::QuotaExceeded(format!(
                "document is {} bytes, limit is {max}",
                content.len()
            ))),
            _ => Ok(()),
        }
    }
}

fn validate_name(name: &str) -> Result<(), StoreError> {
    if name.trim().is_empty() {
        return Err(StoreError::InvalidArgument("document name must not be empty".into()));
    }
    Ok(())
}

/// Creation time plus a random suffix; unique within a session, not
/// cryptographically.
fn generate_id(now_ms: i64) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{now_ms}-{}", &suffix[..8])
}
