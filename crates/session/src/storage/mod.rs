// Key-value persistence layer: the synchronous, origin-scoped storage the
// document store sits on. Backends: in-memory and SQLite.

pub mod memory;
pub mod sqlite;

use thiserror::Error;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage quota of {limit} bytes exceeded")]
    QuotaExceeded { limit: usize },

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Synchronous key-value storage with index-based key enumeration.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `value` under `key`. Fails with `QuotaExceeded` when the write
    /// would push the backend over its capacity.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;

    /// Number of keys currently stored.
    fn len(&self) -> Result<usize, StorageError>;

    /// Key at position `index` in a stable enumeration order.
    fn key_at(&self, index: usize) -> Result<Option<String>, StorageError>;

    /// All keys beginning with `prefix`.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        for index in 0..self.len()? {
            if let Some(key) = self.key_at(index)? {
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }
        Ok(keys)
    }
}

/// Bytes a single entry counts against a quota.
pub(crate) fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}
