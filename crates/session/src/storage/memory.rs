// In-memory storage. Clones share the same entries, like two handles on one
// origin's storage area.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{entry_size, KeyValueStore, StorageError};

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<String, String>,
    quota_bytes: Option<usize>,
    used_bytes: usize,
    writes: usize,
    fail_writes: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects writes once keys + values exceed `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        let storage = Self::default();
        storage.lock().quota_bytes = Some(bytes);
        storage
    }

    /// Number of successful `set` calls since creation.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    /// Bytes currently counted against the quota.
    pub fn used_bytes(&self) -> usize {
        self.lock().used_bytes
    }

    /// Make every subsequent `set` fail with a backend error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut inner = self.lock();
        if inner.fail_writes {
            return Err(StorageError::Backend("write rejected".into()));
        }

        let previous = inner.entries.get(key).map(|old| entry_size(key, old)).unwrap_or(0);
        let next_used = inner.used_bytes - previous + entry_size(key, value);
        if let Some(limit) = inner.quota_bytes {
            if next_used > limit {
                return Err(StorageError::QuotaExceeded { limit });
            }
        }

        inner.entries.insert(key.to_string(), value.to_string());
        inner.used_bytes = next_used;
        inner.writes += 1;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let mut inner = self.lock();
        if let Some(old) = inner.entries.remove(key) {
            inner.used_bytes -= entry_size(key, &old);
        }
        Ok(())
    }

    fn len(&self) -> Result<usize, StorageError> {
        Ok(self.lock().entries.len())
    }

    fn key_at(&self, index: usize) -> Result<Option<String>, StorageError> {
        Ok(self.lock().entries.keys().nth(index).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let mut storage = MemoryStorage::new();
        storage.set("a", "1").unwrap();
        assert_eq!(storage.get("a").unwrap().as_deref(), Some("1"));

        storage.remove("a").unwrap();
        assert!(storage.get("a").unwrap().is_none());
        storage.remove("a").expect("removing an absent key is fine");
    }

    #[test]
    fn clones_share_entries() {
        let mut a = MemoryStorage::new();
        let b = a.clone();
        a.set("k", "v").unwrap();
        assert_eq!(b.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn enumeration_is_sorted_by_key() {
        let mut storage = MemoryStorage::new();
        storage.set("b", "").unwrap();
        storage.set("a", "").unwrap();

        assert_eq!(storage.len().unwrap(), 2);
        assert_eq!(storage.key_at(0).unwrap().as_deref(), Some("a"));
        assert_eq!(storage.key_at(1).unwrap().as_deref(), Some("b"));
        assert!(storage.key_at(2).unwrap().is_none());
    }

    #[test]
    fn keys_with_prefix_filters() {
        let mut storage = MemoryStorage::new();
        storage.set("ns1:a", "").unwrap();
        storage.set("ns2:b", "").unwrap();
        storage.set("ns1:c", "").unwrap();

        assert_eq!(storage.keys_with_prefix("ns1:").unwrap(), vec!["ns1:a", "ns1:c"]);
    }

    #[test]
    fn quota_rejects_oversized_write_and_keeps_old_value() {
        let mut storage = MemoryStorage::with_quota(10);
        storage.set("k", "12345").unwrap();

        let err = storage.set("k", "1234567890").unwrap_err();
        assert_eq!(err, StorageError::QuotaExceeded { limit: 10 });
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("12345"));
        assert_eq!(storage.used_bytes(), 6);
    }

    #[test]
    fn overwrite_accounts_for_replaced_value() {
        let mut storage = MemoryStorage::with_quota(10);
        storage.set("k", "123456789").unwrap();
        storage.set("k", "987654321").expect("same-size overwrite fits");
        storage.remove("k").unwrap();
        assert_eq!(storage.used_bytes(), 0);
    }

    #[test]
    fn write_count_tracks_successful_sets() {
        let mut storage = MemoryStorage::new();
        storage.set("a", "1").unwrap();
        storage.set_fail_writes(true);
        assert!(matches!(storage.set("b", "2"), Err(StorageError::Backend(_))));
        assert_eq!(storage.write_count(), 1);
    }
}
