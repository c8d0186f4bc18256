// Cross-navigation handoff: one well-known key naming the record to open on
// the next session start. Read once, then removed.

use tracing::debug;

use crate::storage::{KeyValueStore, StorageError};

/// Lives outside any record namespace so listings never see it.
pub const HANDOFF_KEY: &str = "boardpad:open-next";

/// Ask the next session start to open `id`.
pub fn request_open<S: KeyValueStore + ?Sized>(
    storage: &mut S,
    id: &str,
) -> Result<(), StorageError> {
    storage.set(HANDOFF_KEY, id)?;
    debug!(id, "queued document for next session start");
    Ok(())
}

/// Consume the pending handoff. The key is removed whether or not a value
/// was present, and whether or not the caller can open it.
pub fn take_pending_open<S: KeyValueStore + ?Sized>(
    storage: &mut S,
) -> Result<Option<String>, StorageError> {
    let pending = storage.get(HANDOFF_KEY)?;
    storage.remove(HANDOFF_KEY)?;
    Ok(pending.filter(|id| !id.trim().is_empty()))
}
