use std::fmt;

use tracing::trace;

use super::{Attributes, CacheStore, DynamicFsInfo, EntryId, EntryKey, StorageError};

/// A held reference to a cached entry.
///
/// Created only by a successful [`EntryRef::acquire`]; dropping it releases
/// the reference. Early returns, `?`, panics and cancelled futures all run
/// the release exactly once.
pub struct EntryRef<'a> {
    store: &'a dyn CacheStore,
    id: EntryId,
}

impl<'a> EntryRef<'a> {
    pub fn acquire(store: &'a dyn CacheStore, key: EntryKey) -> Result<Self, StorageError> {
        let id = store.acquire(key)?;
        trace!("acquired cache entry {} for {:?}", id, key);
        Ok(EntryRef { store, id })
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub async fn statfs(&self) -> Result<DynamicFsInfo, StorageError> {
        self.store.statfs(self.id).await
    }

    pub async fn getattr(&self) -> Result<Attributes, StorageError> {
        self.store.getattr(self.id).await
    }
}

impl Drop for EntryRef<'_> {
    fn drop(&mut self) {
        trace!("releasing cache entry {}", self.id);
        self.store.release(self.id);
    }
}

impl fmt::Debug for EntryRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryRef").field("id", &self.id).finish()
    }
}
