use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{Attributes, CacheStore, DynamicFsInfo, EntryId, EntryKey, StorageError};

struct CachedEntry {
    key: EntryKey,
    attributes: Attributes,
    refcount: AtomicU32,
}

#[derive(Default)]
struct Slot {
    generation: u32,
    entry: Option<CachedEntry>,
}

#[derive(Default)]
struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    index: HashMap<EntryKey, EntryId>,
    fs_info: HashMap<u64, DynamicFsInfo>,
}

impl Arena {
    fn entry(&self, id: EntryId) -> Result<&CachedEntry, StorageError> {
        self.slots
            .get(id.slot as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
            .ok_or(StorageError::Stale)
    }

    fn dynamic_info(&self, id: EntryId) -> Result<DynamicFsInfo, StorageError> {
        let fsid = self.entry(id)?.key.fsid;
        self.fs_info.get(&fsid).copied().ok_or_else(|| {
            StorageError::Unavailable(format!("no usage figures for file system {fsid}"))
        })
    }

    fn allocate(&mut self, entry: CachedEntry) -> EntryId {
        match self.free.pop() {
            Some(slot) => {
                let reused = &mut self.slots[slot as usize];
                reused.entry = Some(entry);
                EntryId { slot, generation: reused.generation }
            }
            None => {
                let slot = self.slots.len() as u32;
                self.slots.push(Slot { generation: 0, entry: Some(entry) });
                EntryId { slot, generation: 0 }
            }
        }
    }
}

/// In-process [`CacheStore`] keeping entries in an arena indexed by [`EntryKey`].
///
/// Usage figures are kept per file system and shared by every entry with
/// the same `fsid`. Entries can only be evicted while nobody references them.
#[derive(Default)]
pub struct MemoryCache {
    arena: RwLock<Arena>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Arena> {
        self.arena.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Arena> {
        self.arena.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Caches `attributes` under `key`, replacing the attributes of an
    /// existing entry in place.
    pub fn insert(&self, key: EntryKey, attributes: Attributes) -> EntryId {
        let mut arena = self.write();
        let existing = arena.index.get(&key).copied();
        if let Some(id) = existing {
            if let Some(entry) = arena.slots[id.slot as usize].entry.as_mut() {
                entry.attributes = attributes;
                return id;
            }
        }
        let id = arena.allocate(CachedEntry { key, attributes, refcount: AtomicU32::new(0) });
        arena.index.insert(key, id);
        debug!("cached {:?} as {}", key, id);
        id
    }

    /// Sets the usage figures reported for every entry of file system `fsid`.
    pub fn set_dynamic_info(&self, fsid: u64, info: DynamicFsInfo) {
        self.write().fs_info.insert(fsid, info);
    }

    /// Current number of references held on the entry cached under `key`.
    pub fn refcount(&self, key: EntryKey) -> Option<u32> {
        let arena = self.read();
        let id = arena.index.get(&key)?;
        arena.entry(*id).ok().map(|entry| entry.refcount.load(Ordering::Acquire))
    }

    /// Removes the entry cached under `key` if it is not referenced.
    /// Returns `false` when the entry is missing or still in use.
    pub fn evict(&self, key: EntryKey) -> bool {
        let mut arena = self.write();
        let Some(&id) = arena.index.get(&key) else {
            return false;
        };
        let in_use = arena.entry(id).map_or(true, |e| e.refcount.load(Ordering::Acquire) > 0);
        if in_use {
            return false;
        }
        let slot = &mut arena.slots[id.slot as usize];
        slot.entry = None;
        slot.generation = slot.generation.wrapping_add(1);
        arena.free.push(id.slot);
        arena.index.remove(&key);
        debug!("evicted {:?} from {}", key, id);
        true
    }

    pub fn len(&self) -> usize {
        self.read().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    fn acquire(&self, key: EntryKey) -> Result<EntryId, StorageError> {
        let arena = self.read();
        let id = *arena.index.get(&key).ok_or(StorageError::NotFound)?;
        arena.entry(id)?.refcount.fetch_add(1, Ordering::AcqRel);
        Ok(id)
    }

    fn release(&self, id: EntryId) {
        let arena = self.read();
        let released = arena.entry(id).map(|entry| {
            entry.refcount.fetch_update(Ordering::AcqRel, Ordering::Acquire, |rc| rc.checked_sub(1))
        });
        match released {
            Ok(Ok(_)) => {}
            Ok(Err(_)) => warn!("release of unreferenced cache entry {}", id),
            Err(err) => warn!("release of cache entry {}: {}", id, err),
        }
    }

    // The read guard is not `Send`: it must never be held across an await.
    async fn statfs(&self, id: EntryId) -> Result<DynamicFsInfo, StorageError> {
        let arena = self.read();
        arena.dynamic_info(id)
    }

    async fn getattr(&self, id: EntryId) -> Result<Attributes, StorageError> {
        let arena = self.read();
        arena.entry(id).map(|entry| entry.attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: EntryKey = EntryKey { fsid: 1, fileid: 10 };

    fn attrs(fileid: u64) -> Attributes {
        Attributes { fsid: 1, fileid, ..Attributes::default() }
    }

    #[test]
    fn acquire_and_release_track_references() {
        let cache = MemoryCache::new();
        cache.insert(KEY, attrs(10));
        assert_eq!(cache.refcount(KEY), Some(0));

        let first = cache.acquire(KEY).unwrap();
        let second = cache.acquire(KEY).unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.refcount(KEY), Some(2));

        cache.release(first);
        cache.release(second);
        assert_eq!(cache.refcount(KEY), Some(0));
    }

    #[test]
    fn acquire_of_unknown_key_takes_no_reference() {
        let cache = MemoryCache::new();
        assert_eq!(cache.acquire(KEY), Err(StorageError::NotFound));
        assert_eq!(cache.refcount(KEY), None);
    }

    #[test]
    fn release_never_underflows() {
        let cache = MemoryCache::new();
        let id = cache.insert(KEY, attrs(10));
        cache.release(id);
        assert_eq!(cache.refcount(KEY), Some(0));
    }

    #[test]
    fn insert_same_key_updates_in_place() {
        let cache = MemoryCache::new();
        let id = cache.insert(KEY, attrs(10));
        let held = cache.acquire(KEY).unwrap();
        let again = cache.insert(KEY, Attributes { size: 99, ..attrs(10) });
        assert_eq!(id, again);
        assert_eq!(cache.refcount(KEY), Some(1));
        assert_eq!(cache.len(), 1);
        cache.release(held);
    }

    #[test]
    fn evict_refuses_referenced_entries() {
        let cache = MemoryCache::new();
        cache.insert(KEY, attrs(10));
        let id = cache.acquire(KEY).unwrap();
        assert!(!cache.evict(KEY));
        cache.release(id);
        assert!(cache.evict(KEY));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn reused_slot_makes_old_ids_stale() {
        let cache = MemoryCache::new();
        let old = cache.insert(KEY, attrs(10));
        assert!(cache.evict(KEY));

        let other = EntryKey { fsid: 1, fileid: 11 };
        let new = cache.insert(other, attrs(11));
        assert_eq!(old.slot, new.slot);
        assert_ne!(old.generation, new.generation);

        assert_eq!(cache.getattr(old).await, Err(StorageError::Stale));
        assert_eq!(cache.getattr(new).await.unwrap().fileid, 11);
    }

    #[tokio::test]
    async fn statfs_reports_figures_of_the_entry_file_system() {
        let cache = MemoryCache::new();
        let id = cache.insert(KEY, attrs(10));
        assert!(matches!(cache.statfs(id).await, Err(StorageError::Unavailable(_))));

        let info = DynamicFsInfo { total_bytes: 4096, free_bytes: 1024, ..Default::default() };
        cache.set_dynamic_info(1, info);
        assert_eq!(cache.statfs(id).await, Ok(info));
    }
}
