//! Cache of filesystem entries consumed by the STATFS/FSSTAT handler.
//!
//! The cache owns its entries in an arena and hands out [`EntryId`]s (slot
//! index plus slot generation) instead of pointers. A caller that acquires an
//! entry holds one reference until it releases it; [`EntryRef`] is the scope
//! guard that pairs every successful acquire with exactly one release.
//!
//! [`CacheStore`] is the seam between the NFS layer and whatever keeps the
//! metadata. [`MemoryCache`] is the in-process implementation shipped with
//! the crate.

use std::fmt;
use std::time::SystemTime;

use async_trait::async_trait;

use crate::protocol::xdr::nfs3;

mod arena;
mod entry;

pub use arena::MemoryCache;
pub use entry::EntryRef;

/// Content address of a cached entry: the file system and the object in it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct EntryKey {
    pub fsid: u64,
    pub fileid: nfs3::fileid3,
}

/// Index of an entry in the cache arena.
///
/// The generation changes every time a slot is reused, so an id kept past
/// eviction never aliases the slot's next occupant.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntryId {
    pub(crate) slot: u32,
    pub(crate) generation: u32,
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.slot, self.generation)
    }
}

/// Space and file-slot usage of a file system, sampled per request.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DynamicFsInfo {
    pub total_bytes: u64,
    pub free_bytes: u64,
    /// Free bytes available to non-privileged users
    pub avail_bytes: u64,
    pub total_files: u64,
    pub free_files: u64,
    /// Free file slots available to non-privileged users
    pub avail_files: u64,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum FileKind {
    #[default]
    Regular,
    Directory,
    BlockDevice,
    CharDevice,
    Symlink,
    Socket,
    Fifo,
}

/// Snapshot of an object's cached metadata.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Attributes {
    pub kind: FileKind,
    /// Permission bits
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    /// Bytes allocated on disk
    pub used: u64,
    /// Device numbers, only meaningful for block and character devices
    pub rdev: (u32, u32),
    pub fsid: u64,
    pub fileid: u64,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
}

impl Default for Attributes {
    fn default() -> Self {
        Attributes {
            kind: FileKind::default(),
            mode: 0,
            nlink: 1,
            uid: 0,
            gid: 0,
            size: 0,
            used: 0,
            rdev: (0, 0),
            fsid: 0,
            fileid: 0,
            atime: SystemTime::UNIX_EPOCH,
            mtime: SystemTime::UNIX_EPOCH,
            ctime: SystemTime::UNIX_EPOCH,
        }
    }
}

impl From<FileKind> for nfs3::ftype3 {
    fn from(kind: FileKind) -> Self {
        match kind {
            FileKind::Regular => nfs3::ftype3::NF3REG,
            FileKind::Directory => nfs3::ftype3::NF3DIR,
            FileKind::BlockDevice => nfs3::ftype3::NF3BLK,
            FileKind::CharDevice => nfs3::ftype3::NF3CHR,
            FileKind::Symlink => nfs3::ftype3::NF3LNK,
            FileKind::Socket => nfs3::ftype3::NF3SOCK,
            FileKind::Fifo => nfs3::ftype3::NF3FIFO,
        }
    }
}

impl From<&Attributes> for nfs3::fattr3 {
    fn from(attr: &Attributes) -> Self {
        nfs3::fattr3 {
            ftype: attr.kind.into(),
            mode: attr.mode,
            nlink: attr.nlink,
            uid: attr.uid,
            gid: attr.gid,
            size: attr.size,
            used: attr.used,
            rdev: nfs3::specdata3 { specdata1: attr.rdev.0, specdata2: attr.rdev.1 },
            fsid: attr.fsid,
            fileid: attr.fileid,
            atime: attr.atime.into(),
            mtime: attr.mtime.into(),
            ctime: attr.ctime.into(),
        }
    }
}

/// Failures reported by a [`CacheStore`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// Nothing is cached under the requested key.
    #[error("entry not cached")]
    NotFound,
    /// The id names a slot that has since been evicted or reused.
    #[error("stale cache entry")]
    Stale,
    /// The backing store could not produce the data.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// The operations the NFS layer needs from the entry cache.
///
/// `acquire` and `release` manage the per-entry reference count and must be
/// cheap and non-blocking: `release` runs from a destructor. `statfs` and
/// `getattr` only read; any I/O they do stays inside the implementation.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Finds the entry cached under `key` and takes one reference to it.
    /// A failed acquire takes no reference.
    fn acquire(&self, key: EntryKey) -> Result<EntryId, StorageError>;

    /// Drops one reference taken by [`acquire`](Self::acquire).
    fn release(&self, id: EntryId);

    /// Returns usage figures of the file system holding the entry.
    async fn statfs(&self, id: EntryId) -> Result<DynamicFsInfo, StorageError>;

    /// Returns the entry's attributes.
    async fn getattr(&self, id: EntryId) -> Result<Attributes, StorageError>;
}
