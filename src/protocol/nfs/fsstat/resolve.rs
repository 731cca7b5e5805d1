//! File handle resolution: from the opaque wire handle to a held cache entry.
//!
//! Handles minted by [`FhResolver`] carry three little-endian 64-bit words:
//!  - the server generation, so handles from an earlier server instance
//!    are recognised as stale
//!  - the file system id
//!  - the file id
//!
//! Version 3 handles are exactly these 24 bytes. Version 2 handles are a
//! fixed 32-byte opaque, so the same 24 bytes are followed by zero padding.

use std::cmp::Ordering;

use byteorder::{ByteOrder, LittleEndian};
use tracing::debug;

use crate::cache::{CacheStore, EntryKey, EntryRef, StorageError};
use crate::protocol::xdr::{nfs2, nfs3};

use super::FailureReason;

/// Length of the meaningful part of a handle minted by [`FhResolver`].
pub const HANDLE_LEN: usize = 24;

/// Protocol generation of a request.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NfsVersion {
    /// NFS version 2, the legacy generation (RFC 1094)
    V2,
    /// NFS version 3, the current generation (RFC 1813)
    V3,
}

impl NfsVersion {
    pub fn from_number(vers: u32) -> Option<Self> {
        match vers {
            nfs2::VERSION => Some(NfsVersion::V2),
            nfs3::VERSION => Some(NfsVersion::V3),
            _ => None,
        }
    }

    pub fn number(self) -> u32 {
        match self {
            NfsVersion::V2 => nfs2::VERSION,
            NfsVersion::V3 => nfs3::VERSION,
        }
    }
}

/// A file handle in the wire format of its protocol version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileHandle {
    V2(nfs2::fhandle),
    V3(nfs3::nfs_fh3),
}

impl FileHandle {
    pub fn version(&self) -> NfsVersion {
        match self {
            FileHandle::V2(_) => NfsVersion::V2,
            FileHandle::V3(_) => NfsVersion::V3,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FileHandle::V2(fh) => &fh.data,
            FileHandle::V3(fh) => &fh.data,
        }
    }
}

/// Why a handle did not produce a cache reference.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResolveError {
    /// Answer the request with the status mapped from the reason.
    Failed(FailureReason),
    /// Send no reply at all; the client will retransmit.
    Drop,
}

impl From<FailureReason> for ResolveError {
    fn from(reason: FailureReason) -> Self {
        ResolveError::Failed(reason)
    }
}

/// Turns a wire handle into a held reference on a cached entry.
///
/// On failure no reference may be left behind.
pub trait HandleResolver: Send + Sync {
    fn resolve<'a>(
        &self,
        handle: &FileHandle,
        cache: &'a dyn CacheStore,
    ) -> Result<EntryRef<'a>, ResolveError>;
}

/// The default resolver for handles in the layout described at module level.
#[derive(Copy, Clone, Debug)]
pub struct FhResolver {
    generation: u64,
}

impl FhResolver {
    pub fn new(generation: u64) -> Self {
        Self { generation }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Mints the handle naming `key` for clients of protocol `version`.
    pub fn handle_for(&self, version: NfsVersion, key: EntryKey) -> FileHandle {
        let mut data = [0_u8; HANDLE_LEN];
        LittleEndian::write_u64(&mut data[0..8], self.generation);
        LittleEndian::write_u64(&mut data[8..16], key.fsid);
        LittleEndian::write_u64(&mut data[16..24], key.fileid);
        match version {
            NfsVersion::V2 => {
                let mut fh = nfs2::fhandle::default();
                fh.data[..HANDLE_LEN].copy_from_slice(&data);
                FileHandle::V2(fh)
            }
            NfsVersion::V3 => FileHandle::V3(nfs3::nfs_fh3 { data: data.to_vec() }),
        }
    }

    /// Checks the layout and generation of `handle` and extracts the key.
    pub fn decode(&self, handle: &FileHandle) -> Result<EntryKey, FailureReason> {
        let data = match handle {
            FileHandle::V2(fh) => {
                if fh.data[HANDLE_LEN..].iter().any(|&b| b != 0) {
                    return Err(FailureReason::InvalidHandle);
                }
                &fh.data[..HANDLE_LEN]
            }
            FileHandle::V3(fh) => {
                if fh.data.len() != HANDLE_LEN {
                    return Err(FailureReason::InvalidHandle);
                }
                &fh.data[..]
            }
        };
        let gen = LittleEndian::read_u64(&data[0..8]);
        match gen.cmp(&self.generation) {
            Ordering::Less => Err(FailureReason::StaleHandle),
            Ordering::Greater => Err(FailureReason::InvalidHandle),
            Ordering::Equal => Ok(EntryKey {
                fsid: LittleEndian::read_u64(&data[8..16]),
                fileid: LittleEndian::read_u64(&data[16..24]),
            }),
        }
    }
}

impl HandleResolver for FhResolver {
    fn resolve<'a>(
        &self,
        handle: &FileHandle,
        cache: &'a dyn CacheStore,
    ) -> Result<EntryRef<'a>, ResolveError> {
        let key = self.decode(handle).inspect_err(|reason| {
            debug!("cannot decode {:?}: {}", handle, reason);
        })?;
        EntryRef::acquire(cache, key).map_err(|err| {
            debug!("cannot acquire {:?}: {}", key, err);
            match err {
                StorageError::NotFound | StorageError::Stale => {
                    ResolveError::Failed(FailureReason::StaleHandle)
                }
                StorageError::Unavailable(_) => {
                    ResolveError::Failed(FailureReason::StorageUnavailable)
                }
            }
        })
    }
}
