//! XDR data types for NFS version 2 (RFC 1094) used by the STATFS procedure.
//!
//! Version 2 is the legacy generation of the protocol: file handles are a
//! fixed 32-byte opaque, sizes are 32-bit and file system usage is reported
//! in blocks rather than bytes.

// Type names follow the RFC
#![allow(non_camel_case_types)]

use std::io::{Read, Write};

use num_derive::{FromPrimitive, ToPrimitive};

use crate::{DeserializeEnum, DeserializeStruct, SerializeEnum, SerializeStruct};

use super::{deserialize, Deserialize, Serialize};

/// The RPC program number shared by every NFS version.
pub const PROGRAM: u32 = 100003;
/// The version number for NFS version 2 protocol.
pub const VERSION: u32 = 2;

/// The size in bytes of the opaque file handle.
pub const NFS_FHSIZE: usize = 32;

/// The maximum number of bytes of data in a READ or WRITE request.
/// Reported to clients as the optimum transfer size of STATFS.
pub const NFS_MAXDATA: u32 = 8192;

/// Procedure numbers for NFS version 2 protocol.
#[allow(clippy::upper_case_acronyms)]
#[derive(Copy, Clone, Debug, FromPrimitive, ToPrimitive)]
pub enum NFSProgram {
    NFSPROC_NULL = 0,
    NFSPROC_GETATTR = 1,
    NFSPROC_SETATTR = 2,
    /// Obsolete in RFC 1094
    NFSPROC_ROOT = 3,
    NFSPROC_LOOKUP = 4,
    NFSPROC_READLINK = 5,
    NFSPROC_READ = 6,
    /// Reserved for a future write cache
    NFSPROC_WRITECACHE = 7,
    NFSPROC_WRITE = 8,
    NFSPROC_CREATE = 9,
    NFSPROC_REMOVE = 10,
    NFSPROC_RENAME = 11,
    NFSPROC_LINK = 12,
    NFSPROC_SYMLINK = 13,
    NFSPROC_MKDIR = 14,
    NFSPROC_RMDIR = 15,
    NFSPROC_READDIR = 16,
    /// Get file system attributes
    NFSPROC_STATFS = 17,
    /// Invalid procedure
    INVALID = 18,
}

/// Status codes returned by NFS version 2 procedures (RFC 1094 section 2.3.1).
///
/// Version 2 has no dedicated "bad handle" status; malformed handles are
/// reported as `NFSERR_STALE`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum nfsstat2 {
    NFS_OK = 0,
    NFSERR_PERM = 1,
    NFSERR_NOENT = 2,
    NFSERR_IO = 5,
    NFSERR_NXIO = 6,
    NFSERR_ACCES = 13,
    NFSERR_EXIST = 17,
    NFSERR_NODEV = 19,
    NFSERR_NOTDIR = 20,
    NFSERR_ISDIR = 21,
    NFSERR_FBIG = 27,
    NFSERR_NOSPC = 28,
    NFSERR_ROFS = 30,
    NFSERR_NAMETOOLONG = 63,
    NFSERR_NOTEMPTY = 66,
    NFSERR_DQUOT = 69,
    /// The file referred to by the handle no longer exists
    NFSERR_STALE = 70,
    /// The server's write cache was flushed to disk
    NFSERR_WFLUSH = 99,
}
SerializeEnum!(nfsstat2);
DeserializeEnum!(nfsstat2);

impl Default for nfsstat2 {
    fn default() -> Self {
        nfsstat2::NFS_OK
    }
}

/// The NFS version 2 file handle: a fixed 32-byte opaque.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct fhandle {
    pub data: [u8; NFS_FHSIZE],
}
DeserializeStruct!(fhandle, data);
SerializeStruct!(fhandle, data);

/// File system usage returned by a successful STATFS.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct statfsokres {
    /// Optimum transfer size of the server in bytes
    pub tsize: u32,
    /// Block size of the file system in bytes
    pub bsize: u32,
    /// Total number of `bsize` blocks
    pub blocks: u32,
    /// Number of free blocks
    pub bfree: u32,
    /// Number of blocks available to non-privileged users
    pub bavail: u32,
}
DeserializeStruct!(statfsokres, tsize, bsize, blocks, bfree, bavail);
SerializeStruct!(statfsokres, tsize, bsize, blocks, bfree, bavail);

/// `union statfsres switch (stat status)`: usage on `NFS_OK`, nothing otherwise.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum STATFS2res {
    info(statfsokres),
    error(nfsstat2),
}

impl STATFS2res {
    pub fn status(&self) -> nfsstat2 {
        match self {
            STATFS2res::info(_) => nfsstat2::NFS_OK,
            STATFS2res::error(stat) => *stat,
        }
    }
}

impl Default for STATFS2res {
    fn default() -> Self {
        STATFS2res::error(nfsstat2::NFSERR_IO)
    }
}

impl Serialize for STATFS2res {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.status().serialize(dest)?;
        if let STATFS2res::info(info) = self {
            info.serialize(dest)?;
        }
        Ok(())
    }
}

impl Deserialize for STATFS2res {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = match deserialize::<nfsstat2>(src)? {
            nfsstat2::NFS_OK => STATFS2res::info(deserialize(src)?),
            stat => STATFS2res::error(stat),
        };
        Ok(())
    }
}
