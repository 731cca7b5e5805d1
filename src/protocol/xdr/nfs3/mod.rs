//! XDR data types and constants for NFS version 3 (RFC 1813) that the FSSTAT
//! procedure needs: status codes, the file handle, file attributes and the
//! post-operation attribute union.

// Type names follow the RFC
#![allow(non_camel_case_types)]

use std::io::Read;
use std::time::{SystemTime, UNIX_EPOCH};

use num_derive::{FromPrimitive, ToPrimitive};

use crate::{
    DeserializeBoolUnion, DeserializeEnum, DeserializeStruct, SerializeBoolUnion, SerializeEnum,
    SerializeStruct,
};

use super::{deserialize_opaque_max, Deserialize};

pub mod fs;

// Section 2.2 Constants
/// The RPC program number for NFS version 3 service.
pub const PROGRAM: u32 = 100003;
/// The version number for NFS version 3 protocol.
pub const VERSION: u32 = 3;

// Section 2.4 Sizes
/// The maximum size in bytes of the opaque file handle.
pub const NFS3_FHSIZE: u32 = 64;

/// Procedure numbers for NFS version 3 protocol.
#[allow(clippy::upper_case_acronyms)]
#[derive(Copy, Clone, Debug, FromPrimitive, ToPrimitive)]
pub enum NFSProgram {
    NFSPROC3_NULL = 0,
    NFSPROC3_GETATTR = 1,
    NFSPROC3_SETATTR = 2,
    NFSPROC3_LOOKUP = 3,
    NFSPROC3_ACCESS = 4,
    NFSPROC3_READLINK = 5,
    NFSPROC3_READ = 6,
    NFSPROC3_WRITE = 7,
    NFSPROC3_CREATE = 8,
    NFSPROC3_MKDIR = 9,
    NFSPROC3_SYMLINK = 10,
    NFSPROC3_MKNOD = 11,
    NFSPROC3_REMOVE = 12,
    NFSPROC3_RMDIR = 13,
    NFSPROC3_RENAME = 14,
    NFSPROC3_LINK = 15,
    NFSPROC3_READDIR = 16,
    NFSPROC3_READDIRPLUS = 17,
    /// Get file system statistics
    NFSPROC3_FSSTAT = 18,
    NFSPROC3_FSINFO = 19,
    NFSPROC3_PATHCONF = 20,
    NFSPROC3_COMMIT = 21,
    INVALID = 22,
}

/// File identifier, unique within a file system
pub type fileid3 = u64;
/// User ID of a file owner
pub type uid3 = u32;
/// Group ID of a file owner
pub type gid3 = u32;
/// Size in bytes
pub type size3 = u64;
/// File mode bits
pub type mode3 = u32;

/// Status codes returned by NFS version 3 operations
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum nfsstat3 {
    NFS3_OK = 0,
    NFS3ERR_PERM = 1,
    NFS3ERR_NOENT = 2,
    /// A hard error (for example, a disk error) occurred while
    /// processing the requested operation.
    NFS3ERR_IO = 5,
    NFS3ERR_NXIO = 6,
    NFS3ERR_ACCES = 13,
    NFS3ERR_EXIST = 17,
    NFS3ERR_XDEV = 18,
    NFS3ERR_NODEV = 19,
    NFS3ERR_NOTDIR = 20,
    NFS3ERR_ISDIR = 21,
    NFS3ERR_INVAL = 22,
    NFS3ERR_FBIG = 27,
    NFS3ERR_NOSPC = 28,
    NFS3ERR_ROFS = 30,
    NFS3ERR_MLINK = 31,
    NFS3ERR_NAMETOOLONG = 63,
    NFS3ERR_NOTEMPTY = 66,
    NFS3ERR_DQUOT = 69,
    /// The file referred to by the handle no longer exists or access
    /// to it has been revoked.
    NFS3ERR_STALE = 70,
    NFS3ERR_REMOTE = 71,
    /// The file handle failed internal consistency checks.
    NFS3ERR_BADHANDLE = 10001,
    NFS3ERR_NOT_SYNC = 10002,
    NFS3ERR_BAD_COOKIE = 10003,
    NFS3ERR_NOTSUPP = 10004,
    NFS3ERR_TOOSMALL = 10005,
    NFS3ERR_SERVERFAULT = 10006,
    NFS3ERR_BADTYPE = 10007,
    NFS3ERR_JUKEBOX = 10008,
}
SerializeEnum!(nfsstat3);
DeserializeEnum!(nfsstat3);

impl Default for nfsstat3 {
    fn default() -> Self {
        nfsstat3::NFS3_OK
    }
}

/// File type enumeration as defined in RFC 1813 section 2.3.5
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum ftype3 {
    /// Regular File
    #[default]
    NF3REG = 1,
    /// Directory
    NF3DIR = 2,
    /// Block Special Device
    NF3BLK = 3,
    /// Character Special Device
    NF3CHR = 4,
    /// Symbolic Link
    NF3LNK = 5,
    /// Socket
    NF3SOCK = 6,
    /// Named Pipe
    NF3FIFO = 7,
}
SerializeEnum!(ftype3);
DeserializeEnum!(ftype3);

/// Major and minor numbers of a special device
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct specdata3 {
    pub specdata1: u32,
    pub specdata2: u32,
}
DeserializeStruct!(specdata3, specdata1, specdata2);
SerializeStruct!(specdata3, specdata1, specdata2);

/// The NFS version 3 file handle.
/// The server is responsible for the internal format and interpretation of the data.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct nfs_fh3 {
    /// Raw file handle data (up to NFS3_FHSIZE bytes)
    pub data: Vec<u8>,
}
SerializeStruct!(nfs_fh3, data);

impl Deserialize for nfs_fh3 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        deserialize_opaque_max(&mut self.data, NFS3_FHSIZE as usize, src)
    }
}

/// NFS version 3 time: seconds and nanoseconds since the Unix epoch.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct nfstime3 {
    pub seconds: u32,
    pub nseconds: u32,
}
DeserializeStruct!(nfstime3, seconds, nseconds);
SerializeStruct!(nfstime3, seconds, nseconds);

/// Times before the epoch become zero; seconds past 2106 saturate.
impl From<SystemTime> for nfstime3 {
    fn from(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(since_epoch) => nfstime3 {
                seconds: u32::try_from(since_epoch.as_secs()).unwrap_or(u32::MAX),
                nseconds: since_epoch.subsec_nanos(),
            },
            Err(_) => nfstime3::default(),
        }
    }
}

/// File attributes as defined in RFC 1813 section 2.3.5
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct fattr3 {
    pub ftype: ftype3,
    pub mode: mode3,
    pub nlink: u32,
    pub uid: uid3,
    pub gid: gid3,
    /// Size of the file data in bytes
    pub size: size3,
    /// Bytes actually allocated on the server's file system
    pub used: size3,
    pub rdev: specdata3,
    pub fsid: u64,
    pub fileid: fileid3,
    pub atime: nfstime3,
    pub mtime: nfstime3,
    pub ctime: nfstime3,
}
DeserializeStruct!(
    fattr3, ftype, mode, nlink, uid, gid, size, used, rdev, fsid, fileid, atime, mtime, ctime
);
SerializeStruct!(
    fattr3, ftype, mode, nlink, uid, gid, size, used, rdev, fsid, fileid, atime, mtime, ctime
);

/// Post-operation attributes (RFC 1813 section 2.3.8).
/// `Void` encodes `attributes_follow = FALSE`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[repr(u32)]
pub enum post_op_attr {
    #[default]
    /// No attributes available
    Void,
    /// Attributes are available
    attributes(fattr3),
}
DeserializeBoolUnion!(post_op_attr, attributes, fattr3);
SerializeBoolUnion!(post_op_attr, attributes, fattr3);

impl post_op_attr {
    pub fn attributes_follow(&self) -> bool {
        matches!(self, post_op_attr::attributes(_))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn nfstime3_from_system_time() {
        let time = UNIX_EPOCH + Duration::new(1_700_000_000, 250);
        assert_eq!(nfstime3::from(time), nfstime3 { seconds: 1_700_000_000, nseconds: 250 });
    }

    #[test]
    fn nfstime3_clamps_pre_epoch_times() {
        let time = UNIX_EPOCH - Duration::from_secs(10);
        assert_eq!(nfstime3::from(time), nfstime3::default());
    }
}
