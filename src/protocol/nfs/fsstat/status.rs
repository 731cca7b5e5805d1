//! Failure reasons and their wire status codes.

use crate::protocol::xdr::nfs2::{nfsstat2, STATFS2res};
use crate::protocol::xdr::nfs3::fs::FSSTAT3res;
use crate::protocol::xdr::nfs3::nfsstat3;

use super::{FsstatReply, NfsVersion};

/// Every way a STATFS/FSSTAT request can fail after its arguments decoded.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum FailureReason {
    /// The handle is malformed or was never issued by this server.
    #[error("invalid file handle")]
    InvalidHandle,
    /// The handle was valid once but its object is gone.
    #[error("stale file handle")]
    StaleHandle,
    /// The usage figures could not be read.
    #[error("file system usage unavailable")]
    StorageUnavailable,
    /// The object's attributes could not be read.
    #[error("attributes unavailable")]
    AttributeUnavailable,
}

impl FailureReason {
    pub const ALL: [FailureReason; 4] = [
        FailureReason::InvalidHandle,
        FailureReason::StaleHandle,
        FailureReason::StorageUnavailable,
        FailureReason::AttributeUnavailable,
    ];
}

/// The status a reason is reported with in each protocol version.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StatusPair {
    pub v2: nfsstat2,
    pub v3: nfsstat3,
}

/// Version 2 has no bad-handle status, so invalid handles are reported stale there.
pub fn map_status(reason: FailureReason) -> StatusPair {
    let (v2, v3) = match reason {
        FailureReason::InvalidHandle => (nfsstat2::NFSERR_STALE, nfsstat3::NFS3ERR_BADHANDLE),
        FailureReason::StaleHandle => (nfsstat2::NFSERR_STALE, nfsstat3::NFS3ERR_STALE),
        FailureReason::StorageUnavailable => (nfsstat2::NFSERR_IO, nfsstat3::NFS3ERR_IO),
        FailureReason::AttributeUnavailable => (nfsstat2::NFSERR_IO, nfsstat3::NFS3ERR_IO),
    };
    StatusPair { v2, v3 }
}

/// Builds the failure reply of `version`. Version 3 failures carry no attributes.
pub fn failed_reply(version: NfsVersion, reason: FailureReason) -> FsstatReply {
    let status = map_status(reason);
    match version {
        NfsVersion::V2 => FsstatReply::V2(STATFS2res::error(status.v2)),
        NfsVersion::V3 => FsstatReply::V3(FSSTAT3res::failed(status.v3)),
    }
}
