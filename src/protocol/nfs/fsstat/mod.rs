//! STATFS (NFS version 2, procedure 17, RFC 1094 section 2.2.17) and
//! FSSTAT (NFS version 3, procedure 18, RFC 1813 section 3.3.18).
//!
//! Both procedures take a single file handle and report the usage of the
//! file system holding the named object. One driver serves both versions:
//!
//! 1. the handle is resolved to a held cache reference
//! 2. the usage figures are read, and for version 3 the object's attributes
//! 3. the figures are encoded in the layout of the request's version
//!
//! Any failure short-circuits to a failure reply whose status is taken from
//! [`map_status`]. The cache reference taken in step 1 is released exactly
//! once however the request ends, including when the future is dropped.

use std::io::{Read, Write};

use tracing::{debug, trace, warn};

use crate::protocol::rpc;
use crate::protocol::xdr::{self, deserialize, nfs2, nfs3, Serialize};

mod encode;
mod query;
mod resolve;
mod status;

pub use encode::{encode_reply, encode_v2, encode_v3};
pub use query::{query_statistics, QueryFailure, Statistics};
pub use resolve::{
    FhResolver, FileHandle, HandleResolver, NfsVersion, ResolveError, HANDLE_LEN,
};
pub use status::{failed_reply, map_status, FailureReason, StatusPair};

/// Steps of a request, as reported in traces and failures.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    Start,
    Resolving,
    StatQuerying,
    AttrQuerying,
    Encoding,
    Done,
    Failed,
}

/// The result of a request, in the wire type of its version.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FsstatReply {
    V2(nfs2::STATFS2res),
    V3(nfs3::fs::FSSTAT3res),
}

impl FsstatReply {
    pub fn version(&self) -> NfsVersion {
        match self {
            FsstatReply::V2(_) => NfsVersion::V2,
            FsstatReply::V3(_) => NfsVersion::V3,
        }
    }

    pub fn is_ok(&self) -> bool {
        match self {
            FsstatReply::V2(res) => res.status() == nfs2::nfsstat2::NFS_OK,
            FsstatReply::V3(res) => res.status() == nfs3::nfsstat3::NFS3_OK,
        }
    }
}

impl Serialize for FsstatReply {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            FsstatReply::V2(res) => res.serialize(dest),
            FsstatReply::V3(res) => res.serialize(dest),
        }
    }
}

/// Whether a request is answered.
///
/// `Drop` sends nothing back; the client retransmits. Wire handlers use
/// `Disposition<()>` once the reply has been written.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Disposition<T = FsstatReply> {
    Reply(T),
    Drop,
}

impl<T> Disposition<T> {
    pub fn is_drop(&self) -> bool {
        matches!(self, Disposition::Drop)
    }
}

fn enter(version: NfsVersion, state: State) {
    trace!("fsstat v{}: {:?}", version.number(), state);
}

fn fail(version: NfsVersion, stage: State, reason: FailureReason) -> FsstatReply {
    debug!("fsstat v{}: failed while {:?}: {}", version.number(), stage, reason);
    enter(version, State::Failed);
    failed_reply(version, reason)
}

/// Serves one STATFS or FSSTAT request for `handle`.
///
/// The version of the reply is the version of the handle.
pub async fn fsstat(handle: &FileHandle, context: &rpc::Context) -> Disposition {
    let version = handle.version();
    enter(version, State::Start);

    enter(version, State::Resolving);
    let entry = match context.resolver.resolve(handle, context.cache.as_ref()) {
        Ok(entry) => entry,
        Err(ResolveError::Drop) => {
            debug!("fsstat v{}: dropping request for {:?}", version.number(), handle);
            return Disposition::Drop;
        }
        Err(ResolveError::Failed(reason)) => {
            return Disposition::Reply(fail(version, State::Resolving, reason));
        }
    };

    // Released when `entry` goes out of scope.
    enter(version, State::StatQuerying);
    let reply = match query_statistics(&entry, version).await {
        Ok(stats) => {
            enter(version, State::Encoding);
            let reply = encode_reply(version, &stats, &context.config);
            enter(version, State::Done);
            reply
        }
        Err(failure) => fail(version, failure.stage, failure.reason),
    };
    drop(entry);
    Disposition::Reply(reply)
}

async fn write_reply(
    xid: u32,
    handle: FileHandle,
    output: &mut impl Write,
    context: &rpc::Context,
) -> Result<Disposition<()>, anyhow::Error> {
    match fsstat(&handle, context).await {
        Disposition::Reply(reply) => {
            debug!(" {:?} ---> {:?}", xid, reply);
            xdr::rpc::make_success_reply(xid).serialize(output)?;
            reply.serialize(output)?;
            Ok(Disposition::Reply(()))
        }
        Disposition::Drop => {
            debug!(" {:?} ---> dropped", xid);
            Ok(Disposition::Drop)
        }
    }
}

/// Handles NFSv2 STATFS procedure (procedure 17)
///
/// # Arguments
///
/// * `xid` - RPC transaction ID
/// * `input` - Input stream positioned at the `fhandle` argument
/// * `output` - Output stream for the reply
/// * `context` - Server context holding the cache and resolver
///
/// Undecodable arguments are answered with `GARBAGE_ARGS`. Errors are only
/// returned when the output stream fails.
pub async fn nfsproc2_statfs(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &rpc::Context,
) -> Result<Disposition<()>, anyhow::Error> {
    let handle = match deserialize::<nfs2::fhandle>(input) {
        Ok(handle) => handle,
        Err(err) => {
            warn!("nfsproc2_statfs({:?}): cannot decode arguments: {}", xid, err);
            xdr::rpc::garbage_args_reply_message(xid).serialize(output)?;
            return Ok(Disposition::Reply(()));
        }
    };
    debug!("nfsproc2_statfs({:?},{:?}) ", xid, handle);
    write_reply(xid, FileHandle::V2(handle), output, context).await
}

/// Handles NFSv3 FSSTAT procedure (procedure 18)
///
/// Same contract as [`nfsproc2_statfs`] with an `nfs_fh3` argument. A handle
/// longer than `NFS3_FHSIZE` does not decode and is answered with
/// `GARBAGE_ARGS`.
pub async fn nfsproc3_fsstat(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &rpc::Context,
) -> Result<Disposition<()>, anyhow::Error> {
    let handle = match deserialize::<nfs3::nfs_fh3>(input) {
        Ok(handle) => handle,
        Err(err) => {
            warn!("nfsproc3_fsstat({:?}): cannot decode arguments: {}", xid, err);
            xdr::rpc::garbage_args_reply_message(xid).serialize(output)?;
            return Ok(Disposition::Reply(()));
        }
    };
    debug!("nfsproc3_fsstat({:?},{:?}) ", xid, handle);
    write_reply(xid, FileHandle::V3(handle), output, context).await
}
