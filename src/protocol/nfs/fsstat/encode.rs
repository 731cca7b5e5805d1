//! Success encoders for both protocol versions.

use tracing::trace;

use crate::cache::{Attributes, DynamicFsInfo};
use crate::config::FsstatConfig;
use crate::protocol::xdr::nfs2::{statfsokres, STATFS2res};
use crate::protocol::xdr::nfs3::fs::{FSSTAT3res, FSSTAT3resok};
use crate::protocol::xdr::nfs3::post_op_attr;

use super::{FsstatReply, NfsVersion, Statistics};

/// Whole blocks of `block_size` in `bytes`, clamped to what 32 bits can carry.
fn blocks(bytes: u64, block_size: u32) -> u32 {
    u32::try_from(bytes / u64::from(block_size.max(1))).unwrap_or(u32::MAX)
}

/// Version 2 reports space in blocks and has no file-slot figures.
pub fn encode_v2(info: &DynamicFsInfo, config: &FsstatConfig) -> statfsokres {
    let bsize = config.block_size();
    let res = statfsokres {
        tsize: config.max_transfer_size(),
        bsize,
        blocks: blocks(info.total_bytes, bsize),
        bfree: blocks(info.free_bytes, bsize),
        bavail: blocks(info.avail_bytes, bsize),
    };
    trace!(
        "statfs: bytes total={} free={} avail={} -> blocks={} bfree={} bavail={}",
        info.total_bytes,
        info.free_bytes,
        info.avail_bytes,
        res.blocks,
        res.bfree,
        res.bavail
    );
    res
}

/// Version 3 passes byte and file counts through unchanged.
pub fn encode_v3(info: &DynamicFsInfo, attributes: Option<&Attributes>) -> FSSTAT3resok {
    let obj_attributes = match attributes {
        Some(attr) => post_op_attr::attributes(attr.into()),
        None => post_op_attr::Void,
    };
    trace!(
        "fsstat: tbytes={} fbytes={} abytes={} tfiles={} ffiles={} afiles={}",
        info.total_bytes,
        info.free_bytes,
        info.avail_bytes,
        info.total_files,
        info.free_files,
        info.avail_files
    );
    FSSTAT3resok {
        obj_attributes,
        tbytes: info.total_bytes,
        fbytes: info.free_bytes,
        abytes: info.avail_bytes,
        tfiles: info.total_files,
        ffiles: info.free_files,
        afiles: info.avail_files,
        invarsec: 0,
    }
}

pub fn encode_reply(
    version: NfsVersion,
    stats: &Statistics,
    config: &FsstatConfig,
) -> FsstatReply {
    match version {
        NfsVersion::V2 => FsstatReply::V2(STATFS2res::info(encode_v2(&stats.info, config))),
        NfsVersion::V3 => FsstatReply::V3(FSSTAT3res::resok(encode_v3(
            &stats.info,
            stats.attributes.as_ref(),
        ))),
    }
}
