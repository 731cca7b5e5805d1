//! Server-side tunables of the STATFS/FSSTAT handler.

use anyhow::bail;

use crate::protocol::xdr::nfs2;

/// Block size, in bytes, that version 2 replies count space in.
pub const DEV_BSIZE: u32 = 512;

/// Parameters of the version 2 reply. Version 3 reports raw byte counts and
/// needs no configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FsstatConfig {
    block_size: u32,
    max_transfer_size: u32,
}

impl Default for FsstatConfig {
    fn default() -> Self {
        Self { block_size: DEV_BSIZE, max_transfer_size: nfs2::NFS_MAXDATA }
    }
}

impl FsstatConfig {
    /// Fails if `block_size` is zero.
    pub fn new(block_size: u32, max_transfer_size: u32) -> anyhow::Result<Self> {
        if block_size == 0 {
            bail!("block size must be non-zero");
        }
        Ok(Self { block_size, max_transfer_size })
    }

    /// Reported as `bsize`; byte counts are divided by it.
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Reported as `tsize`.
    pub fn max_transfer_size(&self) -> u32 {
        self.max_transfer_size
    }
}
