//! NFS program dispatch for versions 2 and 3.
//!
//! Only NULL and the file system usage procedure (STATFS in version 2,
//! FSSTAT in version 3) are served. Other procedures are answered with
//! `PROC_UNAVAIL` and other versions with `PROG_MISMATCH`.

use std::io::{Read, Write};

use num_traits::cast::FromPrimitive;
use tracing::{debug, warn};

use crate::protocol::rpc;
use crate::protocol::xdr::{self, nfs2, nfs3, Serialize};

pub mod fsstat;

pub use fsstat::{nfsproc2_statfs, nfsproc3_fsstat, Disposition};

/// NULL does no work; the reply only proves the server is alive.
fn nfsproc_null(xid: u32, output: &mut impl Write) -> Result<(), anyhow::Error> {
    debug!("nfsproc_null({:?}) ", xid);
    let msg = xdr::rpc::make_success_reply(xid);
    debug!("\t{:?} --> {:?}", xid, msg);
    msg.serialize(output)?;
    Ok(())
}

/// Routes an NFS call to its procedure handler.
///
/// # Arguments
///
/// * `xid` - Transaction ID from the RPC call
/// * `call` - The RPC call body containing version and procedure numbers
/// * `input` - Input stream positioned at the procedure arguments
/// * `output` - Output stream for the reply
/// * `context` - Server context
///
/// Returns [`Disposition::Drop`] when nothing was written and the call must
/// go unanswered.
pub async fn handle_nfs(
    xid: u32,
    call: xdr::rpc::call_body,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &rpc::Context,
) -> Result<Disposition<()>, anyhow::Error> {
    match call.vers {
        nfs2::VERSION => {
            let prog = nfs2::NFSProgram::from_u32(call.proc).unwrap_or(nfs2::NFSProgram::INVALID);
            match prog {
                nfs2::NFSProgram::NFSPROC_NULL => nfsproc_null(xid, output)?,
                nfs2::NFSProgram::NFSPROC_STATFS => {
                    return nfsproc2_statfs(xid, input, output, context).await
                }
                _ => {
                    warn!("Unimplemented NFSv2 message {:?}", prog);
                    xdr::rpc::proc_unavail_reply_message(xid).serialize(output)?;
                }
            }
        }
        nfs3::VERSION => {
            let prog = nfs3::NFSProgram::from_u32(call.proc).unwrap_or(nfs3::NFSProgram::INVALID);
            match prog {
                nfs3::NFSProgram::NFSPROC3_NULL => nfsproc_null(xid, output)?,
                nfs3::NFSProgram::NFSPROC3_FSSTAT => {
                    return nfsproc3_fsstat(xid, input, output, context).await
                }
                _ => {
                    warn!("Unimplemented NFSv3 message {:?}", prog);
                    xdr::rpc::proc_unavail_reply_message(xid).serialize(output)?;
                }
            }
        }
        vers => {
            warn!(
                "Invalid NFS Version number {} not in {}..={}",
                vers,
                nfs2::VERSION,
                nfs3::VERSION
            );
            xdr::rpc::prog_mismatch_reply_message(xid, nfs2::VERSION, nfs3::VERSION)
                .serialize(output)?;
        }
    }
    Ok(Disposition::Reply(()))
}
