//! Decoding of the RPC call header and routing to the NFS program.

use std::io::{Cursor, Read, Write};

use anyhow::anyhow;
use tracing::{debug, error, warn};

use crate::protocol::nfs::{self, Disposition};
use crate::protocol::rpc;
use crate::protocol::xdr::{self, deserialize, nfs3, Serialize};

/// Processes a single RPC message
///
/// 1. Deserializes the call header
/// 2. Extracts `AUTH_UNIX` credentials into the context
/// 3. Rejects RPC versions other than 2
/// 4. Routes NFS calls to [`nfs::handle_nfs`] and answers any other
///    program with `PROG_UNAVAIL`
///
/// Returns [`Disposition::Drop`] when no reply was written.
pub async fn handle_rpc(
    input: &mut impl Read,
    output: &mut impl Write,
    mut context: rpc::Context,
) -> Result<Disposition<()>, anyhow::Error> {
    let recv = deserialize::<xdr::rpc::rpc_msg>(input)?;
    let xid = recv.xid;
    let xdr::rpc::rpc_body::CALL(call) = recv.body else {
        error!("Unexpectedly received a Reply instead of a Call");
        return Err(anyhow!("Bad RPC Call format"));
    };

    if let xdr::rpc::auth_flavor::AUTH_UNIX = call.cred.flavor {
        context.auth = deserialize(&mut Cursor::new(&call.cred.body))?;
    }
    if call.rpcvers != 2 {
        warn!("Invalid RPC version {} != 2", call.rpcvers);
        xdr::rpc::rpc_vers_mismatch(xid).serialize(output)?;
        return Ok(Disposition::Reply(()));
    }

    debug!(
        "xid {} from {}: prog {} vers {} proc {}",
        xid, context.client_addr, call.prog, call.vers, call.proc
    );
    match call.prog {
        nfs3::PROGRAM => nfs::handle_nfs(xid, call, input, output, &context).await,
        unknown_number => {
            warn!("Unknown RPC Program number {} != {}", unknown_number, nfs3::PROGRAM);
            xdr::rpc::prog_unavail_reply_message(xid).serialize(output)?;
            Ok(Disposition::Reply(()))
        }
    }
}
