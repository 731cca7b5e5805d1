//! Protocol layers between the RPC record and the entry cache.
//!
//! - `xdr`: External Data Representation (RFC 4506) encoding of the RPC
//!   envelope and of the NFS version 2 and 3 types used here.
//!
//! - `rpc`: call header decoding, credentials and the per-call [`rpc::Context`].
//!
//! - `nfs`: NFS program dispatch and the STATFS/FSSTAT handler.

pub mod nfs;
pub mod rpc;
pub mod xdr;
