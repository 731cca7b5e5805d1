//! File system usage reporting for an NFS server backed by an entry cache.
//!
//! Serves STATFS (NFS version 2, RFC 1094) and FSSTAT (NFS version 3,
//! RFC 1813) from a single handler. A request names a file by its opaque
//! handle; the handler resolves the handle against the entry cache, reads
//! the usage figures of the file system holding the entry and answers in the
//! reply layout of the request's protocol version.
//!
//! ## Main Components
//!
//! - `cache`: the [`cache::CacheStore`] seam, reference-holding
//!   [`cache::EntryRef`] guards and the in-process [`cache::MemoryCache`].
//!
//! - `protocol`: XDR types, RPC call routing and the NFS procedure handlers,
//!   in particular [`protocol::nfs::fsstat`].
//!
//! - `config`: reply tunables of the version 2 encoding.
//!
//! ## Usage
//!
//! Build an [`protocol::rpc::Context`] holding the cache, a
//! [`protocol::nfs::fsstat::HandleResolver`] and an [`config::FsstatConfig`],
//! then feed each decoded RPC record to [`protocol::rpc::handle_rpc`].

pub mod cache;
pub mod config;
pub mod protocol;

pub use protocol::xdr;
