//! ONC RPC version 2 (RFC 5531) call handling.
//!
//! A transport hands each decoded record to [`handle_rpc`] together with a
//! [`Context`] for the connection. Record marking and sockets are left to
//! the embedding server.

mod context;
mod dispatch;

pub use context::Context;
pub use dispatch::handle_rpc;
