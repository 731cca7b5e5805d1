//! Per-call state handed to every procedure handler.

use std::fmt;
use std::sync::Arc;

use crate::cache::CacheStore;
use crate::config::FsstatConfig;
use crate::protocol::nfs::fsstat::HandleResolver;
use crate::protocol::xdr;

/// Represents the execution context for RPC operations
///
/// Cloning is cheap: the cache and resolver are shared.
#[derive(Clone)]
pub struct Context {
    /// Client's network address (IP:port) used for logging
    pub client_addr: String,

    /// UNIX-style credentials of the current call, if it carried any
    pub auth: xdr::rpc::auth_unix,

    /// Entry cache the handle is resolved against
    pub cache: Arc<dyn CacheStore>,

    /// Maps wire handles to cache references
    pub resolver: Arc<dyn HandleResolver>,

    pub config: FsstatConfig,
}

impl Context {
    pub fn new(
        client_addr: impl Into<String>,
        cache: Arc<dyn CacheStore>,
        resolver: Arc<dyn HandleResolver>,
        config: FsstatConfig,
    ) -> Self {
        Context {
            client_addr: client_addr.into(),
            auth: xdr::rpc::auth_unix::default(),
            cache,
            resolver,
            config,
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("rpc::Context")
            .field("client_addr", &self.client_addr)
            .field("auth", &self.auth)
            .field("config", &self.config)
            .finish()
    }
}
