#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use num_traits::FromPrimitive;

use nfs_fsstat::cache::{
    Attributes, CacheStore, DynamicFsInfo, EntryId, EntryKey, EntryRef, MemoryCache, StorageError,
};
use nfs_fsstat::config::FsstatConfig;
use nfs_fsstat::protocol::nfs::fsstat::{
    FhResolver, FileHandle, HandleResolver, NfsVersion, ResolveError,
};
use nfs_fsstat::protocol::rpc::Context;
use nfs_fsstat::xdr::{self, nfs2, nfs3, Serialize};

pub const GENERATION: u64 = 1;
pub const ROOT: EntryKey = EntryKey { fsid: 7, fileid: 1 };

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn root_attr() -> Attributes {
    Attributes { fsid: ROOT.fsid, fileid: ROOT.fileid, mode: 0o755, nlink: 2, ..Default::default() }
}

/// A [`MemoryCache`] that counts calls and can be told to fail or stall.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryCache,
    pub acquire_calls: Mutex<u32>,
    pub release_calls: Mutex<u32>,
    pub statfs_calls: Mutex<u32>,
    pub getattr_calls: Mutex<u32>,
    pub acquire_result: Mutex<Option<StorageError>>,
    pub statfs_result: Mutex<Option<Result<DynamicFsInfo, StorageError>>>,
    pub getattr_result: Mutex<Option<Result<Attributes, StorageError>>>,
    pub panic_in_statfs: AtomicBool,
    pub stall_statfs: AtomicBool,
}

impl CountingStore {
    /// A cache holding [`ROOT`] on a file system reporting `info`.
    pub fn with_root(info: DynamicFsInfo) -> Self {
        let store = Self::default();
        store.inner.insert(ROOT, root_attr());
        store.inner.set_dynamic_info(ROOT.fsid, info);
        store
    }

    pub fn acquires(&self) -> u32 {
        *self.acquire_calls.lock().unwrap()
    }

    pub fn releases(&self) -> u32 {
        *self.release_calls.lock().unwrap()
    }

    pub fn statfs_count(&self) -> u32 {
        *self.statfs_calls.lock().unwrap()
    }

    pub fn getattr_count(&self) -> u32 {
        *self.getattr_calls.lock().unwrap()
    }
}

#[async_trait]
impl CacheStore for CountingStore {
    fn acquire(&self, key: EntryKey) -> Result<EntryId, StorageError> {
        if let Some(err) = self.acquire_result.lock().unwrap().clone() {
            return Err(err);
        }
        let id = self.inner.acquire(key)?;
        *self.acquire_calls.lock().unwrap() += 1;
        Ok(id)
    }

    fn release(&self, id: EntryId) {
        *self.release_calls.lock().unwrap() += 1;
        self.inner.release(id);
    }

    async fn statfs(&self, id: EntryId) -> Result<DynamicFsInfo, StorageError> {
        *self.statfs_calls.lock().unwrap() += 1;
        if self.panic_in_statfs.load(Ordering::SeqCst) {
            panic!("statfs exploded");
        }
        if self.stall_statfs.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let injected = self.statfs_result.lock().unwrap().clone();
        match injected {
            Some(result) => result,
            None => self.inner.statfs(id).await,
        }
    }

    async fn getattr(&self, id: EntryId) -> Result<Attributes, StorageError> {
        *self.getattr_calls.lock().unwrap() += 1;
        let injected = self.getattr_result.lock().unwrap().clone();
        match injected {
            Some(result) => result,
            None => self.inner.getattr(id).await,
        }
    }
}

/// Returns a fixed outcome without touching the cache.
pub struct FixedResolver(pub ResolveError);

impl HandleResolver for FixedResolver {
    fn resolve<'a>(
        &self,
        _handle: &FileHandle,
        _cache: &'a dyn CacheStore,
    ) -> Result<EntryRef<'a>, ResolveError> {
        Err(self.0)
    }
}

pub fn make_context(store: Arc<CountingStore>) -> Context {
    Context::new(
        "127.0.0.1:1234",
        store,
        Arc::new(FhResolver::new(GENERATION)),
        FsstatConfig::default(),
    )
}

pub fn root_handle(version: NfsVersion) -> FileHandle {
    FhResolver::new(GENERATION).handle_for(version, ROOT)
}

pub fn call_body(vers: u32, proc: u32) -> xdr::rpc::call_body {
    xdr::rpc::call_body {
        rpcvers: 2,
        prog: nfs3::PROGRAM,
        vers,
        proc,
        cred: xdr::rpc::opaque_auth::default(),
        verf: xdr::rpc::opaque_auth::default(),
    }
}

/// Serializes the procedure argument of `handle` into a readable cursor.
pub fn handle_args(handle: &FileHandle) -> Cursor<Vec<u8>> {
    let mut input = Cursor::new(Vec::new());
    match handle {
        FileHandle::V2(fh) => fh.serialize(&mut input),
        FileHandle::V3(fh) => fh.serialize(&mut input),
    }
    .expect("serialize handle");
    input.set_position(0);
    input
}

/// Reads the RPC header and returns its accept status.
pub fn read_accept(output: &mut Cursor<Vec<u8>>) -> xdr::rpc::accept_body {
    let msg = xdr::deserialize::<xdr::rpc::rpc_msg>(output).expect("deserialize rpc");
    match msg.body {
        xdr::rpc::rpc_body::REPLY(xdr::rpc::reply_body::MSG_ACCEPTED(accepted)) => {
            accepted.reply_data
        }
        other => panic!("expected MSG_ACCEPTED, got {:?}", other),
    }
}

pub fn read_status3(output: &mut Cursor<Vec<u8>>) -> nfs3::nfsstat3 {
    let status_raw = xdr::deserialize::<u32>(output).expect("deserialize status");
    nfs3::nfsstat3::from_u32(status_raw).expect("invalid nfsstat3 value")
}

pub fn read_status2(output: &mut Cursor<Vec<u8>>) -> nfs2::nfsstat2 {
    let status_raw = xdr::deserialize::<u32>(output).expect("deserialize status");
    nfs2::nfsstat2::from_u32(status_raw).expect("invalid nfsstat2 value")
}
