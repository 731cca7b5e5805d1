use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

mod support;

use futures::future::join_all;
use tokio::time::timeout;

use nfs_fsstat::cache::{DynamicFsInfo, EntryKey, StorageError};
use nfs_fsstat::protocol::nfs::fsstat::{
    fsstat, map_status, Disposition, FailureReason, FhResolver, FileHandle, FsstatReply,
    NfsVersion, ResolveError,
};
use nfs_fsstat::xdr::nfs2::{fhandle, nfsstat2, statfsokres, STATFS2res};
use nfs_fsstat::xdr::nfs3::fs::FSSTAT3res;
use nfs_fsstat::xdr::nfs3::{self, nfsstat3};

use support::{
    init_tracing, make_context, root_handle, CountingStore, FixedResolver, GENERATION, ROOT,
};

const CURRENT_INFO: DynamicFsInfo = DynamicFsInfo {
    total_bytes: 1_000_000,
    free_bytes: 400_000,
    avail_bytes: 350_000,
    total_files: 1000,
    free_files: 200,
    avail_files: 150,
};

const LEGACY_INFO: DynamicFsInfo = DynamicFsInfo {
    total_bytes: 1_048_576,
    free_bytes: 524_288,
    avail_bytes: 262_144,
    total_files: 0,
    free_files: 0,
    avail_files: 0,
};

fn expect_reply(disposition: Disposition) -> FsstatReply {
    match disposition {
        Disposition::Reply(reply) => reply,
        Disposition::Drop => panic!("request was dropped"),
    }
}

#[tokio::test]
async fn current_success_reports_counts_and_attributes() {
    init_tracing();
    let store = Arc::new(CountingStore::with_root(CURRENT_INFO));
    let context = make_context(store.clone());

    let reply = expect_reply(fsstat(&root_handle(NfsVersion::V3), &context).await);
    let FsstatReply::V3(FSSTAT3res::resok(ok)) = reply else {
        panic!("expected FSSTAT3 success, got {:?}", reply);
    };
    assert_eq!(ok.tbytes, 1_000_000);
    assert_eq!(ok.fbytes, 400_000);
    assert_eq!(ok.abytes, 350_000);
    assert_eq!(ok.tfiles, 1000);
    assert_eq!(ok.ffiles, 200);
    assert_eq!(ok.afiles, 150);
    assert_eq!(ok.invarsec, 0);
    let nfs3::post_op_attr::attributes(attr) = ok.obj_attributes else {
        panic!("attributes should follow");
    };
    assert_eq!(attr.fileid, ROOT.fileid);
    assert_eq!(attr.ftype, nfs3::ftype3::NF3REG);

    assert_eq!(store.acquires(), 1);
    assert_eq!(store.releases(), 1);
    assert_eq!(store.inner.refcount(ROOT), Some(0));
}

#[tokio::test]
async fn legacy_success_reports_blocks() {
    init_tracing();
    let store = Arc::new(CountingStore::with_root(LEGACY_INFO));
    let context = make_context(store.clone());

    let reply = expect_reply(fsstat(&root_handle(NfsVersion::V2), &context).await);
    assert_eq!(
        reply,
        FsstatReply::V2(STATFS2res::info(statfsokres {
            tsize: 8192,
            bsize: 512,
            blocks: 2048,
            bfree: 1024,
            bavail: 512,
        }))
    );
    assert_eq!(store.getattr_count(), 0);
    assert_eq!(store.acquires(), store.releases());
}

#[tokio::test]
async fn legacy_truncates_partial_blocks() {
    let info = DynamicFsInfo { total_bytes: 5000, ..Default::default() };
    let store = Arc::new(CountingStore::with_root(info));
    let context = make_context(store.clone());

    let reply = expect_reply(fsstat(&root_handle(NfsVersion::V2), &context).await);
    let FsstatReply::V2(STATFS2res::info(res)) = reply else {
        panic!("expected STATFS success, got {:?}", reply);
    };
    assert_eq!(res.blocks, 9);
}

#[tokio::test]
async fn stale_handle_takes_no_reference() {
    init_tracing();
    let store = Arc::new(CountingStore::with_root(CURRENT_INFO));
    let context = make_context(store.clone());
    let gone = EntryKey { fsid: ROOT.fsid, fileid: 99 };
    let handle = FhResolver::new(GENERATION).handle_for(NfsVersion::V3, gone);

    let reply = expect_reply(fsstat(&handle, &context).await);
    assert_eq!(reply, FsstatReply::V3(FSSTAT3res::failed(nfsstat3::NFS3ERR_STALE)));
    assert_eq!(store.acquires(), 0);
    assert_eq!(store.releases(), 0);
    assert_eq!(store.statfs_count(), 0);
}

#[tokio::test]
async fn malformed_handle_is_bad_for_current_and_stale_for_legacy() {
    let store = Arc::new(CountingStore::with_root(CURRENT_INFO));
    let context = make_context(store.clone());

    let short = FileHandle::V3(nfs3::nfs_fh3 { data: vec![1, 2, 3] });
    let reply = expect_reply(fsstat(&short, &context).await);
    assert_eq!(reply, FsstatReply::V3(FSSTAT3res::failed(nfsstat3::NFS3ERR_BADHANDLE)));

    let mut legacy = fhandle::default();
    legacy.data[31] = 0xff;
    let reply = expect_reply(fsstat(&FileHandle::V2(legacy), &context).await);
    assert_eq!(reply, FsstatReply::V2(STATFS2res::error(nfsstat2::NFSERR_STALE)));
    assert_eq!(store.acquires(), 0);
}

#[tokio::test]
async fn statfs_failure_releases_and_skips_getattr() {
    init_tracing();
    let store = Arc::new(CountingStore::with_root(CURRENT_INFO));
    *store.statfs_result.lock().unwrap() = Some(Err(StorageError::Unavailable("disk".into())));
    let context = make_context(store.clone());

    let reply = expect_reply(fsstat(&root_handle(NfsVersion::V3), &context).await);
    let FsstatReply::V3(FSSTAT3res::resfail(stat, fail)) = reply else {
        panic!("expected FSSTAT3 failure, got {:?}", reply);
    };
    assert_eq!(stat, nfsstat3::NFS3ERR_IO);
    assert!(!fail.obj_attributes.attributes_follow());
    assert_eq!(store.getattr_count(), 0);
    assert_eq!(store.acquires(), 1);
    assert_eq!(store.releases(), 1);

    let reply = expect_reply(fsstat(&root_handle(NfsVersion::V2), &context).await);
    assert_eq!(reply, FsstatReply::V2(STATFS2res::error(nfsstat2::NFSERR_IO)));
    assert_eq!(store.acquires(), store.releases());
}

#[tokio::test]
async fn getattr_failure_releases() {
    let store = Arc::new(CountingStore::with_root(CURRENT_INFO));
    *store.getattr_result.lock().unwrap() = Some(Err(StorageError::Unavailable("disk".into())));
    let context = make_context(store.clone());

    let reply = expect_reply(fsstat(&root_handle(NfsVersion::V3), &context).await);
    assert_eq!(reply, FsstatReply::V3(FSSTAT3res::failed(nfsstat3::NFS3ERR_IO)));
    assert_eq!(store.statfs_count(), 1);
    assert_eq!(store.getattr_count(), 1);
    assert_eq!(store.acquires(), 1);
    assert_eq!(store.releases(), 1);
    assert_eq!(store.inner.refcount(ROOT), Some(0));
}

#[tokio::test]
async fn entry_gone_during_queries_is_stale() {
    let store = Arc::new(CountingStore::with_root(CURRENT_INFO));
    *store.statfs_result.lock().unwrap() = Some(Err(StorageError::Stale));
    let context = make_context(store.clone());

    let reply = expect_reply(fsstat(&root_handle(NfsVersion::V3), &context).await);
    assert_eq!(reply, FsstatReply::V3(FSSTAT3res::failed(nfsstat3::NFS3ERR_STALE)));
    let reply = expect_reply(fsstat(&root_handle(NfsVersion::V2), &context).await);
    assert_eq!(reply, FsstatReply::V2(STATFS2res::error(nfsstat2::NFSERR_STALE)));

    *store.statfs_result.lock().unwrap() = None;
    *store.getattr_result.lock().unwrap() = Some(Err(StorageError::NotFound));
    let reply = expect_reply(fsstat(&root_handle(NfsVersion::V3), &context).await);
    assert_eq!(reply, FsstatReply::V3(FSSTAT3res::failed(nfsstat3::NFS3ERR_STALE)));

    assert_eq!(store.acquires(), 3);
    assert_eq!(store.releases(), 3);
    assert_eq!(store.inner.refcount(ROOT), Some(0));
}

#[tokio::test]
async fn storage_failure_during_resolution_takes_no_reference() {
    let store = Arc::new(CountingStore::with_root(CURRENT_INFO));
    *store.acquire_result.lock().unwrap() = Some(StorageError::Unavailable("offline".into()));
    let context = make_context(store.clone());

    let reply = expect_reply(fsstat(&root_handle(NfsVersion::V3), &context).await);
    assert_eq!(reply, FsstatReply::V3(FSSTAT3res::failed(nfsstat3::NFS3ERR_IO)));
    let reply = expect_reply(fsstat(&root_handle(NfsVersion::V2), &context).await);
    assert_eq!(reply, FsstatReply::V2(STATFS2res::error(nfsstat2::NFSERR_IO)));

    assert_eq!(store.acquires(), 0);
    assert_eq!(store.releases(), 0);
    assert_eq!(store.statfs_count(), 0);
    assert_eq!(store.inner.refcount(ROOT), Some(0));
}

#[tokio::test]
async fn legacy_never_queries_attributes() {
    let store = Arc::new(CountingStore::with_root(LEGACY_INFO));
    *store.getattr_result.lock().unwrap() = Some(Err(StorageError::Stale));
    let context = make_context(store.clone());

    let reply = expect_reply(fsstat(&root_handle(NfsVersion::V2), &context).await);
    assert!(reply.is_ok());
    assert_eq!(store.getattr_count(), 0);
}

#[tokio::test]
async fn every_failure_reason_reaches_the_wire_status() {
    for reason in FailureReason::ALL {
        let store = Arc::new(CountingStore::with_root(CURRENT_INFO));
        let mut context = make_context(store.clone());
        context.resolver = Arc::new(FixedResolver(ResolveError::Failed(reason)));

        let status = map_status(reason);
        let reply = expect_reply(fsstat(&root_handle(NfsVersion::V2), &context).await);
        assert_eq!(reply, FsstatReply::V2(STATFS2res::error(status.v2)), "{reason}");
        let reply = expect_reply(fsstat(&root_handle(NfsVersion::V3), &context).await);
        assert_eq!(reply, FsstatReply::V3(FSSTAT3res::failed(status.v3)), "{reason}");
        assert_eq!(store.acquires(), 0);
    }
}

#[tokio::test]
async fn drop_disposition_sends_nothing() {
    let store = Arc::new(CountingStore::with_root(CURRENT_INFO));
    let mut context = make_context(store.clone());
    context.resolver = Arc::new(FixedResolver(ResolveError::Drop));

    let disposition = fsstat(&root_handle(NfsVersion::V3), &context).await;
    assert!(disposition.is_drop());
    assert_eq!(store.statfs_count(), 0);
    assert_eq!(store.releases(), 0);
}

#[tokio::test]
async fn panic_in_statfs_still_releases() {
    init_tracing();
    let store = Arc::new(CountingStore::with_root(CURRENT_INFO));
    store.panic_in_statfs.store(true, Ordering::SeqCst);
    let context = make_context(store.clone());

    let task = tokio::spawn(async move { fsstat(&root_handle(NfsVersion::V3), &context).await });
    let err = task.await.expect_err("statfs should panic");
    assert!(err.is_panic());

    assert_eq!(store.acquires(), 1);
    assert_eq!(store.releases(), 1);
    assert_eq!(store.inner.refcount(ROOT), Some(0));
}

#[tokio::test]
async fn cancelled_request_still_releases() {
    let store = Arc::new(CountingStore::with_root(CURRENT_INFO));
    store.stall_statfs.store(true, Ordering::SeqCst);
    let context = make_context(store.clone());

    let handle = root_handle(NfsVersion::V3);
    let result = timeout(Duration::from_millis(50), fsstat(&handle, &context)).await;
    assert!(result.is_err());

    assert_eq!(store.acquires(), 1);
    assert_eq!(store.releases(), 1);
    assert_eq!(store.inner.refcount(ROOT), Some(0));
}

#[tokio::test]
async fn concurrent_requests_balance_references() {
    let store = Arc::new(CountingStore::with_root(CURRENT_INFO));
    let context = make_context(store.clone());
    let handles: Vec<_> = (0..32)
        .map(|i| root_handle(if i % 2 == 0 { NfsVersion::V2 } else { NfsVersion::V3 }))
        .collect();

    let replies = join_all(handles.iter().map(|handle| fsstat(handle, &context))).await;
    for (handle, disposition) in handles.iter().zip(replies) {
        let reply = expect_reply(disposition);
        assert!(reply.is_ok());
        assert_eq!(reply.version(), handle.version());
    }
    assert_eq!(store.acquires(), 32);
    assert_eq!(store.releases(), 32);
    assert_eq!(store.inner.refcount(ROOT), Some(0));
}
