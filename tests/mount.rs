mod support;

use tokio::sync::mpsc;

use nfs_pathserve::handle;
use nfs_pathserve::vfs::NullAuthHandler;
use nfs_pathserve::xdr::{deserialize, mount};

use support::{context, context_with, mount_call, MemFs, Void};

fn tree() -> MemFs {
    MemFs::new().with_dir("docs").with_dir("docs/old").with_file("readme", 12)
}

#[tokio::test]
async fn mnt_returns_root_handle_and_signals() {
    let (tx, mut rx) = mpsc::channel(4);
    let mut context = context(tree());
    context.mount_signal = Some(tx);

    let mut reply =
        mount_call(&mut context, mount::MountProgram::MOUNTPROC3_MNT, &b"/".to_vec()).await;
    assert_eq!(deserialize::<mount::mountstat3>(&mut reply).unwrap(), mount::mountstat3::MNT3_OK);
    let ok = deserialize::<mount::mountres3_ok>(&mut reply).unwrap();
    assert_eq!(ok.fhandle, handle::encode("/").data);
    assert_eq!(ok.auth_flavors, vec![0, 1]);
    assert_eq!(rx.recv().await, Some(true));
}

#[tokio::test]
async fn mnt_of_subdirectory() {
    let mut context = context(tree());
    let mut reply =
        mount_call(&mut context, mount::MountProgram::MOUNTPROC3_MNT, &b"/docs/old".to_vec())
            .await;
    assert_eq!(deserialize::<mount::mountstat3>(&mut reply).unwrap(), mount::mountstat3::MNT3_OK);
    let ok = deserialize::<mount::mountres3_ok>(&mut reply).unwrap();
    assert_eq!(ok.fhandle, handle::encode("docs/old").data);
}

#[tokio::test]
async fn mnt_failures() {
    let mut context = context(tree());
    for (path, expected) in [
        ("/missing", mount::mountstat3::MNT3ERR_NOENT),
        ("/readme", mount::mountstat3::MNT3ERR_NOTDIR),
    ] {
        let mut reply =
            mount_call(&mut context, mount::MountProgram::MOUNTPROC3_MNT, &path.as_bytes().to_vec())
                .await;
        assert_eq!(deserialize::<mount::mountstat3>(&mut reply).unwrap(), expected, "{path}");
        assert_eq!(reply.position() as usize, reply.get_ref().len());
    }

    let long = vec![b'a'; mount::MNTPATHLEN as usize + 1];
    let mut reply = mount_call(&mut context, mount::MountProgram::MOUNTPROC3_MNT, &long).await;
    assert_eq!(
        deserialize::<mount::mountstat3>(&mut reply).unwrap(),
        mount::mountstat3::MNT3ERR_NAMETOOLONG
    );
}

#[tokio::test]
async fn mnt_checks_export_name() {
    let fs: std::sync::Arc<dyn nfs_pathserve::vfs::FileSystem> = std::sync::Arc::new(tree());
    let handler = handle::PathHandles::new(
        NullAuthHandler::new(fs.clone()).with_export_name("export/"),
        fs,
    );
    let mut context = context_with(handler);

    let mut reply =
        mount_call(&mut context, mount::MountProgram::MOUNTPROC3_MNT, &b"/other".to_vec()).await;
    assert_eq!(
        deserialize::<mount::mountstat3>(&mut reply).unwrap(),
        mount::mountstat3::MNT3ERR_NOENT
    );

    let mut reply =
        mount_call(&mut context, mount::MountProgram::MOUNTPROC3_MNT, &b"/export/docs".to_vec())
            .await;
    assert_eq!(deserialize::<mount::mountstat3>(&mut reply).unwrap(), mount::mountstat3::MNT3_OK);
    let ok = deserialize::<mount::mountres3_ok>(&mut reply).unwrap();
    assert_eq!(ok.fhandle, handle::encode("docs").data);

    let mut reply = mount_call(&mut context, mount::MountProgram::MOUNTPROC3_EXPORT, &Void).await;
    assert!(deserialize::<bool>(&mut reply).unwrap());
    assert_eq!(deserialize::<Vec<u8>>(&mut reply).unwrap(), b"/export".to_vec());
    assert!(!deserialize::<bool>(&mut reply).unwrap());
    assert!(!deserialize::<bool>(&mut reply).unwrap());
}

#[tokio::test]
async fn umnt_and_umntall_reply_void_and_signal() {
    let (tx, mut rx) = mpsc::channel(4);
    let mut context = context(tree());
    context.mount_signal = Some(tx);

    let reply =
        mount_call(&mut context, mount::MountProgram::MOUNTPROC3_UMNT, &b"/".to_vec()).await;
    assert_eq!(reply.position() as usize, reply.get_ref().len());
    assert_eq!(rx.recv().await, Some(false));

    let reply = mount_call(&mut context, mount::MountProgram::MOUNTPROC3_UMNTALL, &Void).await;
    assert_eq!(reply.position() as usize, reply.get_ref().len());
    assert_eq!(rx.recv().await, Some(false));
}

#[tokio::test]
async fn null_replies_void() {
    let mut context = context(tree());
    let reply = mount_call(&mut context, mount::MountProgram::MOUNTPROC3_NULL, &Void).await;
    assert_eq!(reply.position() as usize, reply.get_ref().len());
}
