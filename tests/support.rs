#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;

use nfs_pathserve::handle::PathHandles;
use nfs_pathserve::protocol::nfs;
use nfs_pathserve::protocol::rpc::{self, Context};
use nfs_pathserve::vfs::{DirEntry, EntryKind, FileSystem, FsError, Metadata, NullAuthHandler};
use nfs_pathserve::xdr::{self, deserialize, Serialize};

/// In-memory tree keyed by relative path; the root is `""`.
#[derive(Default)]
pub struct MemFs {
    entries: BTreeMap<String, Metadata>,
}

fn key(path: &str) -> String {
    path.trim_matches('/').to_string()
}

fn parent_of(key: &str) -> &str {
    key.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}

impl MemFs {
    pub fn new() -> Self {
        let mut fs = MemFs::default();
        fs.entries.insert(
            String::new(),
            Metadata { kind: EntryKind::Directory, mode: 0o755, ..Default::default() },
        );
        fs
    }

    pub fn with_dir(mut self, path: &str) -> Self {
        self.entries.insert(
            key(path),
            Metadata { kind: EntryKind::Directory, mode: 0o755, ..Default::default() },
        );
        self
    }

    pub fn with_file(mut self, path: &str, size: u64) -> Self {
        self.entries.insert(
            key(path),
            Metadata { kind: EntryKind::File, mode: 0o644, size, ..Default::default() },
        );
        self
    }
}

#[async_trait]
impl FileSystem for MemFs {
    async fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>, FsError> {
        let dir = key(path);
        match self.entries.get(&dir) {
            None => return Err(FsError::NotFound(path.to_string())),
            Some(meta) if !meta.is_dir() => return Err(FsError::NotDirectory(path.to_string())),
            Some(_) => {}
        }
        let mut entries: Vec<DirEntry> = self
            .entries
            .iter()
            .filter(|(k, _)| !k.is_empty() && parent_of(k) == dir)
            .map(|(k, meta)| DirEntry {
                name: k.rsplit('/').next().unwrap_or(k).to_string(),
                meta: meta.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn stat(&self, path: &str) -> Result<Metadata, FsError> {
        self.entries.get(&key(path)).cloned().ok_or_else(|| FsError::NotFound(path.to_string()))
    }
}

pub type TestHandler = PathHandles<NullAuthHandler>;

pub fn handler(fs: MemFs) -> TestHandler {
    let fs: Arc<dyn FileSystem> = Arc::new(fs);
    PathHandles::new(NullAuthHandler::new(fs.clone()), fs)
}

pub fn context_with(handler: TestHandler) -> Context {
    Context {
        local_port: 0,
        client_addr: "127.0.0.1:1234".to_string(),
        auth: xdr::rpc::auth_unix::default(),
        handler: Arc::new(handler),
        dispatch: Arc::new(nfs::default_table().unwrap()),
        server_id: [7; 8],
        mount_signal: None,
    }
}

pub fn context(fs: MemFs) -> Context {
    context_with(handler(fs))
}

pub fn call_message(
    xid: u32,
    prog: u32,
    vers: u32,
    proc: u32,
    cred: xdr::rpc::opaque_auth,
    args: &impl Serialize,
) -> Vec<u8> {
    let call = xdr::rpc::call_body {
        rpcvers: xdr::rpc::RPC_VERSION,
        prog,
        vers,
        proc,
        cred,
        verf: xdr::rpc::opaque_auth::default(),
    };
    let msg = xdr::rpc::rpc_msg { xid, body: xdr::rpc::rpc_body::CALL(call) };
    let mut buf = Vec::new();
    msg.serialize(&mut buf).unwrap();
    args.serialize(&mut buf).unwrap();
    buf
}

/// Runs one call through the dispatcher. Returns the decoded reply header
/// and a cursor positioned at the procedure results.
pub async fn call(
    context: &mut Context,
    prog: u32,
    vers: u32,
    proc: u32,
    args: &impl Serialize,
) -> (xdr::rpc::rpc_msg, Cursor<Vec<u8>>) {
    let msg = call_message(99, prog, vers, proc, xdr::rpc::opaque_auth::default(), args);
    let mut output = Vec::new();
    rpc::handle_rpc(&mut Cursor::new(msg), &mut output, context).await.unwrap();
    let mut reply = Cursor::new(output);
    let header = deserialize::<xdr::rpc::rpc_msg>(&mut reply).unwrap();
    assert_eq!(header.xid, 99);
    (header, reply)
}

pub fn accept_body(msg: &xdr::rpc::rpc_msg) -> &xdr::rpc::accept_body {
    match &msg.body {
        xdr::rpc::rpc_body::REPLY(xdr::rpc::reply_body::MSG_ACCEPTED(accepted)) => {
            &accepted.reply_data
        }
        other => panic!("expected MSG_ACCEPTED, got {:?}", other),
    }
}

pub async fn nfs_call(
    context: &mut Context,
    proc: xdr::nfs3::NFSProgram,
    args: &impl Serialize,
) -> Cursor<Vec<u8>> {
    let (header, reply) =
        call(context, xdr::nfs3::PROGRAM, xdr::nfs3::VERSION, proc as u32, args).await;
    assert!(matches!(accept_body(&header), xdr::rpc::accept_body::SUCCESS));
    reply
}

pub async fn mount_call(
    context: &mut Context,
    proc: xdr::mount::MountProgram,
    args: &impl Serialize,
) -> Cursor<Vec<u8>> {
    let (header, reply) =
        call(context, xdr::mount::PROGRAM, xdr::mount::VERSION, proc as u32, args).await;
    assert!(matches!(accept_body(&header), xdr::rpc::accept_body::SUCCESS));
    reply
}

pub fn root_handle() -> xdr::nfs3::nfs_fh3 {
    nfs_pathserve::handle::encode("/")
}

/// Handle of `path` as minted by the handler of `context`.
pub fn handle_of(context: &Context, path: &[&str]) -> xdr::nfs3::nfs_fh3 {
    let segments: Vec<String> = path.iter().map(|s| s.to_string()).collect();
    let (fs, _) = context.handler.from_handle(&root_handle()).unwrap();
    context.handler.to_handle(fs.as_ref(), &segments)
}

/// Arguments of procedures taking none.
pub struct Void;

impl Serialize for Void {
    fn serialize<W: std::io::Write>(&self, _dest: &mut W) -> std::io::Result<()> {
        Ok(())
    }
}

/// Pre-encoded arguments, written as is.
pub struct Raw(pub Vec<u8>);

impl Serialize for Raw {
    fn serialize<W: std::io::Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_all(&self.0)
    }
}
