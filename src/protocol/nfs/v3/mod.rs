//! NFS version 3 (RFC 1813), read-only subset.
//!
//! Served procedures:
//!
//! - NULL (0)
//! - GETATTR (1)
//! - LOOKUP (3)
//! - ACCESS (4)
//! - READDIRPLUS (17)
//! - FSINFO (19)
//! - PATHCONF (20)
//!
//! Every other procedure answers `PROC_UNAVAIL`. Each procedure lives in its
//! own module; [`register`] adds all of them to a dispatch table.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::fs_util::metadata_to_fattr3;
use crate::handle;
use crate::protocol::rpc::{
    self, ArgStream, DispatchError, DispatchTableBuilder, ErrorBody, Procedure, ProcedureError,
    RpcProgram,
};
use crate::protocol::xdr::nfs3;
use crate::vfs::{FileSystem, FsError, Metadata};

mod access;
mod fsinfo;
mod getattr;
mod lookup;
mod null;
mod pathconf;
mod readdirplus;

pub use access::nfsproc3_access;
pub use fsinfo::nfsproc3_fsinfo;
pub use getattr::nfsproc3_getattr;
pub use lookup::nfsproc3_lookup;
pub use null::nfsproc3_null;
pub use pathconf::nfsproc3_pathconf;
pub use readdirplus::nfsproc3_readdirplus;

pub const PROGRAM: RpcProgram = RpcProgram { number: nfs3::PROGRAM, version: nfs3::VERSION };

/// Registers every served NFSv3 procedure.
pub fn register(builder: &mut DispatchTableBuilder) -> Result<(), DispatchError> {
    use nfs3::NFSProgram::*;
    use ErrorBody::{Empty, PostOpAttr};

    let procedures: [(nfs3::NFSProgram, &'static str, rpc::ProcedureFn, ErrorBody); 7] = [
        (NFSPROC3_NULL, "NFSPROC3_NULL", null, Empty),
        (NFSPROC3_GETATTR, "NFSPROC3_GETATTR", getattr, Empty),
        (NFSPROC3_LOOKUP, "NFSPROC3_LOOKUP", lookup, PostOpAttr),
        (NFSPROC3_ACCESS, "NFSPROC3_ACCESS", access, PostOpAttr),
        (NFSPROC3_READDIRPLUS, "NFSPROC3_READDIRPLUS", readdirplus, PostOpAttr),
        (NFSPROC3_FSINFO, "NFSPROC3_FSINFO", fsinfo, PostOpAttr),
        (NFSPROC3_PATHCONF, "NFSPROC3_PATHCONF", pathconf, PostOpAttr),
    ];
    for (procedure, name, run, error_body) in procedures {
        builder.register(PROGRAM, procedure as u32, Procedure { name, run, error_body })?;
    }
    Ok(())
}

/// A file system object named by a file handle.
pub(crate) struct Resolved {
    pub fs: Arc<dyn FileSystem>,
    pub segments: Vec<String>,
    /// Path of the object in `fs`
    pub path: String,
    /// File id embedded in the handle
    pub fileid: nfs3::fileid3,
}

impl Resolved {
    pub async fn stat(&self) -> Result<Metadata, FsError> {
        self.fs.stat(&self.path).await
    }

    pub async fn attributes(&self) -> Result<nfs3::fattr3, FsError> {
        Ok(metadata_to_fattr3(self.fileid, &self.stat().await?))
    }

    pub fn is_root(&self) -> bool {
        self.segments.iter().all(|s| s.is_empty())
    }
}

/// Maps a failure to reach the object named by a handle. An object that no
/// longer exists makes its handle stale.
pub(crate) fn stale_if_missing(err: FsError) -> ProcedureError {
    match err {
        FsError::NotFound(_) => ProcedureError::Nfs(nfs3::nfsstat3::NFS3ERR_STALE),
        err => err.into(),
    }
}

/// Resolves a handle through the server's handle directory.
pub(crate) fn resolve(
    context: &rpc::Context,
    handle: &nfs3::nfs_fh3,
) -> Result<Resolved, ProcedureError> {
    let (fs, segments) = context.handler.from_handle(handle)?;
    let path = fs.join(&segments);
    Ok(Resolved { fs, segments, path, fileid: handle::file_id(handle) })
}

fn null<'a>(
    xid: u32,
    _input: &'a mut ArgStream,
    output: &'a mut Vec<u8>,
    _context: &'a rpc::Context,
) -> BoxFuture<'a, Result<(), ProcedureError>> {
    Box::pin(async move { nfsproc3_null(xid, output) })
}

fn getattr<'a>(
    xid: u32,
    input: &'a mut ArgStream,
    output: &'a mut Vec<u8>,
    context: &'a rpc::Context,
) -> BoxFuture<'a, Result<(), ProcedureError>> {
    Box::pin(nfsproc3_getattr(xid, input, output, context))
}

fn lookup<'a>(
    xid: u32,
    input: &'a mut ArgStream,
    output: &'a mut Vec<u8>,
    context: &'a rpc::Context,
) -> BoxFuture<'a, Result<(), ProcedureError>> {
    Box::pin(nfsproc3_lookup(xid, input, output, context))
}

fn access<'a>(
    xid: u32,
    input: &'a mut ArgStream,
    output: &'a mut Vec<u8>,
    context: &'a rpc::Context,
) -> BoxFuture<'a, Result<(), ProcedureError>> {
    Box::pin(nfsproc3_access(xid, input, output, context))
}

fn readdirplus<'a>(
    xid: u32,
    input: &'a mut ArgStream,
    output: &'a mut Vec<u8>,
    context: &'a rpc::Context,
) -> BoxFuture<'a, Result<(), ProcedureError>> {
    Box::pin(nfsproc3_readdirplus(xid, input, output, context))
}

fn fsinfo<'a>(
    xid: u32,
    input: &'a mut ArgStream,
    output: &'a mut Vec<u8>,
    context: &'a rpc::Context,
) -> BoxFuture<'a, Result<(), ProcedureError>> {
    Box::pin(nfsproc3_fsinfo(xid, input, output, context))
}

fn pathconf<'a>(
    xid: u32,
    input: &'a mut ArgStream,
    output: &'a mut Vec<u8>,
    context: &'a rpc::Context,
) -> BoxFuture<'a, Result<(), ProcedureError>> {
    Box::pin(nfsproc3_pathconf(xid, input, output, context))
}
