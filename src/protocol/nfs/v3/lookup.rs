//! `LOOKUP` (procedure 3), RFC 1813 section 3.3.3.
//!
//! Translates a name inside a directory into the handle of the named
//! object. `.` names the directory itself and `..` its parent; the parent
//! of the root is the root.

use std::io::{Read, Write};

use tracing::debug;

use super::{resolve, stale_if_missing};
use crate::protocol::rpc::{self, decode_args, ProcedureError};
use crate::protocol::xdr::{self, nfs3, Serialize};
use crate::vfs::FsError;

/// Handles `NFSv3` `LOOKUP` procedure (procedure 3)
///
/// On success the reply carries the object handle, the object attributes
/// and the directory attributes. A missing name is answered with
/// `NFS3ERR_NOENT` and the directory attributes.
///
/// # Arguments
///
/// * `xid` - RPC transaction ID
/// * `input` - Input stream containing the `LOOKUP` arguments
/// * `output` - Output stream for writing the response
/// * `context` - Server context
pub async fn nfsproc3_lookup(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &rpc::Context,
) -> Result<(), ProcedureError> {
    let dirops = decode_args::<nfs3::diropargs3>(input)?;
    debug!("nfsproc3_lookup({:?},{:?}) ", xid, dirops);

    let dir = resolve(context, &dirops.dir)?;
    let dir_meta = dir.stat().await.map_err(stale_if_missing)?;
    if !dir_meta.is_dir() {
        return Err(nfs3::nfsstat3::NFS3ERR_NOTDIR.into());
    }
    let dir_attr = Some(crate::fs_util::metadata_to_fattr3(dir.fileid, &dir_meta));

    let name = std::str::from_utf8(dirops.name.as_ref())
        .map_err(|_| nfs3::nfsstat3::NFS3ERR_INVAL)?;
    let mut segments = dir.segments.clone();
    match name {
        "" => return Err(nfs3::nfsstat3::NFS3ERR_INVAL.into()),
        _ if name.contains('/') => return Err(nfs3::nfsstat3::NFS3ERR_INVAL.into()),
        "." => {}
        ".." => {
            if !dir.is_root() {
                segments.pop();
            }
        }
        name => segments.push(name.to_string()),
    }

    let handle = context.handler.to_handle(dir.fs.as_ref(), &segments);
    let object = resolve(context, &handle)?;
    match object.attributes().await {
        Ok(obj_attr) => {
            debug!("nfsproc3_lookup success {:?} --> {:?}", xid, obj_attr);
            xdr::rpc::make_success_reply(xid).serialize(output)?;
            nfs3::nfsstat3::NFS3_OK.serialize(output)?;
            handle.serialize(output)?;
            Some(obj_attr).serialize(output)?;
            dir_attr.serialize(output)?;
        }
        Err(err @ FsError::NotFound(_)) => {
            debug!("nfsproc3_lookup error {:?}({:?}) --> {}", xid, dirops.name, err);
            xdr::rpc::make_success_reply(xid).serialize(output)?;
            err.status().serialize(output)?;
            dir_attr.serialize(output)?;
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}
