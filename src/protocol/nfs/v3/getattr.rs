//! `GETATTR` (procedure 1), RFC 1813 section 3.3.1.

use std::io::{Read, Write};

use tracing::debug;

use super::{resolve, stale_if_missing};
use crate::protocol::rpc::{self, decode_args, ProcedureError};
use crate::protocol::xdr::{self, nfs3, Serialize};

/// Handles `NFSv3` `GETATTR` procedure (procedure 1)
///
/// Takes a file handle and returns the attributes of the object it names.
/// The reported `fileid` is the one embedded in the handle.
///
/// # Arguments
///
/// * `xid` - RPC transaction ID
/// * `input` - Input stream containing the file handle
/// * `output` - Output stream for writing the response
/// * `context` - Server context
pub async fn nfsproc3_getattr(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &rpc::Context,
) -> Result<(), ProcedureError> {
    let handle = decode_args::<nfs3::nfs_fh3>(input)?;
    debug!("nfsproc3_getattr({:?},{:?}) ", xid, handle);

    let object = resolve(context, &handle)?;
    let attr = object.attributes().await.map_err(stale_if_missing)?;
    debug!(" {:?} --> {:?}", xid, attr);
    xdr::rpc::make_success_reply(xid).serialize(output)?;
    nfs3::nfsstat3::NFS3_OK.serialize(output)?;
    attr.serialize(output)?;
    Ok(())
}
