//! Implementation of the `FSINFO` procedure (procedure 19) for NFS version 3 protocol
//! as defined in RFC 1813 section 3.3.19.
//!
//! The `FSINFO` procedure retrieves static information about the file system that
//! is exported by the server. Clients use it to size their requests, in
//! particular `dtpref` bounds the `READDIRPLUS` budgets they ask for.

use std::io::{Read, Write};

use tracing::debug;

use super::{resolve, stale_if_missing};
use crate::protocol::rpc::{self, decode_args, ProcedureError};
use crate::protocol::xdr::{self, nfs3, Serialize};

/// Largest transfer size advertised for reads and writes
const MAX_TRANSFER_SIZE: u32 = 1024 * 1024;
/// Preferred size of a directory listing reply
const PREFERRED_DIR_READ_SIZE: u32 = 64 * 1024;

/// Handles `NFSv3` `FSINFO` procedure (procedure 19)
///
/// Returns the object attributes followed by the transfer sizes and
/// properties of the export.
///
/// # Arguments
///
/// * `xid` - RPC transaction ID
/// * `input` - Input stream containing the `FSINFO` arguments
/// * `output` - Output stream for writing the response
/// * `context` - Server context
pub async fn nfsproc3_fsinfo(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &rpc::Context,
) -> Result<(), ProcedureError> {
    let handle = decode_args::<nfs3::nfs_fh3>(input)?;
    debug!("nfsproc3_fsinfo({:?},{:?}) ", xid, handle);

    let object = resolve(context, &handle)?;
    let fsinfo = nfs3::fs::fsinfo3 {
        obj_attributes: Some(object.attributes().await.map_err(stale_if_missing)?),
        rtmax: MAX_TRANSFER_SIZE,
        rtpref: MAX_TRANSFER_SIZE,
        rtmult: 4096,
        wtmax: MAX_TRANSFER_SIZE,
        wtpref: MAX_TRANSFER_SIZE,
        wtmult: 4096,
        dtpref: PREFERRED_DIR_READ_SIZE,
        maxfilesize: u64::MAX,
        time_delta: nfs3::nfstime3 { seconds: 0, nseconds: 1 },
        properties: nfs3::fs::FSF_LINK | nfs3::fs::FSF_SYMLINK | nfs3::fs::FSF_HOMOGENEOUS,
    };
    debug!(" {:?} --> {:?}", xid, fsinfo);
    xdr::rpc::make_success_reply(xid).serialize(output)?;
    nfs3::nfsstat3::NFS3_OK.serialize(output)?;
    fsinfo.serialize(output)?;
    Ok(())
}
