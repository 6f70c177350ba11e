//! Implementation of the PATHCONF procedure (procedure 20) for NFS version 3 protocol
//! as defined in RFC 1813 section 3.3.20.
//!
//! PATHCONF reports the POSIX pathconf limits of an object. The values are
//! the same for every object of a path-addressed export.

use std::io::{Read, Write};

use tracing::debug;

use super::{resolve, stale_if_missing};
use crate::protocol::rpc::{self, decode_args, ProcedureError};
use crate::protocol::xdr::{self, nfs3, Serialize};

/// Longest file name accepted in a path component
const NAME_MAX: u32 = 255;

/// Handles `NFSv3` `PATHCONF` procedure (procedure 20)
///
/// # Arguments
///
/// * `xid` - RPC transaction ID
/// * `input` - Input stream containing the file handle
/// * `output` - Output stream for writing the response
/// * `context` - Server context
pub async fn nfsproc3_pathconf(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &rpc::Context,
) -> Result<(), ProcedureError> {
    let handle = decode_args::<nfs3::nfs_fh3>(input)?;
    debug!("nfsproc3_pathconf({:?},{:?})", xid, handle);

    let object = resolve(context, &handle)?;
    let res = nfs3::fs::PATHCONF3resok {
        obj_attributes: Some(object.attributes().await.map_err(stale_if_missing)?),
        linkmax: 0,
        name_max: NAME_MAX,
        no_trunc: true,
        chown_restricted: true,
        case_insensitive: false,
        case_preserving: true,
    };
    debug!(" {:?} ---> {:?}", xid, res);
    xdr::rpc::make_success_reply(xid).serialize(output)?;
    nfs3::nfsstat3::NFS3_OK.serialize(output)?;
    res.serialize(output)?;
    Ok(())
}
