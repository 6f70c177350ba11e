//! `ACCESS` (procedure 4), RFC 1813 section 3.3.4.

use std::io::{Read, Write};

use tracing::debug;

use super::{resolve, stale_if_missing};
use crate::protocol::rpc::{self, decode_args, ProcedureError};
use crate::protocol::xdr::{self, nfs3, Serialize};
use crate::vfs::Capabilities;

const READ_ONLY_MASK: u32 = nfs3::ACCESS3_READ | nfs3::ACCESS3_LOOKUP | nfs3::ACCESS3_EXECUTE;
const MODIFY_MASK: u32 = nfs3::ACCESS3_MODIFY | nfs3::ACCESS3_EXTEND | nfs3::ACCESS3_DELETE;

/// Access rights granted on an object of type `ftype`, out of `requested`.
///
/// `LOOKUP` only means something for directories and `EXECUTE` only for
/// files. Modifying rights are never granted on read-only exports.
pub fn granted_access(ftype: nfs3::ftype3, requested: u32, capabilities: Capabilities) -> u32 {
    let mut allowed = match ftype {
        nfs3::ftype3::NF3DIR => nfs3::ACCESS3_READ | nfs3::ACCESS3_LOOKUP | MODIFY_MASK,
        nfs3::ftype3::NF3REG => nfs3::ACCESS3_READ | nfs3::ACCESS3_EXECUTE | MODIFY_MASK,
        nfs3::ftype3::NF3LNK => nfs3::ACCESS3_READ,
        _ => nfs3::ACCESS3_READ | nfs3::ACCESS3_EXECUTE,
    };
    if capabilities == Capabilities::ReadOnly {
        allowed &= READ_ONLY_MASK;
    }
    requested & allowed
}

/// Handles `NFSv3` `ACCESS` procedure (procedure 4)
///
/// Reports which of the requested `ACCESS3_*` rights the server grants on
/// the object, along with the object attributes.
///
/// # Arguments
///
/// * `xid` - RPC transaction ID
/// * `input` - Input stream containing the file handle and access mask
/// * `output` - Output stream for writing the response
/// * `context` - Server context
pub async fn nfsproc3_access(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &rpc::Context,
) -> Result<(), ProcedureError> {
    let handle = decode_args::<nfs3::nfs_fh3>(input)?;
    let access = decode_args::<u32>(input)?;
    debug!("nfsproc3_access({:?},{:?},{:?})", xid, handle, access);

    let object = resolve(context, &handle)?;
    let attr = object.attributes().await.map_err(stale_if_missing)?;
    let granted = granted_access(attr.ftype, access, context.handler.capabilities());

    debug!(" {:?} ---> {:?}", xid, granted);
    xdr::rpc::make_success_reply(xid).serialize(output)?;
    nfs3::nfsstat3::NFS3_OK.serialize(output)?;
    Some(attr).serialize(output)?;
    granted.serialize(output)?;
    Ok(())
}
