//! MOUNTPROC3_MNT (procedure 1), RFC 1813 Appendix I section I.4.1.
//!
//! MNT resolves an exported directory path to the file handle the client
//! uses as the root of its mount, and lists the accepted authentication
//! flavors.

use std::io::{Read, Write};

use tracing::debug;

use crate::protocol::rpc::{self, decode_args, ProcedureError};
use crate::protocol::xdr::{self, mount, Serialize};

/// Handles MOUNTPROC3_MNT.
///
/// The path is resolved by the server's handler. A successful mount is
/// announced on the mount listener, when one is configured.
///
/// # Arguments
///
/// * `xid` - RPC transaction ID
/// * `input` - Input stream containing the directory path to mount
/// * `output` - Output stream for writing the response
/// * `context` - Server context
pub async fn mountproc3_mnt(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &rpc::Context,
) -> Result<(), ProcedureError> {
    let path = decode_args::<mount::dirpath>(input)?;
    debug!("mountproc3_mnt({:?},{:?}) ", xid, String::from_utf8_lossy(&path));
    if path.len() > mount::MNTPATHLEN as usize {
        return Err(mount::mountstat3::MNT3ERR_NAMETOOLONG.into());
    }

    let (fs, segments) = context.handler.mount(&path).await.map_err(|stat| {
        debug!("{:?} --> {:?}", xid, stat);
        ProcedureError::Mount(stat)
    })?;
    let response = mount::mountres3_ok {
        fhandle: context.handler.to_handle(fs.as_ref(), &segments).data,
        auth_flavors: vec![
            xdr::rpc::auth_flavor::AUTH_NULL as u32,
            xdr::rpc::auth_flavor::AUTH_UNIX as u32,
        ],
    };
    debug!("{:?} --> {:?}", xid, response);
    if let Some(ref chan) = context.mount_signal {
        let _ = chan.send(true).await;
    }
    xdr::rpc::make_success_reply(xid).serialize(output)?;
    mount::mountstat3::MNT3_OK.serialize(output)?;
    response.serialize(output)?;
    Ok(())
}
