//! MOUNTPROC3_UMNT (procedure 3), RFC 1813 Appendix I section I.4.3.
//!
//! No mount list is kept, so unmounting only notifies the mount listener.

use std::io::{Read, Write};

use tracing::debug;

use crate::protocol::rpc::{self, decode_args, ProcedureError};
use crate::protocol::xdr::{self, mount, Serialize};

/// Handles MOUNTPROC3_UMNT. The reply carries no result.
pub async fn mountproc3_umnt(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &rpc::Context,
) -> Result<(), ProcedureError> {
    let path = decode_args::<mount::dirpath>(input)?;
    debug!("mountproc3_umnt({:?},{:?}) ", xid, String::from_utf8_lossy(&path));
    if let Some(ref chan) = context.mount_signal {
        let _ = chan.send(false).await;
    }
    xdr::rpc::make_success_reply(xid).serialize(output)?;
    Ok(())
}
