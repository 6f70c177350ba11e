//! MOUNTPROC3_UMNTALL (procedure 4), RFC 1813 Appendix I section I.4.4.

use std::io::Write;

use tracing::debug;

use crate::protocol::rpc::{self, ProcedureError};
use crate::protocol::xdr::{self, Serialize};

/// Handles MOUNTPROC3_UMNTALL: every mount of the client is dropped, which
/// here only means notifying the mount listener. Takes no arguments and
/// returns nothing.
pub async fn mountproc3_umnt_all(
    xid: u32,
    output: &mut impl Write,
    context: &rpc::Context,
) -> Result<(), ProcedureError> {
    debug!("mountproc3_umnt_all({:?}) ", xid);
    if let Some(ref chan) = context.mount_signal {
        let _ = chan.send(false).await;
    }
    xdr::rpc::make_success_reply(xid).serialize(output)?;
    Ok(())
}
