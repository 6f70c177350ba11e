//! NFSPROC3_NULL (procedure 0), RFC 1813 section 3.3.0.

use std::io::Write;

use tracing::debug;

use crate::protocol::rpc::ProcedureError;
use crate::protocol::xdr::{self, Serialize};

/// Handles NFSv3 NULL procedure
///
/// NULL is a no-operation RPC call used to check if the server is responding.
/// Takes no arguments and returns nothing but an RPC success.
pub fn nfsproc3_null(xid: u32, output: &mut impl Write) -> Result<(), ProcedureError> {
    debug!("nfsproc3_null({:?}) ", xid);
    xdr::rpc::make_success_reply(xid).serialize(output)?;
    Ok(())
}
