//! MOUNTPROC3_NULL (procedure 0), RFC 1813 section 5.2.0.

use std::io::Write;

use tracing::debug;

use crate::protocol::rpc::ProcedureError;
use crate::protocol::xdr::{self, Serialize};

/// Does no work. Lets clients check the server is up and time a round trip.
pub fn mountproc3_null(xid: u32, output: &mut impl Write) -> Result<(), ProcedureError> {
    debug!("mountproc3_null({:?}) ", xid);
    xdr::rpc::make_success_reply(xid).serialize(output)?;
    Ok(())
}
