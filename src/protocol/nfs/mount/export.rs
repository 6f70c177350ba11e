//! MOUNTPROC3_EXPORT (procedure 5), RFC 1813 Appendix I section I.4.5.
//! <https://datatracker.ietf.org/doc/html/rfc1813#section-5.2.5>

use std::io::Write;

use tracing::debug;

use crate::protocol::rpc::{self, ProcedureError};
use crate::protocol::xdr::{self, mount, Serialize};

/// Handles MOUNTPROC3_EXPORT.
///
/// The reply is the `exports` linked list. It always holds the single
/// export of the server's handler, without group restrictions.
pub fn mountproc3_export(
    xid: u32,
    output: &mut impl Write,
    context: &rpc::Context,
) -> Result<(), ProcedureError> {
    debug!("mountproc3_export({:?}) ", xid);
    let node = mount::exportnode {
        ex_dir: context.handler.export_name().as_bytes().to_vec(),
        ex_groups: Vec::new(),
    };
    xdr::rpc::make_success_reply(xid).serialize(output)?;
    true.serialize(output)?;
    node.serialize(output)?;
    // No next export
    false.serialize(output)?;
    Ok(())
}
