//! MOUNT protocol version 3 (RFC 1813 Appendix I).
//! <https://datatracker.ietf.org/doc/html/rfc1813#appendix-I>
//!
//! MOUNT gives clients the root file handle of an export. DUMP is not
//! served and answers `PROC_UNAVAIL`.

use futures::future::BoxFuture;

use crate::protocol::rpc::{
    self, ArgStream, DispatchError, DispatchTableBuilder, ErrorBody, Procedure, ProcedureError,
    RpcProgram,
};
use crate::protocol::xdr::mount;

mod export;
mod mnt;
mod null;
mod umnt;
mod umnt_all;

use export::mountproc3_export;
use mnt::mountproc3_mnt;
use null::mountproc3_null;
use umnt::mountproc3_umnt;
use umnt_all::mountproc3_umnt_all;

pub const PROGRAM: RpcProgram = RpcProgram { number: mount::PROGRAM, version: mount::VERSION };

/// Registers every served MOUNT procedure.
pub fn register(builder: &mut DispatchTableBuilder) -> Result<(), DispatchError> {
    let procedures: [(mount::MountProgram, &'static str, rpc::ProcedureFn); 5] = [
        (mount::MountProgram::MOUNTPROC3_NULL, "MOUNTPROC3_NULL", null),
        (mount::MountProgram::MOUNTPROC3_MNT, "MOUNTPROC3_MNT", mnt),
        (mount::MountProgram::MOUNTPROC3_UMNT, "MOUNTPROC3_UMNT", umnt),
        (mount::MountProgram::MOUNTPROC3_UMNTALL, "MOUNTPROC3_UMNTALL", umnt_all),
        (mount::MountProgram::MOUNTPROC3_EXPORT, "MOUNTPROC3_EXPORT", export),
    ];
    for (procedure, name, run) in procedures {
        builder.register(
            PROGRAM,
            procedure as u32,
            Procedure { name, run, error_body: ErrorBody::Empty },
        )?;
    }
    Ok(())
}

fn null<'a>(
    xid: u32,
    _input: &'a mut ArgStream,
    output: &'a mut Vec<u8>,
    _context: &'a rpc::Context,
) -> BoxFuture<'a, Result<(), ProcedureError>> {
    Box::pin(async move { mountproc3_null(xid, output) })
}

fn mnt<'a>(
    xid: u32,
    input: &'a mut ArgStream,
    output: &'a mut Vec<u8>,
    context: &'a rpc::Context,
) -> BoxFuture<'a, Result<(), ProcedureError>> {
    Box::pin(mountproc3_mnt(xid, input, output, context))
}

fn umnt<'a>(
    xid: u32,
    input: &'a mut ArgStream,
    output: &'a mut Vec<u8>,
    context: &'a rpc::Context,
) -> BoxFuture<'a, Result<(), ProcedureError>> {
    Box::pin(mountproc3_umnt(xid, input, output, context))
}

fn umnt_all<'a>(
    xid: u32,
    _input: &'a mut ArgStream,
    output: &'a mut Vec<u8>,
    context: &'a rpc::Context,
) -> BoxFuture<'a, Result<(), ProcedureError>> {
    Box::pin(mountproc3_umnt_all(xid, output, context))
}

fn export<'a>(
    xid: u32,
    _input: &'a mut ArgStream,
    output: &'a mut Vec<u8>,
    context: &'a rpc::Context,
) -> BoxFuture<'a, Result<(), ProcedureError>> {
    Box::pin(async move { mountproc3_export(xid, output, context) })
}
