//! ONC RPC version 2 (RFC 5531) over TCP.
//!
//! - `wire`: record marking, per-connection request loop and the
//!   translation of one call into exactly one reply.
//! - `dispatch`: the immutable table routing `(program, procedure)` pairs
//!   to procedure implementations, and the error type those return.
//! - [`Context`]: per-connection state handed to every procedure.
//!
//! Requests on one connection are handled strictly in order: a call is read,
//! dispatched and answered before the next one is read.

mod context;
mod dispatch;
mod wire;

pub use context::Context;
pub use dispatch::{
    decode_args, ArgStream, DispatchError, DispatchTable, DispatchTableBuilder, ErrorBody,
    Procedure, ProcedureError, ProcedureFn, RpcProgram,
};
pub use wire::{handle_rpc, read_record, write_fragment, SocketMessageHandler};

/// Largest RPC record accepted from a client. Anything longer closes the
/// connection.
pub const MAX_RPC_RECORD_LENGTH: usize = 4 * 1024 * 1024;
