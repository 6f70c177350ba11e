//! Wire protocols of the server.
//!
//! - `xdr`: External Data Representation (RFC 4506) encoding and the
//!   message types of RPC, MOUNT and NFSv3.
//!
//! - `rpc`: ONC RPC version 2 (RFC 5531): record marking, call routing
//!   through the dispatch table and the per-connection context.
//!
//! - `nfs`: the procedures of the MOUNT and NFSv3 programs.

pub mod nfs;
pub mod rpc;
pub mod xdr;
