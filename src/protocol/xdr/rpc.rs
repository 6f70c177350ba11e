//! ONC RPC version 2 message structures (RFC 5531) with their XDR
//! representation. Every call and reply on the wire starts with one of these.

// RFC 5531 naming
#![allow(non_camel_case_types)]

use std::io::{Read, Write};

use num_derive::{FromPrimitive, ToPrimitive};

use super::*;

/// The only RPC protocol version this server speaks.
pub const RPC_VERSION: u32 = 2;

/// Authentication status codes indicating why authentication failed
#[derive(Copy, Clone, Debug, Default, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum auth_stat {
    /// Invalid credentials provided by client (checksum/signature verification failed)
    #[default]
    AUTH_BADCRED = 1,
    /// Credentials rejected - client needs to establish a new session
    AUTH_REJECTEDCRED = 2,
    /// Invalid verifier provided by client (checksum/signature verification failed)
    AUTH_BADVERF = 3,
    /// Verifier rejected due to expiration or replay attempt
    AUTH_REJECTEDVERF = 4,
    /// Authentication mechanism too weak for requested operation
    AUTH_TOOWEAK = 5,
}
impl SerializeEnum for auth_stat {}
impl DeserializeEnum for auth_stat {}

/// Authentication flavor (mechanism) identifiers for RPC
#[derive(Copy, Clone, Debug, Default, FromPrimitive, ToPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum auth_flavor {
    /// No authentication
    #[default]
    AUTH_NULL = 0,
    /// UNIX-style authentication (uid/gid)
    AUTH_UNIX = 1,
    /// Short-form authentication
    AUTH_SHORT = 2,
    /// DES authentication
    AUTH_DES = 3,
}
impl SerializeEnum for auth_flavor {}
impl DeserializeEnum for auth_flavor {}

/// UNIX-style credentials carried in the body of an `AUTH_UNIX` credential.
#[derive(Clone, Debug, Default)]
pub struct auth_unix {
    /// Arbitrary id generated by the caller
    pub stamp: u32,
    /// The name of the client machine
    pub machinename: Vec<u8>,
    /// The effective user ID of the caller
    pub uid: u32,
    /// The effective group ID of the caller
    pub gid: u32,
    /// A list of additional group IDs for the caller
    pub gids: Vec<u32>,
}
DeserializeStruct!(auth_unix, stamp, machinename, uid, gid, gids);
SerializeStruct!(auth_unix, stamp, machinename, uid, gid, gids);

/// Authentication field of a call (credential, verifier) or reply (verifier).
/// The body is interpreted according to the flavor.
#[derive(Clone, Debug, Default)]
pub struct opaque_auth {
    /// The authentication mechanism being used
    pub flavor: auth_flavor,
    /// The opaque authentication data associated with that mechanism
    pub body: Vec<u8>,
}
DeserializeStruct!(opaque_auth, flavor, body);
SerializeStruct!(opaque_auth, flavor, body);

/// RPC message: a transaction id followed by either a CALL or a REPLY.
///
/// The xid of a reply always matches the xid of the call it answers.
#[derive(Clone, Debug, Default)]
pub struct rpc_msg {
    /// Transaction identifier used to match calls and replies
    pub xid: u32,
    /// The body of the RPC message (call or reply)
    pub body: rpc_body,
}
DeserializeStruct!(rpc_msg, xid, body);
SerializeStruct!(rpc_msg, xid, body);

/// The body of an RPC message, which can be either a call or a reply
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Debug)]
pub enum rpc_body {
    /// A call to a remote procedure
    CALL(call_body),
    /// A reply from a remote procedure
    REPLY(reply_body),
}

impl Default for rpc_body {
    fn default() -> rpc_body {
        rpc_body::CALL(call_body::default())
    }
}

impl Serialize for rpc_body {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            rpc_body::CALL(v) => {
                0_u32.serialize(dest)?;
                v.serialize(dest)
            }
            rpc_body::REPLY(v) => {
                1_u32.serialize(dest)?;
                v.serialize(dest)
            }
        }
    }
}

impl Deserialize for rpc_body {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        match deserialize::<u32>(src)? {
            0 => *self = rpc_body::CALL(deserialize(src)?),
            1 => *self = rpc_body::REPLY(deserialize(src)?),
            msg_type => {
                return Err(invalid_data(&format!("Invalid message type in rpc_body: {msg_type}")))
            }
        }

        Ok(())
    }
}

/// The body of an RPC call. Procedure specific parameters follow it on the wire.
#[derive(Clone, Debug, Default)]
pub struct call_body {
    /// RPC version, must be 2
    pub rpcvers: u32,
    /// The program to call
    pub prog: u32,
    /// The version of the program
    pub vers: u32,
    /// The procedure within the program to call
    pub proc: u32,
    /// Authentication credentials for the caller
    pub cred: opaque_auth,
    /// Authentication verifier for the caller
    pub verf: opaque_auth,
}
DeserializeStruct!(call_body, rpcvers, prog, vers, proc, cred, verf);
SerializeStruct!(call_body, rpcvers, prog, vers, proc, cred, verf);

/// The body of an RPC reply, indicating whether the call was accepted or denied
#[derive(Clone, Debug)]
pub enum reply_body {
    /// The call was accepted
    MSG_ACCEPTED(accepted_reply),
    /// The call was denied
    MSG_DENIED(rejected_reply),
}

impl Default for reply_body {
    fn default() -> reply_body {
        reply_body::MSG_ACCEPTED(accepted_reply::default())
    }
}

impl Serialize for reply_body {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            reply_body::MSG_ACCEPTED(v) => {
                0_u32.serialize(dest)?;
                v.serialize(dest)
            }
            reply_body::MSG_DENIED(v) => {
                1_u32.serialize(dest)?;
                v.serialize(dest)
            }
        }
    }
}

impl Deserialize for reply_body {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        match deserialize::<u32>(src)? {
            0 => *self = reply_body::MSG_ACCEPTED(deserialize(src)?),
            1 => *self = reply_body::MSG_DENIED(deserialize(src)?),
            reply_status => {
                return Err(invalid_data(&format!(
                    "Invalid reply status in reply_body: {reply_status}"
                )))
            }
        }

        Ok(())
    }
}

/// Lowest and highest supported versions, sent on a version mismatch
#[derive(Clone, Debug, Default)]
pub struct mismatch_info {
    /// Lowest version supported
    pub low: u32,
    /// Highest version supported
    pub high: u32,
}
DeserializeStruct!(mismatch_info, low, high);
SerializeStruct!(mismatch_info, low, high);

/// Reply to an RPC call that was accepted by the server. Acceptance only
/// means authentication passed; `reply_data` still tells whether the
/// procedure could run.
#[derive(Clone, Debug, Default)]
pub struct accepted_reply {
    /// Authentication verifier from server
    pub verf: opaque_auth,
    /// Reply data union discriminated by accept_stat
    pub reply_data: accept_body,
}
DeserializeStruct!(accepted_reply, verf, reply_data);
SerializeStruct!(accepted_reply, verf, reply_data);

/// Outcome of an accepted call, discriminated by `accept_stat`.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Debug, Default)]
pub enum accept_body {
    /// Call completed successfully, procedure results follow
    #[default]
    SUCCESS,
    /// Program is not available on this server
    PROG_UNAVAIL,
    /// Program version mismatch, includes supported version range
    PROG_MISMATCH(mismatch_info),
    /// Requested procedure is not available
    PROC_UNAVAIL,
    /// Server could not decode the call arguments
    GARBAGE_ARGS,
}

impl Serialize for accept_body {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            accept_body::SUCCESS => 0_u32.serialize(dest),
            accept_body::PROG_UNAVAIL => 1_u32.serialize(dest),
            accept_body::PROG_MISMATCH(v) => {
                2_u32.serialize(dest)?;
                v.serialize(dest)
            }
            accept_body::PROC_UNAVAIL => 3_u32.serialize(dest),
            accept_body::GARBAGE_ARGS => 4_u32.serialize(dest),
        }
    }
}

impl Deserialize for accept_body {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        match deserialize::<u32>(src)? {
            0 => *self = accept_body::SUCCESS,
            1 => *self = accept_body::PROG_UNAVAIL,
            2 => *self = accept_body::PROG_MISMATCH(deserialize(src)?),
            3 => *self = accept_body::PROC_UNAVAIL,
            4 => *self = accept_body::GARBAGE_ARGS,
            accept_stat => {
                return Err(invalid_data(&format!(
                    "Invalid accept stat in accept_body: {accept_stat}"
                )));
            }
        }

        Ok(())
    }
}

/// Reply sent when the server rejects a call, either because it does not
/// speak the caller's RPC version or because authentication failed.
#[derive(Clone, Debug)]
pub enum rejected_reply {
    /// RPC version mismatch - includes supported version range
    RPC_MISMATCH(mismatch_info),
    /// Authentication failed - includes specific error code
    AUTH_ERROR(auth_stat),
}

impl Default for rejected_reply {
    fn default() -> rejected_reply {
        rejected_reply::AUTH_ERROR(auth_stat::default())
    }
}

impl Serialize for rejected_reply {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            rejected_reply::RPC_MISMATCH(v) => {
                0_u32.serialize(dest)?;
                v.serialize(dest)
            }
            rejected_reply::AUTH_ERROR(v) => {
                1_u32.serialize(dest)?;
                v.serialize(dest)
            }
        }
    }
}

impl Deserialize for rejected_reply {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        match deserialize::<u32>(src)? {
            0 => *self = rejected_reply::RPC_MISMATCH(deserialize(src)?),
            1 => *self = rejected_reply::AUTH_ERROR(deserialize(src)?),
            stat => {
                return Err(invalid_data(&format!("Invalid reject stat in rejected_reply: {stat}")))
            }
        }

        Ok(())
    }
}

fn accepted_reply_message(xid: u32, reply_data: accept_body) -> rpc_msg {
    let reply =
        reply_body::MSG_ACCEPTED(accepted_reply { verf: opaque_auth::default(), reply_data });
    rpc_msg { xid, body: rpc_body::REPLY(reply) }
}

/// Creates a reply message indicating that the requested procedure is not available
pub fn proc_unavail_reply_message(xid: u32) -> rpc_msg {
    accepted_reply_message(xid, accept_body::PROC_UNAVAIL)
}

/// Creates a reply message indicating that the requested program is not available
pub fn prog_unavail_reply_message(xid: u32) -> rpc_msg {
    accepted_reply_message(xid, accept_body::PROG_UNAVAIL)
}

/// Creates a reply message indicating a program version mismatch
pub fn prog_mismatch_reply_message(xid: u32, accepted_ver: u32) -> rpc_msg {
    accepted_reply_message(
        xid,
        accept_body::PROG_MISMATCH(mismatch_info { low: accepted_ver, high: accepted_ver }),
    )
}

/// Creates a reply message indicating that the arguments could not be decoded
pub fn garbage_args_reply_message(xid: u32) -> rpc_msg {
    accepted_reply_message(xid, accept_body::GARBAGE_ARGS)
}

/// Creates a reply message indicating an RPC version mismatch
pub fn rpc_vers_mismatch(xid: u32) -> rpc_msg {
    let reply = reply_body::MSG_DENIED(rejected_reply::RPC_MISMATCH(mismatch_info {
        low: RPC_VERSION,
        high: RPC_VERSION,
    }));
    rpc_msg { xid, body: rpc_body::REPLY(reply) }
}

/// Creates a successful reply header; procedure results are appended after it
pub fn make_success_reply(xid: u32) -> rpc_msg {
    accepted_reply_message(xid, accept_body::SUCCESS)
}
